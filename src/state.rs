use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn},
    integrations::{
        CloudinaryStorage, DisabledMailer, DisabledPayments, DisabledStorage, Mailer,
        ObjectStorage, PaymentGateway, PaypalGateway, ResendMailer,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStorage>,
    pub mailer: Arc<dyn Mailer>,
    pub payments: Arc<dyn PaymentGateway>,
}

impl AppState {
    /// Wire the real collaborators for whatever credentials are configured.
    pub fn new(pool: DbPool, orm: OrmConn, config: AppConfig) -> Self {
        let storage: Arc<dyn ObjectStorage> = match config.cloudinary.clone() {
            Some(cfg) => Arc::new(CloudinaryStorage::new(cfg)),
            None => Arc::new(DisabledStorage),
        };
        let mailer: Arc<dyn Mailer> = match config.resend.clone() {
            Some(cfg) => Arc::new(ResendMailer::new(cfg)),
            None => Arc::new(DisabledMailer),
        };
        let payments: Arc<dyn PaymentGateway> = match config.paypal.clone() {
            Some(cfg) => Arc::new(PaypalGateway::new(cfg)),
            None => Arc::new(DisabledPayments),
        };

        Self {
            pool,
            orm,
            config: Arc::new(config),
            storage,
            mailer,
            payments,
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_payments(mut self, payments: Arc<dyn PaymentGateway>) -> Self {
        self.payments = payments;
        self
    }
}

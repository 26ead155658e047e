//! Payment capture verification.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::config::PaypalConfig;
use crate::domain::money;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCapture {
    pub id: String,
    pub status: String,
    pub amount: Decimal,
    pub currency: String,
}

impl PaymentCapture {
    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("COMPLETED")
    }

    /// The capture settled in full for `expected` USD.
    pub fn covers(&self, expected: Decimal) -> bool {
        self.is_completed()
            && self.currency.eq_ignore_ascii_case("USD")
            && money::round_currency(self.amount) == money::round_currency(expected)
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment not found: {0}")]
    NotFound(String),

    #[error("payment provider error: {0}")]
    Provider(String),

    #[error("payments are not configured")]
    NotConfigured,
}

#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Look up a captured payment by the provider's order id.
    async fn verify_capture(&self, payment_id: &str) -> Result<PaymentCapture, PaymentError>;
}

#[derive(Debug, Clone)]
pub struct PaypalGateway {
    config: PaypalConfig,
    http: Client,
}

impl PaypalGateway {
    pub fn new(config: PaypalConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    async fn access_token(&self) -> Result<String, PaymentError> {
        let response = self
            .http
            .post(format!("{}/v1/oauth2/token", self.config.api_base))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PaymentError::Provider(format!(
                "token request failed with status {status}: {text}"
            )));
        }

        let parsed: TokenResponse = response.json().await?;
        Ok(parsed.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    amount: Amount,
}

#[derive(Debug, Deserialize)]
struct Amount {
    currency_code: String,
    value: String,
}

#[async_trait]
impl PaymentGateway for PaypalGateway {
    async fn verify_capture(&self, payment_id: &str) -> Result<PaymentCapture, PaymentError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!(
                "{}/v2/checkout/orders/{}",
                self.config.api_base, payment_id
            ))
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PaymentError::NotFound(payment_id.to_string()));
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PaymentError::Provider(format!(
                "order lookup failed with status {status}: {text}"
            )));
        }

        let order: OrderResponse = response.json().await?;
        let mut amount = Decimal::ZERO;
        let mut currency = String::new();
        for unit in &order.purchase_units {
            amount += money::parse_lenient(&unit.amount.value);
            currency = unit.amount.currency_code.clone();
        }

        Ok(PaymentCapture {
            id: order.id,
            status: order.status,
            amount,
            currency,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct DisabledPayments;

#[async_trait]
impl PaymentGateway for DisabledPayments {
    async fn verify_capture(&self, _payment_id: &str) -> Result<PaymentCapture, PaymentError> {
        Err(PaymentError::NotConfigured)
    }
}

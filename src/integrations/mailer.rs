//! Transactional email delivery.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ResendConfig;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail provider rejected message: {0}")]
    Rejected(String),

    #[error("mailer is not configured")]
    NotConfigured,
}

#[automock]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one message, returning the provider's message id.
    async fn send(&self, message: EmailMessage) -> Result<String, MailerError>;
}

#[derive(Debug, Clone)]
pub struct ResendMailer {
    config: ResendConfig,
    http: Client,
}

impl ResendMailer {
    pub fn new(config: ResendConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: EmailMessage) -> Result<String, MailerError> {
        let body = SendRequest {
            from: &self.config.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };

        let response = self
            .http
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(MailerError::Rejected(format!("status {status}: {text}")));
        }

        let parsed: SendResponse = response.json().await?;
        Ok(parsed.id)
    }
}

/// Mailer used when no provider is configured. Messages stay pending in the
/// outbox until a real mailer is available.
#[derive(Debug, Clone, Default)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, _message: EmailMessage) -> Result<String, MailerError> {
        Err(MailerError::NotConfigured)
    }
}

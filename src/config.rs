use std::env;

use anyhow::Context;

const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub app_url: Option<String>,
    pub jwt_secret: String,
    pub cloudinary: Option<CloudinaryConfig>,
    pub resend: Option<ResendConfig>,
    pub paypal: Option<PaypalConfig>,
    pub require_payment: bool,
    pub outbox_interval_secs: u64,
    pub outbox_max_attempts: i32,
    pub max_image_bytes: usize,
    pub max_file_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

#[derive(Debug, Clone)]
pub struct ResendConfig {
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct PaypalConfig {
    pub client_id: String,
    pub client_secret: String,
    pub api_base: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("APP_PORT", 3000);

        let cloudinary = match (
            optional_var("CLOUDINARY_CLOUD_NAME"),
            optional_var("CLOUDINARY_API_KEY"),
            optional_var("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
                folder: optional_var("CLOUDINARY_FOLDER")
                    .unwrap_or_else(|| "storekart/products".to_string()),
            }),
            _ => None,
        };

        let resend = optional_var("RESEND_API_KEY").map(|api_key| ResendConfig {
            api_key,
            from: optional_var("MAIL_FROM").unwrap_or_else(|| "onboarding@resend.dev".to_string()),
        });

        let paypal = match (
            optional_var("PAYPAL_CLIENT_ID"),
            optional_var("PAYPAL_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => Some(PaypalConfig {
                client_id,
                client_secret,
                api_base: optional_var("PAYPAL_API_BASE")
                    .unwrap_or_else(|| "https://api-m.sandbox.paypal.com".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            host,
            port,
            app_url: optional_var("APP_URL"),
            jwt_secret,
            cloudinary,
            resend,
            paypal,
            require_payment: parse_var("REQUIRE_PAYMENT", false),
            outbox_interval_secs: parse_var("OUTBOX_INTERVAL_SECS", 30),
            outbox_max_attempts: parse_var("OUTBOX_MAX_ATTEMPTS", 5),
            max_image_bytes: parse_var("MAX_IMAGE_BYTES", 5 * MIB),
            max_file_bytes: parse_var("MAX_FILE_BYTES", 50 * MIB),
        })
    }

    /// Configuration with defaults for everything but the database and token secret.
    pub fn for_tests(database_url: &str, jwt_secret: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            app_url: None,
            jwt_secret: jwt_secret.to_string(),
            cloudinary: None,
            resend: None,
            paypal: None,
            require_payment: false,
            outbox_interval_secs: 30,
            outbox_max_attempts: 5,
            max_image_bytes: 5 * MIB,
            max_file_bytes: 50 * MIB,
        }
    }

    /// Largest request body the upload endpoint can legitimately receive.
    pub fn body_limit(&self) -> usize {
        self.max_image_bytes + self.max_file_bytes + MIB
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

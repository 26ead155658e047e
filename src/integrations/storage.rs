//! Object storage for product images and downloadable files.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use mockall::automock;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::CloudinaryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    File,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::File => "file",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub kind: AssetKind,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub public_id: String,
    /// Provider resource type, needed to destroy the object again.
    pub resource_type: String,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage rejected request: {0}")]
    Rejected(String),

    #[error("object storage is not configured")]
    NotConfigured,
}

#[automock]
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, request: UploadRequest) -> Result<StoredObject, StorageError>;

    async fn destroy(&self, object: &StoredObject) -> Result<(), StorageError>;
}

/// Cloudinary upload API client using signed requests.
#[derive(Debug, Clone)]
pub struct CloudinaryStorage {
    config: CloudinaryConfig,
    http: Client,
}

impl CloudinaryStorage {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }

    fn endpoint(&self, resource_type: &str, action: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/{}/{}",
            self.config.cloud_name, resource_type, action
        )
    }

    fn signed_params(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        let signature = sign(&params, &self.config.api_secret);
        params.push(("api_key", self.config.api_key.clone()));
        params.push(("signature", signature));
        params.push(("signature_algorithm", "sha256".to_string()));
        params
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    resource_type: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[async_trait]
impl ObjectStorage for CloudinaryStorage {
    async fn upload(&self, request: UploadRequest) -> Result<StoredObject, StorageError> {
        let params = self.signed_params(vec![
            ("folder", self.config.folder.clone()),
            ("overwrite", "true".to_string()),
            ("timestamp", unix_timestamp().to_string()),
            ("unique_filename", "true".to_string()),
            ("use_filename", "true".to_string()),
        ]);

        let part = Part::bytes(request.bytes)
            .file_name(request.file_name.clone())
            .mime_str(&request.content_type)?;
        let form = params
            .into_iter()
            .fold(Form::new(), |form, (key, value)| form.text(key, value))
            .part("file", part);

        tracing::debug!(kind = request.kind.as_str(), file = %request.file_name, "uploading to cloudinary");
        let response = self
            .http
            .post(self.endpoint("auto", "upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected(format!(
                "upload failed with status {status}: {text}"
            )));
        }

        let parsed: UploadResponse = response.json().await?;
        Ok(StoredObject {
            url: parsed.secure_url,
            public_id: parsed.public_id,
            resource_type: parsed.resource_type,
        })
    }

    async fn destroy(&self, object: &StoredObject) -> Result<(), StorageError> {
        let params = self.signed_params(vec![
            ("public_id", object.public_id.clone()),
            ("timestamp", unix_timestamp().to_string()),
        ]);

        let response = self
            .http
            .post(self.endpoint(&object.resource_type, "destroy"))
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected(format!(
                "destroy failed with status {status}: {text}"
            )));
        }

        let parsed: DestroyResponse = response.json().await?;
        match parsed.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(StorageError::Rejected(format!("destroy returned {other}"))),
        }
    }
}

/// Storage used when no credentials are configured; every call fails.
#[derive(Debug, Clone, Default)]
pub struct DisabledStorage;

#[async_trait]
impl ObjectStorage for DisabledStorage {
    async fn upload(&self, _request: UploadRequest) -> Result<StoredObject, StorageError> {
        Err(StorageError::NotConfigured)
    }

    async fn destroy(&self, _object: &StoredObject) -> Result<(), StorageError> {
        Err(StorageError::NotConfigured)
    }
}

/// Cloudinary request signature: parameters sorted by key, joined as a query
/// string, secret appended, SHA-256 hex digest.
fn sign(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{:x}", Sha256::digest(format!("{joined}{secret}").as_bytes()))
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_sorts_parameters() {
        let a = sign(
            &[("timestamp", "1".into()), ("folder", "x".into())],
            "secret",
        );
        let b = sign(
            &[("folder", "x".into()), ("timestamp", "1".into())],
            "secret",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(
            a,
            format!("{:x}", Sha256::digest(b"folder=x&timestamp=1secret"))
        );
    }
}

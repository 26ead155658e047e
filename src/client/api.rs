//! Typed client for the HTTP API.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;

use crate::{
    domain::{cart::CartEntry, catalog::CatalogParams},
    dto::{orders::OrderList, products::CatalogPage},
    models::{CartItem, Order, Product},
};

use super::mirror::CartBackend;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("not found")]
    NotFound,

    #[error("response carried no data")]
    EmptyBody,
}

/// Envelope every endpoint answers with.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            http: Client::new(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }
        if !status.is_success() {
            let message = match response.json::<Envelope<serde_json::Value>>().await {
                Ok(envelope) => envelope.message,
                Err(_) => status.canonical_reason().unwrap_or_default().to_string(),
            };
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }
        let envelope: Envelope<T> = response.json().await?;
        envelope.data.ok_or(ClientError::EmptyBody)
    }

    pub async fn list_products(&self, params: &CatalogParams) -> Result<CatalogPage, ClientError> {
        Self::send(self.request(Method::GET, "/products").query(params)).await
    }

    pub async fn get_product(&self, id: i32) -> Result<Product, ClientError> {
        Self::send(self.request(Method::GET, &format!("/products/{id}"))).await
    }

    pub async fn list_cart(&self) -> Result<Vec<CartEntry>, ClientError> {
        Self::send(self.request(Method::GET, "/cart")).await
    }

    pub async fn add_to_cart(&self, product_id: i32) -> Result<CartItem, ClientError> {
        let body = serde_json::json!({ "productId": product_id });
        Self::send(self.request(Method::POST, "/cart").json(&body)).await
    }

    pub async fn remove_from_cart(&self, product_id: i32) -> Result<(), ClientError> {
        let builder = self
            .request(Method::DELETE, "/cart")
            .query(&[("productId", product_id)]);
        Self::send::<serde_json::Value>(builder).await.map(|_| ())
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>, ClientError> {
        let list: OrderList = Self::send(self.request(Method::GET, "/orders")).await?;
        Ok(list.orders)
    }
}

#[async_trait]
impl CartBackend for ApiClient {
    async fn fetch_cart(&self) -> Result<Vec<CartEntry>, ClientError> {
        self.list_cart().await
    }

    async fn add_to_cart(&self, product_id: i32) -> Result<CartItem, ClientError> {
        ApiClient::add_to_cart(self, product_id).await
    }

    async fn remove_from_cart(&self, product_id: i32) -> Result<(), ClientError> {
        ApiClient::remove_from_cart(self, product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_rooted_under_api() {
        let client = ApiClient::new("http://localhost:3000/", None);
        assert_eq!(client.url("/cart"), "http://localhost:3000/api/cart");
    }

    #[test]
    fn envelope_tolerates_missing_data() {
        let envelope: Envelope<CatalogPage> =
            serde_json::from_str(r#"{"success": false, "message": "Not Found", "data": null}"#).unwrap();
        assert_eq!(envelope.message, "Not Found");
        assert!(envelope.data.is_none());
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::domain::catalog::CatalogParams;
use crate::models::Product;

/// JSON carried in the `data` part of the create-product form.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub title: Option<String>,
    /// String or number
    #[schema(value_type = Option<String>, example = "19.99")]
    pub price: Option<Value>,
    #[schema(value_type = Option<String>, example = "29.99")]
    pub original_price: Option<Value>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub about: Option<String>,
    pub message: Option<String>,
}

/// Multipart layout of `POST /api/products`, for the API docs.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductForm {
    /// JSON encoded `ProductData`
    pub data: String,
    /// image/*, at most 5 MiB
    #[schema(value_type = String, format = Binary)]
    pub product_image: Vec<u8>,
    /// any type, at most 50 MiB
    #[schema(value_type = String, format = Binary)]
    pub product_file: Vec<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatedProduct {
    pub id: i32,
    pub image_url: String,
    pub product_url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProductRequest {
    pub product_id: i32,
}

/// Query string of `GET /api/products`: `id` selects one product,
/// `type=user&userId=` a seller's listings, anything else the catalog.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductsQuery {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub user_id: Option<String>,
    pub limit: Option<String>,
    pub page: Option<String>,
    pub search: Option<String>,
    pub categories: Option<String>,
    pub sort: Option<String>,
}

impl ProductsQuery {
    pub fn catalog_params(&self) -> CatalogParams {
        CatalogParams {
            limit: self.limit.clone(),
            page: self.page.clone(),
            search: self.search.clone(),
            categories: self.categories.clone(),
            sort: self.sort.clone(),
        }
    }

    pub fn wants_seller_listing(&self) -> bool {
        self.kind.as_deref() == Some("user")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CatalogPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductList {
    pub products: Vec<Product>,
}

/// Body of `GET /api/products`; the shape depends on the query.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ProductsResponse {
    Catalog(CatalogPage),
    List(ProductList),
    Single(Product),
}

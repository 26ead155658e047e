use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State, multipart::Field},
    routing::get,
};

use crate::{
    domain::catalog::CatalogQuery,
    dto::products::{
        CreateProductForm, CreatedProduct, DeleteProductRequest, ProductsQuery, ProductsResponse,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::ApiResponse,
    services::{
        catalog_service,
        product_service::{self, ProductUpload, UploadedPart},
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_products).post(create_product).delete(delete_product),
        )
        .route("/{id}", get(get_product))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(ProductsQuery),
    responses(
        (status = 200, description = "Catalog page, a seller's listings, or one product", body = ApiResponse<ProductsResponse>),
        (status = 403, description = "Listing another seller's products"),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(query): Query<ProductsQuery>,
) -> AppResult<Json<ApiResponse<ProductsResponse>>> {
    if let Some(raw_id) = query.id.as_deref() {
        let id = raw_id.trim().parse::<i32>().map_err(|_| AppError::NotFound)?;
        let resp = product_service::get_product(&state, id).await?;
        return Ok(Json(resp.map(ProductsResponse::Single)));
    }

    if query.wants_seller_listing() {
        let user = user.ok_or(AppError::Unauthorized)?;
        let seller_id = user.resolve(query.user_id.as_deref())?;
        let resp = product_service::list_seller_products(&state, seller_id).await?;
        return Ok(Json(resp.map(ProductsResponse::List)));
    }

    let catalog = CatalogQuery::from_params(&query.catalog_params());
    let resp = catalog_service::list_catalog(&state, &catalog).await?;
    Ok(Json(resp.map(ProductsResponse::Catalog)))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = i32, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::get_product(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body(content = CreateProductForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Product uploaded", body = ApiResponse<CreatedProduct>),
        (status = 400, description = "Missing or invalid form fields"),
        (status = 401, description = "Missing or invalid token"),
        (status = 413, description = "Image or file too large"),
        (status = 502, description = "Upload failed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<CreatedProduct>>> {
    let upload = read_upload(multipart).await?;
    let resp = product_service::create_product(&state, &user, upload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products",
    request_body = DeleteProductRequest,
    responses(
        (status = 200, description = "Product deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<DeleteProductRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, payload.product_id).await?;
    Ok(Json(resp))
}

async fn read_upload(mut multipart: Multipart) -> AppResult<ProductUpload> {
    let mut upload = ProductUpload::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(format!("Invalid multipart body: {err}")))?
    {
        match field.name() {
            Some("data") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| AppError::BadRequest(format!("Invalid form data: {err}")))?;
                upload.data = Some(text);
            }
            Some("productImage") => upload.image = Some(read_part(field).await?),
            Some("productFile") => upload.file = Some(read_part(field).await?),
            _ => {}
        }
    }
    Ok(upload)
}

async fn read_part(field: Field<'_>) -> AppResult<UploadedPart> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|err| AppError::BadRequest(format!("Failed to read upload: {err}")))?;
    Ok(UploadedPart {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    })
}

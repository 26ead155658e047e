use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set};
use serde_json::Value;

use crate::{
    audit,
    config::AppConfig,
    domain::money,
    dto::products::{CreatedProduct, ProductData, ProductList},
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel, ProductStatus},
    entity::users::{Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    integrations::{AssetKind, StoredObject, UploadRequest},
    middleware::auth::AuthUser,
    models::{Product, Seller},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// One file part of the create-product form.
#[derive(Debug, Clone)]
pub struct UploadedPart {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// The raw create-product form, parts absent when the client omitted them.
#[derive(Debug, Default)]
pub struct ProductUpload {
    pub data: Option<String>,
    pub image: Option<UploadedPart>,
    pub file: Option<UploadedPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub title: String,
    pub price: Decimal,
    pub original_price: Decimal,
    pub category: String,
    pub description: String,
    pub about: Option<String>,
    pub message: Option<String>,
}

/// Check the whole form before anything is uploaded.
pub fn validate_upload(upload: &ProductUpload, config: &AppConfig) -> AppResult<NewProduct> {
    let missing: Vec<&str> = [
        ("data", upload.data.is_none()),
        ("productImage", upload.image.is_none()),
        ("productFile", upload.file.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, absent)| absent.then_some(name))
    .collect();
    let (Some(raw), Some(image), Some(file)) = (&upload.data, &upload.image, &upload.file) else {
        return Err(AppError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    };

    let data: ProductData = serde_json::from_str(raw)
        .map_err(|_| AppError::BadRequest("Invalid form data format".into()))?;
    let product = validate_data(data)?;

    if !image.content_type.starts_with("image/") {
        return Err(AppError::BadRequest("Invalid image file type".into()));
    }
    if image.bytes.len() > config.max_image_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "Image must be at most {} MB",
            config.max_image_bytes / (1024 * 1024)
        )));
    }
    if file.bytes.is_empty() {
        return Err(AppError::BadRequest("Product file is empty".into()));
    }
    if file.bytes.len() > config.max_file_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "Product file must be at most {} MB",
            config.max_file_bytes / (1024 * 1024)
        )));
    }

    Ok(product)
}

fn validate_data(data: ProductData) -> AppResult<NewProduct> {
    let title = non_blank(data.title);
    let category = non_blank(data.category);
    let description = non_blank(data.description);
    let price_given = data.price.as_ref().is_some_and(|v| !is_blank(v));

    let missing: Vec<&str> = [
        ("title", title.is_none()),
        ("price", !price_given),
        ("category", category.is_none()),
        ("description", description.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, absent)| absent.then_some(name))
    .collect();
    let (Some(title), Some(category), Some(description), true) =
        (title, category, description, price_given)
    else {
        return Err(AppError::BadRequest(format!(
            "Missing required fields in data: {}",
            missing.join(", ")
        )));
    };

    let price = data
        .price
        .as_ref()
        .and_then(strict_amount)
        .filter(|p| *p > Decimal::ZERO)
        .ok_or_else(|| AppError::BadRequest("Invalid price value".into()))?;

    let original_price = match data.original_price.as_ref().filter(|v| !is_blank(v)) {
        None => price,
        Some(value) => strict_amount(value)
            .ok_or_else(|| AppError::BadRequest("Invalid original price value".into()))?,
    };
    if original_price < price {
        return Err(AppError::BadRequest(
            "Original price must be greater than or equal to price".into(),
        ));
    }
    if !money::fits_column(original_price) {
        return Err(AppError::BadRequest(format!(
            "Price must not exceed {}",
            money::format_usd(money::MAX_AMOUNT)
        )));
    }

    Ok(NewProduct {
        title,
        price,
        original_price,
        category,
        description,
        about: non_blank(data.about),
        message: non_blank(data.message),
    })
}

fn strict_amount(value: &Value) -> Option<Decimal> {
    let amount = match value {
        Value::String(s) => money::parse_strict(s),
        Value::Number(n) => money::parse_strict(&n.to_string()),
        _ => None,
    }?;
    Some(money::round_currency(amount))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    upload: ProductUpload,
) -> AppResult<ApiResponse<CreatedProduct>> {
    let product = validate_upload(&upload, &state.config)?;
    let (Some(image), Some(file)) = (upload.image, upload.file) else {
        return Err(AppError::BadRequest("Missing required fields".into()));
    };

    if Users::find_by_id(user.user_id.clone()).one(&state.orm).await?.is_none() {
        return Err(AppError::BadRequest("User profile not found".into()));
    }

    let stored_image = state
        .storage
        .upload(upload_request(AssetKind::Image, image))
        .await?;
    let stored_file = match state.storage.upload(upload_request(AssetKind::File, file)).await {
        Ok(stored) => stored,
        Err(err) => {
            discard_uploads(state, &[&stored_image]).await;
            return Err(err.into());
        }
    };

    let active = ActiveModel {
        id: NotSet,
        title: Set(product.title),
        price: Set(product.price),
        original_price: Set(product.original_price),
        description: Set(product.description),
        about: Set(product.about),
        category: Set(product.category),
        image_url: Set(stored_image.url.clone()),
        image_public_id: Set(Some(stored_image.public_id.clone())),
        product_url: Set(stored_file.url.clone()),
        file_public_id: Set(Some(stored_file.public_id.clone())),
        message: Set(product.message),
        status: Set(ProductStatus::Active),
        deleted_at: Set(None),
        created_by: Set(user.user_id.clone()),
        created_at: NotSet,
        updated_at: NotSet,
    };

    let saved = match active.insert(&state.orm).await {
        Ok(saved) => saved,
        Err(err) => {
            tracing::error!(error = %err, user_id = %user.user_id, "failed to save product");
            discard_uploads(state, &[&stored_image, &stored_file]).await;
            return Err(err.into());
        }
    };

    audit::record(
        &state.pool,
        &user.user_id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": saved.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product uploaded successfully",
        CreatedProduct {
            id: saved.id,
            image_url: saved.image_url,
            product_url: saved.product_url,
        },
        Some(Meta::empty()),
    ))
}

fn upload_request(kind: AssetKind, part: UploadedPart) -> UploadRequest {
    UploadRequest {
        kind,
        file_name: part.file_name,
        content_type: part.content_type,
        bytes: part.bytes,
    }
}

async fn discard_uploads(state: &AppState, objects: &[&StoredObject]) {
    for object in objects {
        if let Err(err) = state.storage.destroy(object).await {
            tracing::warn!(error = %err, public_id = %object.public_id, "failed to clean up upload");
        }
    }
}

/// Soft delete: the row stays so past orders keep their download link.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    product_id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let product = Products::find_by_id(product_id)
        .filter(Column::Status.eq(ProductStatus::Active))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if product.created_by != user.user_id {
        return Err(AppError::Forbidden);
    }

    let now = Utc::now().fixed_offset();
    let mut active: ActiveModel = product.into();
    active.status = Set(ProductStatus::Deleted);
    active.deleted_at = Set(Some(now));
    active.updated_at = Set(now);
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        &user.user_id,
        "product_delete",
        "products",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product deleted",
        serde_json::json!({ "productId": product_id }),
        Some(Meta::empty()),
    ))
}

pub async fn list_seller_products(
    state: &AppState,
    seller_id: &str,
) -> AppResult<ApiResponse<ProductList>> {
    let products = Products::find()
        .find_also_related(Users)
        .filter(
            Condition::all()
                .add(Column::CreatedBy.eq(seller_id))
                .add(Column::Status.eq(ProductStatus::Active)),
        )
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|(product, seller)| product_from_entity(product, seller))
        .collect();

    Ok(ApiResponse::success(
        "Products",
        ProductList { products },
        None,
    ))
}

pub async fn get_product(state: &AppState, id: i32) -> AppResult<ApiResponse<Product>> {
    let (product, seller) = Products::find_by_id(id)
        .find_also_related(Users)
        .filter(Column::Status.eq(ProductStatus::Active))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Product",
        product_from_entity(product, seller),
        None,
    ))
}

pub fn product_from_entity(model: ProductModel, seller: Option<UserModel>) -> Product {
    Product {
        id: model.id,
        title: model.title,
        price: model.price,
        original_price: model.original_price,
        description: model.description,
        about: model.about,
        category: model.category,
        image_url: model.image_url,
        product_url: model.product_url,
        message: model.message,
        status: match model.status {
            ProductStatus::Active => "active".to_string(),
            ProductStatus::Deleted => "deleted".to_string(),
        },
        created_by: model.created_by,
        seller: seller.map(|user| Seller {
            id: user.id,
            name: user.name,
            image: user.image,
        }),
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn config() -> AppConfig {
        AppConfig::for_tests("postgres://localhost/unused", "secret")
    }

    fn part(content_type: &str, len: usize) -> UploadedPart {
        UploadedPart {
            file_name: "asset".into(),
            content_type: content_type.into(),
            bytes: vec![1; len],
        }
    }

    fn upload(data: &str) -> ProductUpload {
        ProductUpload {
            data: Some(data.into()),
            image: Some(part("image/png", 16)),
            file: Some(part("application/zip", 32)),
        }
    }

    fn bad_request(result: AppResult<NewProduct>) -> String {
        match result {
            Err(AppError::BadRequest(msg)) => msg,
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn missing_parts_are_listed() {
        let mut form = upload("{}");
        form.file = None;
        let msg = bad_request(validate_upload(&form, &config()));
        assert_eq!(msg, "Missing required fields: productFile");
    }

    #[test]
    fn missing_data_fields_are_listed() {
        let msg = bad_request(validate_upload(&upload(r#"{"title": "Kit", "price": ""}"#), &config()));
        assert_eq!(msg, "Missing required fields in data: price, category, description");
    }

    #[test]
    fn original_price_defaults_to_price() {
        let form = upload(
            r#"{"title": "Kit", "price": "19.999", "category": "UI kits", "description": "d"}"#,
        );
        let product = validate_upload(&form, &config()).unwrap();
        assert_eq!(product.price, dec!(20.00));
        assert_eq!(product.original_price, product.price);
    }

    #[test]
    fn discount_below_price_is_rejected() {
        let form = upload(
            r#"{"title": "Kit", "price": 20, "originalPrice": 10, "category": "c", "description": "d"}"#,
        );
        assert!(bad_request(validate_upload(&form, &config())).starts_with("Original price"));
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let form = upload(r#"{"title": "Kit", "price": "0", "category": "c", "description": "d"}"#);
        assert_eq!(bad_request(validate_upload(&form, &config())), "Invalid price value");
    }

    #[test]
    fn prices_beyond_the_money_column_are_rejected() {
        let form = upload(
            r#"{"title": "Kit", "price": "100000000", "category": "c", "description": "d"}"#,
        );
        assert_eq!(
            bad_request(validate_upload(&form, &config())),
            "Price must not exceed $99999999.99"
        );

        let form = upload(
            r#"{"title": "Kit", "price": 5, "originalPrice": "1e12", "category": "c", "description": "d"}"#,
        );
        assert!(bad_request(validate_upload(&form, &config())).starts_with("Price must not exceed"));

        let form = upload(
            r#"{"title": "Kit", "price": "99999999.99", "category": "c", "description": "d"}"#,
        );
        assert!(validate_upload(&form, &config()).is_ok());
    }

    #[test]
    fn image_must_be_an_image_and_small() {
        let data = r#"{"title": "Kit", "price": 5, "category": "c", "description": "d"}"#;
        let mut form = upload(data);
        form.image = Some(part("application/pdf", 16));
        assert_eq!(bad_request(validate_upload(&form, &config())), "Invalid image file type");

        let mut cfg = config();
        cfg.max_image_bytes = 8;
        let form = upload(data);
        assert!(matches!(
            validate_upload(&form, &cfg),
            Err(AppError::PayloadTooLarge(_))
        ));
    }
}

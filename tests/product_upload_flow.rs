mod common;

use std::sync::Arc;

use mockall::predicate::function;
use rust_decimal::dec;
use sea_orm::{EntityTrait, PaginatorTrait};

use sellbetter_api::{
    entity::products::Entity as Products,
    error::AppError,
    integrations::{
        AssetKind, StorageError, StoredObject, UploadRequest, storage::MockObjectStorage,
    },
    services::product_service::{self, ProductUpload, UploadedPart},
};

use common::{create_user, database_url, setup_state};

fn upload() -> ProductUpload {
    ProductUpload {
        data: Some(
            serde_json::json!({
                "title": "Icon Pack",
                "price": "12.50",
                "originalPrice": 20,
                "category": "Design",
                "description": "Line icons"
            })
            .to_string(),
        ),
        image: Some(UploadedPart {
            file_name: "cover.png".into(),
            content_type: "image/png".into(),
            bytes: vec![1, 2, 3],
        }),
        file: Some(UploadedPart {
            file_name: "icons.zip".into(),
            content_type: "application/zip".into(),
            bytes: vec![4, 5, 6, 7],
        }),
    }
}

fn stored(kind: AssetKind) -> StoredObject {
    StoredObject {
        url: format!("https://cdn.example/{}", kind.as_str()),
        public_id: format!("products/{}", kind.as_str()),
        resource_type: match kind {
            AssetKind::Image => "image".to_string(),
            AssetKind::File => "raw".to_string(),
        },
    }
}

#[tokio::test]
async fn product_upload_stores_files_and_cleans_up_on_failure() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let seller = create_user(&state, "seller_1", "seller@example.com").await?;

    // Happy path: both files uploaded, row inserted.
    let mut storage = MockObjectStorage::new();
    storage
        .expect_upload()
        .times(2)
        .returning(|request: UploadRequest| Ok(stored(request.kind)));
    storage.expect_destroy().never();
    let ok_state = state.clone().with_storage(Arc::new(storage));

    let created = product_service::create_product(&ok_state, &seller, upload())
        .await?
        .data
        .unwrap();
    assert_eq!(created.image_url, "https://cdn.example/image");
    assert_eq!(created.product_url, "https://cdn.example/file");

    let product = product_service::get_product(&state, created.id).await?.data.unwrap();
    assert_eq!(product.price, dec!(12.50));
    assert_eq!(product.original_price, dec!(20));
    assert_eq!(product.seller.map(|s| s.id), Some("seller_1".to_string()));

    // File upload fails: the already uploaded image is destroyed, nothing is inserted.
    let mut storage = MockObjectStorage::new();
    storage
        .expect_upload()
        .times(2)
        .returning(|request: UploadRequest| match request.kind {
            AssetKind::Image => Ok(stored(AssetKind::Image)),
            AssetKind::File => Err(StorageError::Rejected("quota exceeded".into())),
        });
    storage
        .expect_destroy()
        .with(function(|object: &StoredObject| object.public_id == "products/image"))
        .times(1)
        .returning(|_| Ok(()));
    let failing_state = state.clone().with_storage(Arc::new(storage));

    let err = product_service::create_product(&failing_state, &seller, upload())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Upstream(_)));
    assert_eq!(Products::find().count(&state.orm).await?, 1);

    // Unknown seller: rejected before any upload.
    let mut storage = MockObjectStorage::new();
    storage.expect_upload().never();
    let stranger = sellbetter_api::middleware::auth::AuthUser {
        user_id: "ghost".into(),
        email: None,
    };
    let err = product_service::create_product(
        &state.clone().with_storage(Arc::new(storage)),
        &stranger,
        upload(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg == "User profile not found"));

    Ok(())
}

mod common;

use sea_orm::{EntityTrait, PaginatorTrait};

use sellbetter_api::{
    dto::users::UpsertUserRequest,
    entity::users::Entity as Users,
    error::AppError,
    middleware::auth::AuthUser,
    services::user_service,
};

use common::{database_url, exclusive_database, setup_state};

fn sign_in(first: &str, email: &str) -> UpsertUserRequest {
    serde_json::from_value(serde_json::json!({
        "user": {
            "firstName": first,
            "lastName": "Tester",
            "emailAddresses": [{ "emailAddress": email }]
        }
    }))
    .unwrap()
}

fn subject(id: &str) -> AuthUser {
    AuthUser {
        user_id: id.to_string(),
        email: None,
    }
}

// Rows are keyed by the token subject; an email can only belong to one subject.
#[tokio::test]
async fn sign_in_is_idempotent_and_scoped_to_the_subject() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        return Ok(());
    };
    let _db = exclusive_database().await;
    let state = setup_state(&url).await?;

    let owner = subject("user_owner");
    let created = user_service::upsert_user(&state, &owner, sign_in("Ada", "ada@example.com")).await?;
    assert_eq!(created.message, "User created");
    let created = created.data.unwrap();
    assert_eq!(created.id, "user_owner");
    assert_eq!(created.name, "Ada Tester");

    // Signing in again returns the stored row, even with a new email.
    let again = user_service::upsert_user(&state, &owner, sign_in("Ada", "ada@example.com")).await?;
    assert_eq!(again.message, "User exists");
    assert_eq!(again.data.unwrap().id, "user_owner");
    let moved = user_service::upsert_user(&state, &owner, sign_in("Ada", "ada@new.example")).await?;
    let moved = moved.data.unwrap();
    assert_eq!(moved.id, "user_owner");
    assert_eq!(moved.email, "ada@example.com");

    // Another subject cannot take over the address.
    let err = user_service::upsert_user(&state, &subject("user_other"), sign_in("Eve", "ada@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
    assert_eq!(Users::find().count(&state.orm).await?, 1);
    assert!(Users::find_by_id("user_other".to_string()).one(&state.orm).await?.is_none());

    Ok(())
}

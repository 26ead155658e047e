use sea_orm::EntityTrait;

use crate::{
    audit,
    dto::users::UpsertUserRequest,
    entity::users::{Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    state::AppState,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub image: Option<String>,
}

pub fn validate_profile(payload: &UpsertUserRequest) -> AppResult<NewUser> {
    let profile = payload.user.as_ref();
    let first = profile
        .and_then(|p| p.first_name.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let last = profile
        .and_then(|p| p.last_name.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let email = profile.and_then(|p| p.primary_email());

    let (Some(first), Some(last), Some(email), Some(profile)) = (first, last, email, profile) else {
        let missing: Vec<&str> = [
            ("firstName", first.is_none()),
            ("lastName", last.is_none()),
            ("email", email.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();
        return Err(AppError::BadRequest(format!(
            "Invalid user data: missing {}",
            missing.join(", ")
        )));
    };

    Ok(NewUser {
        name: format!("{first} {last}"),
        email: email.to_string(),
        image: profile.image(),
    })
}

/// Create the user on first sign-in. The row is keyed by the token subject: a
/// subject that already has a row gets it back unchanged, and an email held by
/// another account is refused.
pub async fn upsert_user(
    state: &AppState,
    auth: &AuthUser,
    payload: UpsertUserRequest,
) -> AppResult<ApiResponse<User>> {
    let new_user = validate_profile(&payload)?;

    if let Some(existing) = Users::find_by_id(auth.user_id.clone()).one(&state.orm).await? {
        return Ok(ApiResponse::success("User exists", user_from_entity(existing), None));
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO users (id, name, email, image)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(&auth.user_id)
    .bind(&new_user.name)
    .bind(&new_user.email)
    .bind(&new_user.image)
    .execute(&state.pool)
    .await?
    .rows_affected();

    // Nothing inserted: either a concurrent sign-in of the same subject won
    // the race, or the email belongs to someone else.
    let Some(user) = Users::find_by_id(auth.user_id.clone()).one(&state.orm).await? else {
        tracing::warn!(user_id = %auth.user_id, "sign-in email already registered to another account");
        return Err(AppError::Conflict(
            "Email is already registered to another account".into(),
        ));
    };

    if inserted > 0 {
        tracing::info!(user_id = %user.id, "user created");
        audit::record(
            &state.pool,
            &user.id,
            "user_create",
            "users",
            serde_json::json!({ "email": user.email }),
        )
        .await;
    }

    let message = if inserted > 0 { "User created" } else { "User exists" };
    Ok(ApiResponse::success(message, user_from_entity(user), None))
}

pub fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        name: model.name,
        email: model.email,
        image: model.image,
        created_at: model.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> UpsertUserRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn profile_builds_full_name_and_image() {
        let user = validate_profile(&request(
            r#"{"user": {"firstName": "Ada", "lastName": "Lovelace",
                "emailAddresses": [{"emailAddress": "ada@example.com"}],
                "profileImageUrl": "https://img.example/ada.png"}}"#,
        ))
        .unwrap();
        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.image.as_deref(), Some("https://img.example/ada.png"));
    }

    #[test]
    fn missing_fields_are_reported() {
        let err = validate_profile(&request(r#"{"user": {"firstName": "Ada"}}"#)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid user data: missing lastName, email");

        let err = validate_profile(&request("{}")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid user data: missing firstName, lastName, email");
    }
}

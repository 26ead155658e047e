use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::users::UpsertUserRequest,
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    services::user_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(upsert_user))
}

#[utoipa::path(
    post,
    path = "/api/user",
    request_body = UpsertUserRequest,
    responses(
        (status = 200, description = "Existing or newly created user", body = ApiResponse<User>),
        (status = 400, description = "Profile is missing a name or email"),
        (status = 401, description = "Missing or invalid token"),
        (status = 409, description = "Email belongs to another account"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn upsert_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpsertUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::upsert_user(&state, &user, payload).await?;
    Ok(Json(resp))
}

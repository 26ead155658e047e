use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::analytics::{AnalyticsQuery, AnalyticsSnapshot},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::analytics_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(analytics))
}

#[utoipa::path(
    get,
    path = "/api/analytics",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Dashboard rollups", body = ApiResponse<AnalyticsSnapshot>),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "userId does not match the token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Analytics"
)]
pub async fn analytics(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<ApiResponse<AnalyticsSnapshot>>> {
    // Without userId the snapshot covers the whole marketplace.
    let seller_id = match query.user_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        Some(requested) => Some(user.resolve(Some(requested))?),
        None => None,
    };
    let resp = analytics_service::snapshot(&state, seller_id).await?;
    Ok(Json(resp))
}

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::orders::{CheckoutRequest, CheckoutResult, OrderList, OrdersQuery},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_orders).post(checkout))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrdersQuery),
    responses(
        (status = 200, description = "Orders of the user, newest first", body = ApiResponse<OrderList>),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrdersQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let user_id = user.resolve(query.user_id.as_deref())?;
    let resp = order_service::list_orders(&state, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Orders created and receipt queued", body = ApiResponse<CheckoutResult>),
        (status = 400, description = "Empty cart, lines missing required fields, or unavailable products"),
        (status = 401, description = "Missing or invalid token"),
        (status = 402, description = "Payment missing, short of the order total, or already used"),
        (status = 403, description = "userId does not match the token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResult>>> {
    let resp = order_service::checkout(&state, &user, payload).await?;
    Ok(Json(resp))
}

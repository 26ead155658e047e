use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{delete, get},
};

use crate::{
    dto::cart::{AddToCartRequest, CartCleared, CartList, CartQuery, CartSummaryResponse},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartItem,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart_list).post(add_to_cart).delete(remove_from_cart))
        .route("/summary", get(cart_summary))
        .route("/clear", delete(clear_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    params(CartQuery),
    responses(
        (status = 200, description = "Cart rows for the user, oldest first", body = ApiResponse<CartList>),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "userId does not match the token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CartQuery>,
) -> AppResult<Json<ApiResponse<CartList>>> {
    let user_id = user.resolve(query.user_id.as_deref())?;
    let resp = cart_service::list_cart(&state, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/cart/summary",
    params(CartQuery),
    responses(
        (status = 200, description = "Cart grouped by product", body = ApiResponse<CartSummaryResponse>),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_summary(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CartQuery>,
) -> AppResult<Json<ApiResponse<CartSummaryResponse>>> {
    let user_id = user.resolve(query.user_id.as_deref())?;
    let resp = cart_service::cart_summary(&state, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Row added to the cart", body = ApiResponse<CartItem>),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    let user_id = user.resolve(payload.user_id.as_deref())?;
    let resp = cart_service::add_to_cart(&state, user_id, payload.product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    params(CartQuery),
    responses(
        (status = 200, description = "Product removed from the cart", body = ApiResponse<serde_json::Value>),
        (status = 400, description = "productId missing"),
        (status = 404, description = "Product not in the cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CartQuery>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let user_id = user.resolve(query.user_id.as_deref())?;
    let product_id = query
        .product_id
        .ok_or_else(|| AppError::BadRequest("productId is required".into()))?;
    let resp = cart_service::remove_from_cart(&state, user_id, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/clear",
    params(CartQuery),
    responses(
        (status = 200, description = "Cart emptied", body = ApiResponse<CartCleared>),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CartQuery>,
) -> AppResult<Json<ApiResponse<CartCleared>>> {
    let user_id = user.resolve(query.user_id.as_deref())?;
    let resp = cart_service::clear_cart(&state, user_id).await?;
    Ok(Json(resp))
}

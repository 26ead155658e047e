use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    Set,
};

use crate::{
    audit,
    domain::cart::{self, CartEntry},
    domain::money::Price,
    dto::cart::{CartCleared, CartList, CartSummaryResponse},
    entity::{
        cart::{ActiveModel as CartActive, Column as CartCol, Entity as Cart, Model as CartModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel, ProductStatus},
    },
    error::{AppError, AppResult},
    models::CartItem,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Cart rows of a user joined with their product, oldest first.
pub async fn load_entries<C>(conn: &C, user_id: &str) -> AppResult<Vec<CartEntry>>
where
    C: ConnectionTrait,
{
    let rows = Cart::find()
        .find_also_related(Products)
        .filter(CartCol::UserId.eq(user_id))
        .order_by_asc(CartCol::CreatedAt)
        .order_by_asc(CartCol::Id)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(row, product)| product.map(|p| entry_from_rows(&row, p)))
        .collect())
}

fn entry_from_rows(row: &CartModel, product: ProductModel) -> CartEntry {
    CartEntry {
        id: Some(row.id),
        ..entry_from_product(product)
    }
}

/// Product snapshot as it would appear on a new cart row.
pub fn entry_from_product(product: ProductModel) -> CartEntry {
    CartEntry {
        id: None,
        product_id: product.id,
        title: product.title,
        price: Price::new(product.price),
        original_price: Some(Price::new(product.original_price)),
        category: Some(product.category),
        image_url: Some(product.image_url),
        product_url: Some(product.product_url),
    }
}

pub async fn list_cart(state: &AppState, user_id: &str) -> AppResult<ApiResponse<CartList>> {
    let items = load_entries(&state.orm, user_id).await?;
    Ok(ApiResponse::success("OK", CartList { items }, None))
}

pub async fn cart_summary(
    state: &AppState,
    user_id: &str,
) -> AppResult<ApiResponse<CartSummaryResponse>> {
    let entries = load_entries(&state.orm, user_id).await?;
    let summary = cart::aggregate(&entries);
    let data = CartSummaryResponse {
        item_count: summary.item_count(),
        grand_total: summary.grand_total(),
        lines: summary.into_lines(),
    };
    Ok(ApiResponse::success("OK", data, None))
}

/// Add one unit of a product. Every call inserts a new row.
pub async fn add_to_cart(
    state: &AppState,
    user_id: &str,
    product_id: i32,
) -> AppResult<ApiResponse<CartItem>> {
    let product = Products::find_by_id(product_id)
        .filter(ProdCol::Status.eq(ProductStatus::Active))
        .one(&state.orm)
        .await?;
    if product.is_none() {
        return Err(AppError::NotFound);
    }

    let row = CartActive {
        id: NotSet,
        product_id: Set(product_id),
        user_id: Set(user_id.to_string()),
        quantity: Set(1),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user_id,
        "cart_add",
        "cart",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success("Added to cart", cart_item_from_entity(row), None))
}

/// Remove every row of a product from the cart.
pub async fn remove_from_cart(
    state: &AppState,
    user_id: &str,
    product_id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Cart::delete_many()
        .filter(
            Condition::all()
                .add(CartCol::UserId.eq(user_id))
                .add(CartCol::ProductId.eq(product_id)),
        )
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user_id,
        "cart_remove",
        "cart",
        serde_json::json!({ "product_id": product_id, "rows": result.rows_affected }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart(state: &AppState, user_id: &str) -> AppResult<ApiResponse<CartCleared>> {
    let result = Cart::delete_many()
        .filter(CartCol::UserId.eq(user_id))
        .exec(&state.orm)
        .await?;

    audit::record(
        &state.pool,
        user_id,
        "cart_clear",
        "cart",
        serde_json::json!({ "rows": result.rows_affected }),
    )
    .await;

    Ok(ApiResponse::success(
        "Cart cleared",
        CartCleared {
            removed: result.rows_affected,
        },
        Some(Meta::empty()),
    ))
}

fn cart_item_from_entity(model: CartModel) -> CartItem {
    CartItem {
        id: model.id,
        product_id: model.product_id,
        user_id: model.user_id,
        quantity: model.quantity,
        created_at: model.created_at,
    }
}

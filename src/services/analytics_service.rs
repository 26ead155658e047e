//! Dashboard rollups over orders and products. Every aggregate is coalesced so
//! an empty store reports zeros rather than nulls.

use rust_decimal::Decimal;

use crate::{
    db::DbPool,
    dto::analytics::{AnalyticsSnapshot, CategorySales, DailyEarning, ProductSales},
    error::AppResult,
    response::ApiResponse,
    state::AppState,
};

/// Snapshot for one seller's products, or for the whole marketplace when
/// `seller_id` is `None`.
pub async fn snapshot(
    state: &AppState,
    seller_id: Option<&str>,
) -> AppResult<ApiResponse<AnalyticsSnapshot>> {
    let data = compute(&state.pool, seller_id).await?;
    Ok(ApiResponse::success("Analytics", data, None))
}

pub async fn compute(pool: &DbPool, seller_id: Option<&str>) -> AppResult<AnalyticsSnapshot> {
    let (total_earnings, total_orders): (Decimal, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(o.total_price), 0), COUNT(o.id)
        FROM orders o
        JOIN products p ON p.id = o.product_id
        WHERE ($1::TEXT IS NULL OR p.created_by = $1)
        "#,
    )
    .bind(seller_id)
    .fetch_one(pool)
    .await?;

    let (active_products, deleted_products): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FILTER (WHERE status = 'active'),
               COUNT(*) FILTER (WHERE status = 'deleted')
        FROM products
        WHERE ($1::TEXT IS NULL OR created_by = $1)
        "#,
    )
    .bind(seller_id)
    .fetch_one(pool)
    .await?;

    let daily_earnings = sqlx::query_as::<_, DailyEarning>(
        r#"
        SELECT DATE(o.created_at) AS date, COALESCE(SUM(o.total_price), 0) AS total
        FROM orders o
        JOIN products p ON p.id = o.product_id
        WHERE ($1::TEXT IS NULL OR p.created_by = $1)
        GROUP BY DATE(o.created_at)
        ORDER BY DATE(o.created_at)
        "#,
    )
    .bind(seller_id)
    .fetch_all(pool)
    .await?;

    let products = sqlx::query_as::<_, ProductSales>(
        r#"
        SELECT p.id, p.title, p.category, p.price,
               COALESCE(SUM(o.quantity), 0)::BIGINT AS total_sales,
               COALESCE(SUM(o.total_price), 0) AS revenue
        FROM products p
        LEFT JOIN orders o ON o.product_id = p.id
        WHERE p.status = 'active' AND ($1::TEXT IS NULL OR p.created_by = $1)
        GROUP BY p.id
        ORDER BY revenue DESC, p.id
        "#,
    )
    .bind(seller_id)
    .fetch_all(pool)
    .await?;

    let product_categories = sqlx::query_as::<_, CategorySales>(
        r#"
        SELECT p.category AS name, COALESCE(SUM(o.quantity), 0)::BIGINT AS total_sales
        FROM products p
        LEFT JOIN orders o ON o.product_id = p.id
        WHERE p.status = 'active' AND ($1::TEXT IS NULL OR p.created_by = $1)
        GROUP BY p.category
        ORDER BY total_sales DESC, p.category
        "#,
    )
    .bind(seller_id)
    .fetch_all(pool)
    .await?;

    Ok(AnalyticsSnapshot {
        total_earnings,
        total_orders,
        active_products,
        deleted_products,
        daily_earnings,
        products,
        product_categories,
    })
}

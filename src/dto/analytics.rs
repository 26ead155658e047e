use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    /// Restrict to this seller's products; marketplace-wide when absent
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSnapshot {
    #[schema(value_type = String)]
    pub total_earnings: Decimal,
    pub total_orders: i64,
    pub active_products: i64,
    pub deleted_products: i64,
    pub daily_earnings: Vec<DailyEarning>,
    pub products: Vec<ProductSales>,
    pub product_categories: Vec<CategorySales>,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct DailyEarning {
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    #[schema(value_type = String)]
    pub total: Decimal,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub id: i32,
    pub title: String,
    pub category: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub total_sales: i64,
    #[schema(value_type = String)]
    pub revenue: Decimal,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategorySales {
    pub name: String,
    pub total_sales: i64,
}

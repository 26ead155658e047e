use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::checkout::OrderDetailInput;
use crate::models::Order;

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub user_id: Option<String>,
    /// Lines to purchase. When omitted the persisted cart is checked out.
    pub order_details: Option<Vec<OrderDetailInput>>,
    /// Payment provider order id to verify before recording the purchase
    pub payment_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResult {
    pub orders: Vec<Order>,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub email_queued: bool,
    pub email_sent: bool,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct OrdersQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderList {
    pub orders: Vec<Order>,
}

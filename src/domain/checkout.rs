//! Checkout drafting: turn submitted order lines (or an aggregated cart) into
//! validated order drafts. Every line is checked before anything is written.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use utoipa::ToSchema;

use crate::domain::cart::{CartEntry, CartSummary};
use crate::domain::money::{self, Price, round_currency};

pub const DEFAULT_CATEGORY: &str = "Uncategorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    Idle,
    Validating,
    Rejected,
    Submitting,
    Failed,
    Completed,
}

impl CheckoutPhase {
    pub fn can_advance_to(self, next: CheckoutPhase) -> bool {
        use CheckoutPhase::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Rejected)
                | (Validating, Submitting)
                | (Submitting, Failed)
                | (Submitting, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CheckoutPhase::Rejected | CheckoutPhase::Failed | CheckoutPhase::Completed
        )
    }
}

/// Phase tracker for one checkout request.
#[derive(Debug)]
pub struct CheckoutAttempt {
    user_id: String,
    phase: CheckoutPhase,
}

impl CheckoutAttempt {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            phase: CheckoutPhase::Idle,
        }
    }

    pub fn phase(&self) -> CheckoutPhase {
        self.phase
    }

    pub fn advance(&mut self, next: CheckoutPhase) {
        if !self.phase.can_advance_to(next) {
            tracing::warn!(
                user_id = %self.user_id,
                from = ?self.phase,
                to = ?next,
                "unexpected checkout transition"
            );
        }
        tracing::debug!(user_id = %self.user_id, from = ?self.phase, to = ?next, "checkout phase");
        self.phase = next;
    }
}

/// One submitted order line. Fields are optional so that validation, not
/// deserialization, decides what is missing.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailInput {
    #[serde(default, deserialize_with = "lenient_int")]
    #[schema(value_type = Option<i32>)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "10.00")]
    pub price: Option<Price>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    #[schema(value_type = Option<i32>)]
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub product_id: i32,
    pub title: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub category: String,
    pub image_url: Option<String>,
    pub product_url: Option<String>,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub total_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutRejection {
    #[error("Your cart is empty")]
    EmptyCart,
    /// Indexes of the offending lines.
    #[error("Some orders are missing required fields")]
    MissingFields(Vec<usize>),
    /// Product ids that are unknown or deleted.
    #[error("Some products are no longer available")]
    Unavailable(Vec<i32>),
    #[error("Order total exceeds the maximum amount")]
    AmountTooLarge,
}

/// Validate every line, then build drafts. A single bad line rejects the batch.
pub fn build_drafts(details: &[OrderDetailInput]) -> Result<Vec<OrderDraft>, CheckoutRejection> {
    if details.is_empty() {
        return Err(CheckoutRejection::EmptyCart);
    }

    let mut drafts = Vec::with_capacity(details.len());
    let mut invalid = Vec::new();
    for (idx, detail) in details.iter().enumerate() {
        match draft_from_detail(detail) {
            Some(draft) => drafts.push(draft),
            None => invalid.push(idx),
        }
    }

    if !invalid.is_empty() {
        return Err(CheckoutRejection::MissingFields(invalid));
    }
    Ok(drafts)
}

fn draft_from_detail(detail: &OrderDetailInput) -> Option<OrderDraft> {
    let product_id = detail
        .product_id
        .and_then(|id| i32::try_from(id).ok())
        .filter(|id| *id > 0)?;
    let title = detail
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())?;
    let price = detail.price.filter(Price::is_positive)?.amount();
    let quantity = match detail.quantity {
        None => 1,
        Some(q) => i32::try_from(q).ok().filter(|q| *q >= 1)?,
    };

    let category = detail
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CATEGORY);

    Some(OrderDraft {
        product_id,
        title: title.to_string(),
        price,
        category: category.to_string(),
        image_url: detail.image_url.clone().filter(|u| !u.is_empty()),
        product_url: detail.product_url.clone().filter(|u| !u.is_empty()),
        quantity,
        total_price: round_currency(price * Decimal::from(quantity)),
    })
}

/// Reprice validated drafts from the live catalog, keyed by product id.
///
/// Only the product id and quantity of each draft survive: title, price,
/// category and urls are taken from `catalog`. Lines for the same product are
/// merged in first-seen order.
pub fn price_from_catalog(
    drafts: &[OrderDraft],
    catalog: &HashMap<i32, CartEntry>,
) -> Result<Vec<OrderDraft>, CheckoutRejection> {
    let mut unavailable: Vec<i32> = Vec::new();
    for draft in drafts {
        if !catalog.contains_key(&draft.product_id) && !unavailable.contains(&draft.product_id) {
            unavailable.push(draft.product_id);
        }
    }
    if !unavailable.is_empty() {
        return Err(CheckoutRejection::Unavailable(unavailable));
    }

    let mut merged: Vec<(i32, i32)> = Vec::new();
    let mut positions: HashMap<i32, usize> = HashMap::new();
    for draft in drafts {
        match positions.get(&draft.product_id) {
            Some(&idx) => {
                let quantity = &mut merged[idx].1;
                *quantity = quantity
                    .checked_add(draft.quantity)
                    .ok_or(CheckoutRejection::AmountTooLarge)?;
            }
            None => {
                positions.insert(draft.product_id, merged.len());
                merged.push((draft.product_id, draft.quantity));
            }
        }
    }

    let mut priced = Vec::with_capacity(merged.len());
    for (product_id, quantity) in merged {
        let product = catalog
            .get(&product_id)
            .ok_or_else(|| CheckoutRejection::Unavailable(vec![product_id]))?;
        let price = product.price.amount();
        let total_price = round_currency(price * Decimal::from(quantity));
        if !money::fits_column(total_price) {
            return Err(CheckoutRejection::AmountTooLarge);
        }
        priced.push(OrderDraft {
            product_id,
            title: product.title.clone(),
            price,
            category: product
                .category
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            image_url: product.image_url.clone(),
            product_url: product.product_url.clone(),
            quantity,
            total_price,
        });
    }

    if !money::fits_column(grand_total(&priced)) {
        return Err(CheckoutRejection::AmountTooLarge);
    }
    Ok(priced)
}

/// Order lines for an aggregated cart, one per product.
pub fn details_from_summary(summary: &CartSummary) -> Vec<OrderDetailInput> {
    summary
        .lines()
        .iter()
        .map(|line| OrderDetailInput {
            product_id: Some(i64::from(line.product_id)),
            title: Some(line.title.clone()),
            price: Some(Price::new(line.price)),
            category: line.category.clone(),
            image_url: line.image_url.clone(),
            product_url: line.product_url.clone(),
            quantity: Some(i64::from(line.quantity)),
        })
        .collect()
}

pub fn grand_total(drafts: &[OrderDraft]) -> Decimal {
    round_currency(drafts.iter().map(|d| d.total_price).sum())
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::{CartEntry, aggregate};
    use rust_decimal::dec;

    fn parse(json: &str) -> Vec<OrderDetailInput> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_batch_is_rejected() {
        let err = build_drafts(&[]).unwrap_err();
        assert_eq!(err, CheckoutRejection::EmptyCart);
        assert_eq!(err.to_string(), "Your cart is empty");
    }

    #[test]
    fn one_incomplete_line_rejects_everything() {
        let details = parse(
            r#"[{"productId": 1, "title": "Icons", "price": "10.00"},
                {"productId": 2, "title": "", "price": "5.00"},
                {"productId": 3, "title": "Fonts"}]"#,
        );
        let err = build_drafts(&details).unwrap_err();
        assert_eq!(err, CheckoutRejection::MissingFields(vec![1, 2]));
        assert_eq!(err.to_string(), "Some orders are missing required fields");
    }

    #[test]
    fn defaults_are_applied() {
        let details = parse(r#"[{"productId": "7", "title": "Kit", "price": 12.5}]"#);
        let drafts = build_drafts(&details).unwrap();
        assert_eq!(drafts[0].product_id, 7);
        assert_eq!(drafts[0].quantity, 1);
        assert_eq!(drafts[0].category, DEFAULT_CATEGORY);
        assert_eq!(drafts[0].image_url, None);
        assert_eq!(drafts[0].total_price, dec!(12.5));
    }

    #[test]
    fn zero_quantity_and_non_positive_price_are_invalid() {
        let details = parse(
            r#"[{"productId": 1, "title": "A", "price": "3", "quantity": 0},
                {"productId": 2, "title": "B", "price": "-1"}]"#,
        );
        assert_eq!(
            build_drafts(&details).unwrap_err(),
            CheckoutRejection::MissingFields(vec![0, 1])
        );
    }

    #[test]
    fn cart_summary_checkout_totals_match() {
        let entry = |id: i32, price| CartEntry {
            id: None,
            product_id: id,
            title: format!("P{id}"),
            price: Price::new(price),
            original_price: None,
            category: None,
            image_url: None,
            product_url: None,
        };
        let entries = vec![entry(1, dec!(10.00)), entry(1, dec!(10.00)), entry(2, dec!(5.00))];
        let summary = aggregate(&entries);
        let drafts = build_drafts(&details_from_summary(&summary)).unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!((drafts[0].quantity, drafts[0].total_price), (2, dec!(20.00)));
        assert_eq!(grand_total(&drafts), dec!(25.00));
        assert_eq!(grand_total(&drafts), summary.grand_total());
    }

    fn listed(product_id: i32, price: Decimal) -> (i32, CartEntry) {
        (
            product_id,
            CartEntry {
                id: None,
                product_id,
                title: format!("Listed {product_id}"),
                price: Price::new(price),
                original_price: None,
                category: Some("Design".into()),
                image_url: Some(format!("https://img.example/{product_id}.png")),
                product_url: Some(format!("https://files.example/{product_id}.zip")),
            },
        )
    }

    #[test]
    fn catalog_prices_replace_submitted_values() {
        let details = parse(
            r#"[{"productId": 1, "title": "Cheap", "price": "0.01",
                 "productUrl": "https://elsewhere.example/x.zip", "quantity": 2},
                {"productId": 2, "title": "B", "price": "1"},
                {"productId": 1, "title": "Cheap again", "price": "0.01"}]"#,
        );
        let catalog = HashMap::from([listed(1, dec!(500.00)), listed(2, dec!(4.50))]);
        let drafts = price_from_catalog(&build_drafts(&details).unwrap(), &catalog).unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].product_id, 1);
        assert_eq!(drafts[0].title, "Listed 1");
        assert_eq!(drafts[0].price, dec!(500.00));
        assert_eq!(drafts[0].quantity, 3);
        assert_eq!(drafts[0].total_price, dec!(1500.00));
        assert_eq!(drafts[0].product_url.as_deref(), Some("https://files.example/1.zip"));
        assert_eq!(drafts[0].category, "Design");
        assert_eq!(grand_total(&drafts), dec!(1504.50));
    }

    #[test]
    fn unknown_products_are_listed_once() {
        let details = parse(
            r#"[{"productId": 9, "title": "A", "price": "1"},
                {"productId": 1, "title": "B", "price": "1"},
                {"productId": 9, "title": "A", "price": "1"}]"#,
        );
        let catalog = HashMap::from([listed(1, dec!(3))]);
        let err = price_from_catalog(&build_drafts(&details).unwrap(), &catalog).unwrap_err();
        assert_eq!(err, CheckoutRejection::Unavailable(vec![9]));
        assert_eq!(err.to_string(), "Some products are no longer available");
    }

    #[test]
    fn totals_beyond_the_money_column_are_rejected() {
        let details = parse(r#"[{"productId": 1, "title": "A", "price": "1", "quantity": 2000000000}]"#);
        let catalog = HashMap::from([listed(1, dec!(1.00))]);
        let err = price_from_catalog(&build_drafts(&details).unwrap(), &catalog).unwrap_err();
        assert_eq!(err, CheckoutRejection::AmountTooLarge);

        let details = parse(
            r#"[{"productId": 1, "title": "A", "price": "1", "quantity": 2000000000},
                {"productId": 1, "title": "A", "price": "1", "quantity": 2000000000}]"#,
        );
        let err = price_from_catalog(&build_drafts(&details).unwrap(), &catalog).unwrap_err();
        assert_eq!(err, CheckoutRejection::AmountTooLarge);
    }

    #[test]
    fn phases_follow_the_state_machine() {
        assert!(CheckoutPhase::Idle.can_advance_to(CheckoutPhase::Validating));
        assert!(CheckoutPhase::Validating.can_advance_to(CheckoutPhase::Rejected));
        assert!(!CheckoutPhase::Rejected.can_advance_to(CheckoutPhase::Submitting));
        assert!(!CheckoutPhase::Idle.can_advance_to(CheckoutPhase::Completed));
        assert!(CheckoutPhase::Completed.is_terminal());

        let mut attempt = CheckoutAttempt::new("user_1");
        attempt.advance(CheckoutPhase::Validating);
        attempt.advance(CheckoutPhase::Submitting);
        attempt.advance(CheckoutPhase::Completed);
        assert_eq!(attempt.phase(), CheckoutPhase::Completed);
    }
}

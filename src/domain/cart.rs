//! Cart aggregation: raw cart rows (one per add-to-cart click) folded into one
//! line per product.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::money::{Price, round_currency};

/// A cart row joined with the product snapshot needed for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    /// Server row id, absent for rows that only exist locally.
    #[serde(default)]
    pub id: Option<i32>,
    pub product_id: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    #[schema(value_type = String, example = "10.00")]
    pub price: Price,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "15.00")]
    pub original_price: Option<Price>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub product_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: i32,
    pub title: String,
    #[schema(value_type = String)]
    pub price: Decimal,
    #[schema(value_type = String)]
    pub original_price: Decimal,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub product_url: Option<String>,
    pub quantity: u32,
    #[schema(value_type = String)]
    pub total_price: Decimal,
}

impl CartLine {
    fn seed(entry: &CartEntry) -> Self {
        let price = entry.price.amount();
        Self {
            product_id: entry.product_id,
            title: entry.title.clone(),
            price,
            original_price: entry.original_price.map_or(price, |p| p.amount()),
            category: entry.category.clone(),
            image_url: entry.image_url.clone(),
            product_url: entry.product_url.clone(),
            quantity: 1,
            total_price: price,
        }
    }

    pub fn original_total(&self) -> Decimal {
        round_currency(self.original_price * Decimal::from(self.quantity))
    }

    /// Whole-percent discount against the original price, 0 when there is none.
    pub fn discount_percent(&self) -> u32 {
        if self.original_price <= self.price || self.original_price <= Decimal::ZERO {
            return 0;
        }
        let pct = (self.original_price - self.price) / self.original_price * Decimal::from(100);
        pct.round().to_u32().unwrap_or(0)
    }
}

/// Aggregated cart, lines in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    lines: Vec<CartLine>,
}

impl CartSummary {
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }

    pub fn get(&self, product_id: i32) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    pub fn grand_total(&self) -> Decimal {
        round_currency(self.lines.iter().map(|line| line.total_price).sum())
    }

    /// Number of units across all lines.
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Fold entries into one line per product id. Each entry is one unit: repeat
/// entries bump the quantity and add their own price to the line total.
pub fn aggregate<'a, I>(entries: I) -> CartSummary
where
    I: IntoIterator<Item = &'a CartEntry>,
{
    let mut lines: Vec<CartLine> = Vec::new();
    let mut positions: HashMap<i32, usize> = HashMap::new();

    for entry in entries {
        match positions.get(&entry.product_id) {
            Some(&idx) => {
                let line = &mut lines[idx];
                line.quantity += 1;
                line.total_price += entry.price.amount();
            }
            None => {
                positions.insert(entry.product_id, lines.len());
                lines.push(CartLine::seed(entry));
            }
        }
    }

    CartSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn entry(product_id: i32, price: Decimal) -> CartEntry {
        CartEntry {
            id: None,
            product_id,
            title: format!("Product {product_id}"),
            price: Price::new(price),
            original_price: None,
            category: Some("Icons".into()),
            image_url: None,
            product_url: None,
        }
    }

    #[test]
    fn repeated_products_collapse_into_one_line() {
        let entries = vec![entry(1, dec!(10.00)), entry(1, dec!(10.00)), entry(2, dec!(5.00))];
        let summary = aggregate(&entries);

        let a = summary.get(1).unwrap();
        assert_eq!((a.quantity, a.total_price), (2, dec!(20.00)));
        let b = summary.get(2).unwrap();
        assert_eq!((b.quantity, b.total_price), (1, dec!(5.00)));
        assert_eq!(summary.grand_total(), dec!(25.00));
        assert_eq!(summary.item_count(), 3);
    }

    #[test]
    fn lines_follow_first_occurrence() {
        let entries = vec![entry(3, dec!(1)), entry(1, dec!(2)), entry(3, dec!(1)), entry(2, dec!(4))];
        let ids: Vec<i32> = aggregate(&entries).lines().iter().map(|l| l.product_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let entries = vec![entry(2, dec!(3.5)), entry(7, dec!(9.99)), entry(2, dec!(3.5))];
        assert_eq!(aggregate(&entries), aggregate(&entries));
    }

    #[test]
    fn totals_equal_price_times_quantity() {
        let entries: Vec<CartEntry> = (0..7).map(|i| entry(i % 3, dec!(4.25))).collect();
        for line in aggregate(&entries).lines() {
            assert_eq!(line.total_price, line.price * Decimal::from(line.quantity));
        }
    }

    #[test]
    fn malformed_prices_count_as_zero() {
        let entries: Vec<CartEntry> = serde_json::from_str(
            r#"[{"productId": 4, "title": "Odd", "price": "n/a"},
                {"productId": 4, "title": "Odd", "price": null}]"#,
        )
        .unwrap();
        let summary = aggregate(&entries);
        let line = summary.get(4).unwrap();
        assert_eq!(line.quantity, 2);
        assert_eq!(line.total_price, Decimal::ZERO);
    }

    #[test]
    fn empty_cart_is_empty_summary() {
        let summary = aggregate(&Vec::<CartEntry>::new());
        assert!(summary.is_empty());
        assert_eq!(summary.grand_total(), Decimal::ZERO);
    }

    #[test]
    fn discount_is_zero_without_a_higher_original_price() {
        let mut e = entry(1, dec!(20));
        e.original_price = Some(Price::new(dec!(25)));
        let discounted = aggregate(std::slice::from_ref(&e));
        assert_eq!(discounted.lines()[0].discount_percent(), 20);

        e.original_price = Some(Price::new(dec!(15)));
        let inverted = aggregate(std::slice::from_ref(&e));
        assert_eq!(inverted.lines()[0].discount_percent(), 0);
    }
}

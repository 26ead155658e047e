//! Fixed-point currency helpers.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy, dec};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Largest amount a `NUMERIC(10, 2)` column holds.
pub const MAX_AMOUNT: Decimal = dec!(99999999.99);

/// A per-unit price as received from clients or stored rows.
///
/// Deserialization accepts JSON strings (`"10.00"`, `"$10"`) and numbers.
/// Anything that does not parse, `null` included, becomes zero so display
/// paths never fail on malformed data. Write paths validate the value separately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ToSchema)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl From<Decimal> for Price {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Price(from_json(&value)))
    }
}

/// Decimal from a loosely typed JSON value, zero when it cannot be read.
pub fn from_json(value: &Value) -> Decimal {
    match value {
        Value::String(s) => parse_lenient(s),
        Value::Number(n) => parse_lenient(&n.to_string()),
        _ => Decimal::ZERO,
    }
}

/// Parse a price string, tolerating surrounding whitespace and a leading `$`.
/// Returns zero when the input is not a number.
pub fn parse_lenient(raw: &str) -> Decimal {
    parse_strict(raw).unwrap_or(Decimal::ZERO)
}

/// Parse a price string, `None` when the input is not a number.
pub fn parse_strict(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed).trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Round to cents.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// The amount can be stored in a money column.
pub fn fits_column(amount: Decimal) -> bool {
    amount <= MAX_AMOUNT
}

/// `$1234.50` style rendering used by receipts.
pub fn format_usd(amount: Decimal) -> String {
    let mut rounded = round_currency(amount);
    rounded.rescale(2);
    format!("${rounded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    #[test]
    fn lenient_parse_accepts_dollar_prefix() {
        assert_eq!(parse_lenient(" $12.50 "), dec!(12.50));
    }

    #[test]
    fn lenient_parse_defaults_to_zero() {
        assert_eq!(parse_lenient("twelve"), Decimal::ZERO);
        assert_eq!(parse_lenient(""), Decimal::ZERO);
    }

    #[test]
    fn price_deserializes_from_string_number_and_garbage() {
        let prices: Vec<Price> =
            serde_json::from_str(r#"["10.00", 5, 2.5, null, "abc", {"x": 1}]"#).unwrap();
        let amounts: Vec<Decimal> = prices.iter().map(Price::amount).collect();
        assert_eq!(
            amounts,
            vec![dec!(10.00), dec!(5), dec!(2.5), dec!(0), dec!(0), dec!(0)]
        );
    }

    #[test]
    fn price_serializes_as_string() {
        let json = serde_json::to_string(&Price::new(dec!(10.00))).unwrap();
        assert_eq!(json, "\"10.00\"");
    }

    #[test]
    fn column_bound_is_inclusive() {
        assert!(fits_column(dec!(99999999.99)));
        assert!(!fits_column(dec!(100000000)));
    }

    #[test]
    fn format_usd_pads_cents() {
        assert_eq!(format_usd(dec!(25)), "$25.00");
        assert_eq!(format_usd(dec!(19.995)), "$20.00");
    }
}

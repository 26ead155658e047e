//! Catalog filter/sort/pagination inputs, resolved from raw query strings
//! before any query is built.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// Fixed price bands offered next to category names in the store filter list.
/// Bounds are inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum PriceBand {
    Under10,
    From10To50,
    From50To100,
    Over100,
}

impl PriceBand {
    pub const ALL: [PriceBand; 4] = [
        PriceBand::Under10,
        PriceBand::From10To50,
        PriceBand::From50To100,
        PriceBand::Over100,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PriceBand::Under10 => "Under $10",
            PriceBand::From10To50 => "$10 - $50",
            PriceBand::From50To100 => "$50 - $100",
            PriceBand::Over100 => "Over $100",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|band| band.label() == label)
    }

    /// `(min, max)` bounds, `None` meaning unbounded.
    pub fn bounds(&self) -> (Option<Decimal>, Option<Decimal>) {
        match self {
            PriceBand::Under10 => (None, Some(Decimal::from(10))),
            PriceBand::From10To50 => (Some(Decimal::from(10)), Some(Decimal::from(50))),
            PriceBand::From50To100 => (Some(Decimal::from(50)), Some(Decimal::from(100))),
            PriceBand::Over100 => (Some(Decimal::from(100)), None),
        }
    }

    pub fn contains(&self, price: Decimal) -> bool {
        let (min, max) = self.bounds();
        min.is_none_or(|min| price >= min) && max.is_none_or(|max| price <= max)
    }
}

/// One entry of the store's filter list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CatalogFilter {
    Category(String),
    PriceRange(PriceBand),
}

impl CatalogFilter {
    /// Resolve a raw tag. Only the exact band labels are price filters;
    /// every other tag names a category.
    pub fn from_tag(tag: &str) -> Self {
        match PriceBand::from_label(tag) {
            Some(band) => CatalogFilter::PriceRange(band),
            None => CatalogFilter::Category(tag.to_string()),
        }
    }

    pub fn matches(&self, category: &str, price: Decimal) -> bool {
        match self {
            CatalogFilter::Category(name) => name == category,
            CatalogFilter::PriceRange(band) => band.contains(price),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CatalogSort {
    PriceLowHigh,
    PriceHighLow,
    #[default]
    Newest,
    /// No popularity signal is tracked; ordered like `Newest`.
    Popular,
}

impl CatalogSort {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "price_low_high" => Some(CatalogSort::PriceLowHigh),
            "price_high_low" => Some(CatalogSort::PriceHighLow),
            "newest" => Some(CatalogSort::Newest),
            "popular" => Some(CatalogSort::Popular),
            _ => None,
        }
    }
}

/// Raw catalog query string. Every field is kept as text so malformed
/// numbers fall back to defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CatalogParams {
    /// Page size, default 10, at most 100
    pub limit: Option<String>,
    /// 1-based page number, default 1
    pub page: Option<String>,
    /// Case-insensitive substring matched against title, description and category
    pub search: Option<String>,
    /// Comma-separated category names and price band labels
    pub categories: Option<String>,
    /// price_low_high, price_high_low, newest or popular
    pub sort: Option<String>,
}

/// A validated catalog request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub limit: u64,
    pub page: u64,
    pub search: Option<String>,
    pub filters: Vec<CatalogFilter>,
    pub sort: CatalogSort,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page: 1,
            search: None,
            filters: Vec::new(),
            sort: CatalogSort::default(),
        }
    }
}

impl CatalogQuery {
    pub fn from_params(params: &CatalogParams) -> Self {
        let limit = params
            .limit
            .as_deref()
            .and_then(parse_positive)
            .map_or(DEFAULT_LIMIT, |limit| limit.min(MAX_LIMIT));
        // Keep the offset within a BIGINT.
        let max_page = i64::MAX as u64 / limit;
        let page = params
            .page
            .as_deref()
            .and_then(parse_positive)
            .unwrap_or(1)
            .min(max_page);

        let search = params
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let mut filters: Vec<CatalogFilter> = Vec::new();
        for tag in params
            .categories
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
        {
            let filter = CatalogFilter::from_tag(tag);
            if !filters.contains(&filter) {
                filters.push(filter);
            }
        }

        let sort = params
            .sort
            .as_deref()
            .and_then(CatalogSort::parse)
            .unwrap_or_default();

        Self {
            limit,
            page,
            search,
            filters,
            sort,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// In-memory equivalent of the SQL predicate: search AND any filter.
    pub fn matches(&self, title: &str, description: &str, category: &str, price: Decimal) -> bool {
        let search_ok = self.search.as_deref().is_none_or(|term| {
            let term = term.to_lowercase();
            [title, description, category]
                .iter()
                .any(|field| field.to_lowercase().contains(&term))
        });
        let filters_ok = self.filters.is_empty()
            || self.filters.iter().any(|f| f.matches(category, price));
        search_ok && filters_ok
    }
}

fn parse_positive(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

/// Escape LIKE wildcards so the search term matches literally.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn params(categories: &str) -> CatalogParams {
        CatalogParams {
            categories: Some(categories.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn tags_resolve_to_bands_only_on_exact_label() {
        assert_eq!(
            CatalogFilter::from_tag("$10 - $50"),
            CatalogFilter::PriceRange(PriceBand::From10To50)
        );
        assert_eq!(
            CatalogFilter::from_tag("Price $5 bundles"),
            CatalogFilter::Category("Price $5 bundles".into())
        );
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let query = CatalogQuery::from_params(&CatalogParams {
            limit: Some("ten".into()),
            page: Some("-3".into()),
            ..Default::default()
        });
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert_eq!(query.page, 1);
        assert_eq!(query.offset(), 0);
    }

    #[test]
    fn limit_is_capped() {
        let query = CatalogQuery::from_params(&CatalogParams {
            limit: Some("5000".into()),
            page: Some("2".into()),
            ..Default::default()
        });
        assert_eq!(query.limit, MAX_LIMIT);
        assert_eq!(query.offset(), MAX_LIMIT);
    }

    #[test]
    fn huge_page_keeps_offset_in_bigint_range() {
        let query = CatalogQuery::from_params(&CatalogParams {
            limit: Some("10".into()),
            page: Some("9223372036854775807".into()),
            ..Default::default()
        });
        assert!(query.offset() <= i64::MAX as u64);
        assert!(i64::try_from(query.page).is_ok());
        assert_eq!(query.offset(), (i64::MAX as u64 / 10 - 1) * 10);
    }

    #[test]
    fn unknown_sort_is_newest() {
        let query = CatalogQuery::from_params(&CatalogParams {
            sort: Some("random".into()),
            ..Default::default()
        });
        assert_eq!(query.sort, CatalogSort::Newest);
    }

    #[test]
    fn category_and_band_filters_are_or_combined() {
        let icons = CatalogQuery::from_params(&params("Icons"));
        let band = CatalogQuery::from_params(&params("$10 - $50"));
        let fonts = CatalogQuery::from_params(&params("Fonts"));

        assert!(icons.matches("Set", "", "Icons", dec!(15)));
        assert!(band.matches("Set", "", "Icons", dec!(15)));
        assert!(!fonts.matches("Set", "", "Icons", dec!(15)));

        let either = CatalogQuery::from_params(&params("Fonts, Over $100"));
        assert!(either.matches("Big", "", "Icons", dec!(150)));
        assert!(!either.matches("Small", "", "Icons", dec!(15)));
    }

    #[test]
    fn search_is_and_combined_with_filters() {
        let query = CatalogQuery::from_params(&CatalogParams {
            search: Some("ui".into()),
            categories: Some("UI kits".into()),
            ..Default::default()
        });
        assert!(query.matches("Dashboard UI", "", "UI kits", dec!(20)));
        assert!(!query.matches("Dashboard UI", "", "Icons", dec!(20)));
        assert!(!query.matches("Landing page", "plain", "Templates", dec!(20)));
    }

    #[test]
    fn band_bounds_are_inclusive() {
        assert!(PriceBand::Under10.contains(dec!(10)));
        assert!(PriceBand::From10To50.contains(dec!(10)));
        assert!(PriceBand::Over100.contains(dec!(100)));
        assert!(!PriceBand::From50To100.contains(dec!(100.01)));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}

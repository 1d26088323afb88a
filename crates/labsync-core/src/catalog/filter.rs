use rust_decimal::Decimal;
use serde::Deserialize;

use super::variants::{slugify, ProductGroup};

/// Listing filter accepted by the catalog endpoints.
///
/// Every field is optional; an empty filter matches everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Category name or slug, compared case-insensitively.
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    #[serde(alias = "q")]
    pub query: Option<String>,
    #[serde(default)]
    pub in_stock_only: bool,
}

impl ProductFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.query.as_deref().is_none_or(|q| q.trim().is_empty())
            && !self.in_stock_only
    }

    /// Whether `group` passes every populated criterion.
    ///
    /// A price bound matches when any variant falls inside it.
    #[must_use]
    pub fn matches(&self, group: &ProductGroup) -> bool {
        if let Some(category) = self.category.as_deref() {
            if !(group.category.eq_ignore_ascii_case(category)
                || group.category_slug == slugify(category))
            {
                return false;
            }
        }

        if let Some(min) = self.min_price {
            if group.max_price < min {
                return false;
            }
        }

        if let Some(max) = self.max_price {
            if group.min_price > max {
                return false;
            }
        }

        if self.in_stock_only && !group.in_stock() {
            return false;
        }

        match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => group.searchable_text().contains(&q.to_lowercase()),
            _ => true,
        }
    }
}

/// Apply `filter` to `groups`, keeping input order.
#[must_use]
pub fn filter_groups<'a>(
    groups: &'a [ProductGroup],
    filter: &ProductFilter,
) -> Vec<&'a ProductGroup> {
    groups.iter().filter(|g| filter.matches(g)).collect()
}

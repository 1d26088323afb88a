//! Grouping of flat variant rows into canonical products.
//!
//! The spreadsheet stores one row per purchasable strength
//! (`"BPC-157 (5mg)"`, `"BPC-157 (10mg)"`). The storefront shows one product
//! per base name with a strength selector; this module derives that view.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::products::{ChemicalInfo, ProductRecord, WarehouseLocation};

/// Strength label used when no quantity can be parsed from a row.
pub const STANDARD_STRENGTH: &str = "standard";

static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)").expect("valid parenthetical regex"));
static UNIT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\d+(?:\.\d+)?\s*(?:mg|ml|iu)\b").expect("valid unit token regex")
});
static VIAL_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*×\s*\d+\s*vials?\b").expect("valid vial count regex"));
static STRENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(mg|ml|iu)\b").expect("valid strength regex")
});
static COMBO_STRENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?mg)\s*\+\s*\w+\s*(\d+(?:\.\d+)?mg)")
        .expect("valid combo strength regex")
});

/// Price multiplier and availability for one shipping origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarehouseOption {
    pub price_multiplier: Decimal,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarehouseOptions {
    pub overseas: WarehouseOption,
    /// Domestic stock is re-tested before shipment and priced at 1.25×.
    pub us: WarehouseOption,
}

impl From<WarehouseLocation> for WarehouseOptions {
    fn from(location: WarehouseLocation) -> Self {
        Self {
            overseas: WarehouseOption {
                price_multiplier: Decimal::ONE,
                available: location.ships_overseas(),
            },
            us: WarehouseOption {
                price_multiplier: Decimal::new(125, 2),
                available: location.ships_domestic(),
            },
        }
    }
}

/// A single purchasable strength inside a [`ProductGroup`].
#[derive(Debug, Clone, Serialize)]
pub struct ProductVariant {
    pub record_id: String,
    pub name: String,
    /// Normalised strength, e.g. `"10mg"`, or [`STANDARD_STRENGTH`].
    pub strength: String,
    pub price: Decimal,
    pub sku: String,
    pub in_stock: bool,
    pub specification: Option<String>,
}

/// One logical product: every row sharing a base name and category.
#[derive(Debug, Clone, Serialize)]
pub struct ProductGroup {
    pub base_name: String,
    pub slug: String,
    pub category: String,
    pub category_slug: String,
    pub short_description: String,
    pub description: String,
    pub image_url: Option<String>,
    pub chemical: ChemicalInfo,
    pub shelf_life: Option<String>,
    pub research_applications: Option<String>,
    pub storage_requirements: Option<String>,
    pub handling_guidelines: Option<String>,
    pub featured: bool,
    pub warehouse: WarehouseOptions,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub variants: Vec<ProductVariant>,
}

impl ProductGroup {
    /// `true` when the strength selector should be shown.
    #[must_use]
    pub fn has_variants(&self) -> bool {
        self.variants.len() > 1
            || self
                .variants
                .first()
                .is_some_and(|v| v.strength != STANDARD_STRENGTH)
    }

    /// `true` when at least one strength can be ordered.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.variants.iter().any(|v| v.in_stock)
    }

    /// Lowercased text that free-text queries are matched against.
    #[must_use]
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = vec![
            &self.base_name,
            &self.short_description,
            &self.description,
            &self.category,
        ];
        parts.extend(self.variants.iter().map(|v| v.name.as_str()));
        parts.extend(self.variants.iter().map(|v| v.sku.as_str()));
        parts.extend(self.chemical.synonyms.iter().map(String::as_str));
        parts.join(" ").to_lowercase()
    }

    fn from_first_row(base_name: String, row: &ProductRecord) -> Self {
        Self {
            slug: slugify(&base_name),
            base_name,
            category: row.category.clone(),
            category_slug: slugify(&row.category),
            short_description: row.short_description.clone(),
            description: row.description().to_string(),
            image_url: row.image_url.clone(),
            chemical: row.chemical.clone(),
            shelf_life: row.shelf_life.clone(),
            research_applications: row.research_applications.clone(),
            storage_requirements: row.storage_requirements.clone(),
            handling_guidelines: row.handling_guidelines.clone(),
            featured: row.featured,
            warehouse: row.warehouse.into(),
            min_price: row.price,
            max_price: row.price,
            variants: Vec::new(),
        }
    }
}

/// Strip strength and pack-size tokens from a product name.
///
/// `"BPC-157 (10mg × 10 vials)"` → `"BPC-157"`, `"TB-500 5mg"` → `"TB-500"`.
#[must_use]
pub fn base_name(name: &str) -> String {
    let without_parens = PARENTHETICAL.replace_all(name, "");
    let without_units = UNIT_TOKEN.replace_all(&without_parens, "");
    let without_vials = VIAL_COUNT.replace_all(&without_units, "");
    without_vials.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive a normalised strength label for a row.
///
/// Order: the strength column (unless blank or `N/A`), the specification,
/// then the name (`"5mg + TB 5mg"` combos before single values).
#[must_use]
pub fn extract_strength(row: &ProductRecord) -> String {
    let column = row.variant_strength.trim();
    if !column.is_empty() && !column.eq_ignore_ascii_case("n/a") {
        return column.to_string();
    }

    if let Some(strength) = row.specification.as_deref().and_then(single_strength) {
        return strength;
    }

    if let Some(caps) = COMBO_STRENGTH.captures(&row.name) {
        return format!("{} + {}", caps[1].to_lowercase(), caps[2].to_lowercase());
    }

    single_strength(&row.name).unwrap_or_else(|| STANDARD_STRENGTH.to_string())
}

fn single_strength(text: &str) -> Option<String> {
    STRENGTH
        .captures(text)
        .map(|caps| format!("{}{}", &caps[1], caps[2].to_lowercase()))
}

/// Leading numeric quantity of a strength label, used for ordering.
fn strength_value(strength: &str) -> Option<f64> {
    let digits: String = strength
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok()
}

/// Generate a URL-safe slug: lowercase ASCII alphanumerics joined by dashes.
#[must_use]
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Claim `slug`, else `slug-category`, else `slug-category-2`, `-3`, ...
fn unique_slug(used: &mut HashSet<String>, slug: &str, category_slug: &str) -> String {
    if used.insert(slug.to_string()) {
        return slug.to_string();
    }
    let suffixed = format!("{slug}-{category_slug}");
    if used.insert(suffixed.clone()) {
        return suffixed;
    }
    let mut n = 2_u32;
    loop {
        let candidate = format!("{suffixed}-{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Group flat rows into one [`ProductGroup`] per `(base name, category)`.
///
/// Groups keep first-seen order. Variants are ordered by numeric strength,
/// with unparseable strengths after numbered ones in input order. Rows whose
/// base name produces an empty slug are skipped.
#[must_use]
pub fn group_variants(rows: &[ProductRecord]) -> Vec<ProductGroup> {
    let mut groups: Vec<ProductGroup> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut used_slugs: HashSet<String> = HashSet::new();

    for row in rows {
        let base = base_name(&row.name);
        if slugify(&base).is_empty() {
            continue;
        }

        let key = (base.clone(), row.category.clone());
        let position = if let Some(&position) = index.get(&key) {
            position
        } else {
            let mut group = ProductGroup::from_first_row(base, row);
            group.slug = unique_slug(&mut used_slugs, &group.slug, &group.category_slug);
            groups.push(group);
            index.insert(key, groups.len() - 1);
            groups.len() - 1
        };

        let group = &mut groups[position];
        group.min_price = group.min_price.min(row.price);
        group.max_price = group.max_price.max(row.price);
        group.featured |= row.featured;
        group.variants.push(ProductVariant {
            record_id: row.record_id.clone(),
            name: row.name.clone(),
            strength: extract_strength(row),
            price: row.price,
            sku: row.sku.clone(),
            in_stock: row.in_stock,
            specification: row.specification.clone(),
        });
    }

    for group in &mut groups {
        group.variants.sort_by(|a, b| {
            match (strength_value(&a.strength), strength_value(&b.strength)) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
    }

    groups
}

#[cfg(test)]
#[path = "variants_test.rs"]
mod tests;

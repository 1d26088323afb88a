use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Visibility status a row must carry to appear in catalog listings.
pub const LIVE_VISIBILITY: &str = "LIVE";

/// Which warehouse(s) can ship a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseLocation {
    Overseas,
    Us,
    Both,
}

impl WarehouseLocation {
    /// Parse the spreadsheet's free-text warehouse column.
    ///
    /// `"Overseas Warehouse"` and `"US Warehouse"` map to a single warehouse;
    /// anything else (including blank) means both.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Overseas Warehouse" | "Overseas" => Self::Overseas,
            "US Warehouse" | "US" => Self::Us,
            _ => Self::Both,
        }
    }

    #[must_use]
    pub fn ships_overseas(self) -> bool {
        matches!(self, Self::Overseas | Self::Both)
    }

    #[must_use]
    pub fn ships_domestic(self) -> bool {
        matches!(self, Self::Us | Self::Both)
    }
}

/// Optional chemical identity data carried by a product row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChemicalInfo {
    pub formula: Option<String>,
    pub molar_mass: Option<String>,
    pub cas_number: Option<String>,
    pub synonyms: Vec<String>,
    pub pubchem_id: Option<String>,
}

/// One flat row of the product table: a single purchasable strength of a
/// product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Spreadsheet record id, e.g. `"recA1b2C3d4"`.
    pub record_id: String,
    pub product_id: String,
    /// Display name including strength, e.g. `"BPC-157 (10mg × 10 vials)"`.
    pub name: String,
    pub slug: String,
    /// Strength column as entered, e.g. `"10mg"`. May be blank or `"N/A"`.
    pub variant_strength: String,
    pub category: String,
    pub price: Decimal,
    pub in_stock: bool,
    pub warehouse: WarehouseLocation,
    pub sku: String,
    pub short_description: String,
    pub full_description: String,
    pub chemical: ChemicalInfo,
    pub image_url: Option<String>,
    pub certificate_url: Option<String>,
    pub featured: bool,
    pub popularity_score: i64,
    pub stock_quantity: i64,
    pub unit_size: String,
    pub specification: Option<String>,
    pub shelf_life: Option<String>,
    pub research_applications: Option<String>,
    pub storage_requirements: Option<String>,
    pub handling_guidelines: Option<String>,
    pub discontinued: bool,
    pub visibility: String,
}

impl ProductRecord {
    /// `true` when the row should be shown in public listings.
    #[must_use]
    pub fn is_listed(&self) -> bool {
        self.visibility.eq_ignore_ascii_case(LIVE_VISIBILITY) && !self.discontinued
    }

    /// Full description, falling back to the short one when blank.
    #[must_use]
    pub fn description(&self) -> &str {
        if self.full_description.trim().is_empty() {
            &self.short_description
        } else {
            &self.full_description
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A listed, in-stock row with the given name, category and price.
    pub(crate) fn record(name: &str, category: &str, price: Decimal) -> ProductRecord {
        ProductRecord {
            record_id: format!("rec{}", name.len()),
            product_id: "1".to_string(),
            name: name.to_string(),
            slug: String::new(),
            variant_strength: String::new(),
            category: category.to_string(),
            price,
            in_stock: true,
            warehouse: WarehouseLocation::Both,
            sku: String::new(),
            short_description: format!("{name} for laboratory research"),
            full_description: String::new(),
            chemical: ChemicalInfo::default(),
            image_url: None,
            certificate_url: None,
            featured: false,
            popularity_score: 0,
            stock_quantity: 10,
            unit_size: "1 Vial".to_string(),
            specification: None,
            shelf_life: None,
            research_applications: None,
            storage_requirements: None,
            handling_guidelines: None,
            discontinued: false,
            visibility: LIVE_VISIBILITY.to_string(),
        }
    }
}

//! Conversion of raw Airtable records into [`ProductRecord`]s.
//!
//! The product table is hand-maintained, so every field is optional and
//! loosely typed: numbers may arrive as strings, synonyms as either a list or
//! a comma-separated string, images as attachment objects.

use labsync_core::{slugify, ChemicalInfo, ProductRecord, WarehouseLocation, LIVE_VISIBILITY};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::types::RawRecord;

const DEFAULT_UNIT_SIZE: &str = "1 Vial";

/// Map one record. Missing fields fall back to empty/zero defaults.
#[must_use]
pub fn map_record(raw: &RawRecord) -> ProductRecord {
    let f = &raw.fields;
    let name = text(f, "Product_Name").unwrap_or_default();
    let slug = text(f, "Product_Slug").unwrap_or_else(|| slug_from_name(&name));

    ProductRecord {
        record_id: raw.id.clone(),
        product_id: id_text(f.get("Product_ID")),
        slug,
        variant_strength: text(f, "Variant_Strength").unwrap_or_default(),
        category: text(f, "Category").unwrap_or_default(),
        price: decimal(f.get("Price_USD")),
        in_stock: flag(f, "In_Stock"),
        warehouse: WarehouseLocation::from_label(
            &text(f, "Warehouse_Location").unwrap_or_default(),
        ),
        sku: text(f, "SKU_Code").unwrap_or_default(),
        short_description: text(f, "Short_Description").unwrap_or_default(),
        full_description: text(f, "Full_Description").unwrap_or_default(),
        chemical: ChemicalInfo {
            formula: text(f, "Molecular_Formula"),
            molar_mass: text(f, "Molar_Mass"),
            cas_number: text(f, "CAS_Number"),
            synonyms: synonyms(f.get("Synonyms")),
            pubchem_id: text(f, "PubChem_ID"),
        },
        image_url: image_url(f.get("Image_URL")),
        certificate_url: text(f, "Certificate_of_Analysis_URL"),
        featured: flag(f, "Featured"),
        popularity_score: integer(f.get("Popularity_Score")),
        stock_quantity: integer(f.get("Stock_Quantity")),
        unit_size: text(f, "Unit_Size").unwrap_or_else(|| DEFAULT_UNIT_SIZE.to_string()),
        specification: text(f, "Specification"),
        shelf_life: text(f, "Shelf_Life"),
        research_applications: text(f, "Research_Applications"),
        storage_requirements: text(f, "Storage_Requirements"),
        handling_guidelines: text(f, "Handling_Guidelines"),
        discontinued: flag(f, "Is_Discontinued"),
        visibility: text(f, "API_Visibility_Status")
            .unwrap_or_else(|| LIVE_VISIBILITY.to_string()),
        name,
    }
}

/// Non-blank string field. Numbers are rendered as text.
fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn flag(fields: &Map<String, Value>, key: &str) -> bool {
    matches!(fields.get(key), Some(Value::Bool(true)))
}

fn id_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn decimal(value: Option<&Value>) -> Decimal {
    match value {
        Some(Value::Number(n)) => n.to_string().parse().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().trim_start_matches('$').parse().unwrap_or_default(),
        _ => Decimal::ZERO,
    }
}

fn integer(value: Option<&Value>) -> i64 {
    match value {
        #[allow(clippy::cast_possible_truncation)]
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn synonyms(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

/// First usable HTTPS URL from an attachment field.
///
/// Order: the attachment `url`, then `thumbnails.full.url`, then
/// `thumbnails.large.url`. Airtable page links (`airtable.com/app…/att…`)
/// are not images and are rejected.
fn image_url(value: Option<&Value>) -> Option<String> {
    let first = match value? {
        Value::Array(items) => items.first()?,
        other => other,
    };

    if let Value::String(s) = first {
        return (s.starts_with("https://") && !is_airtable_page_link(s)).then(|| s.clone());
    }

    [
        first.get("url"),
        first.pointer("/thumbnails/full/url"),
        first.pointer("/thumbnails/large/url"),
    ]
    .into_iter()
    .flatten()
    .filter_map(Value::as_str)
    .find(|url| url.starts_with("https://"))
    .map(ToOwned::to_owned)
}

fn is_airtable_page_link(url: &str) -> bool {
    url.contains("airtable.com/app") && url.contains("/att")
}

fn slug_from_name(name: &str) -> String {
    slugify(name.split('(').next().unwrap_or_default())
}

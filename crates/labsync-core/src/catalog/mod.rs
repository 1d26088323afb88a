mod filter;
mod variants;

pub use filter::{filter_groups, ProductFilter};
pub use variants::{
    base_name, extract_strength, group_variants, slugify, ProductGroup, ProductVariant,
    WarehouseOption, WarehouseOptions, STANDARD_STRENGTH,
};

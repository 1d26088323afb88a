pub mod app_config;
pub mod articles;
pub mod catalog;
pub mod config;
pub mod error;
pub mod products;
pub mod search;

pub use app_config::{AppConfig, Environment, DEFAULT_REVALIDATE_CATEGORIES};
pub use articles::{
    generate_all, generate_article, load_articles, Article, ArticleSections, GeneratedArticle,
};
pub use catalog::{
    base_name, extract_strength, filter_groups, group_variants, slugify, ProductFilter,
    ProductGroup, ProductVariant, WarehouseOption, WarehouseOptions,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::ConfigError;
pub use products::{ChemicalInfo, ProductRecord, WarehouseLocation, LIVE_VISIBILITY};
pub use search::{search, SearchHit, SearchResults};

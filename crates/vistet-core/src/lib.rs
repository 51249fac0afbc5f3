pub mod app_config;
pub mod clothing;
pub mod config;
pub mod origin;
pub mod scraped;
pub mod validate;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use clothing::{map_vendor_type, ClothingType, VENDOR_TYPE_TABLE};
pub use config::{load_app_config, load_app_config_from_env};
pub use origin::extract_store_origin;
pub use scraped::{
    available_sizes, minor_to_major, price_range, PriceRange, ScrapedProduct, ScrapedVariant,
};
pub use validate::FieldErrors;

/// Store that owns every clothe created through ingestion.
pub const DEFAULT_SCRAPED_STORE_NAME: &str = "Rehabclo";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid clothing type: {0}")]
    InvalidClothingType(String),
}

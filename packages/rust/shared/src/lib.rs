//! Shared types, error model, and configuration for aptsheet.
//!
//! This crate is the foundation depended on by all other aptsheet crates.
//! It provides:
//! - [`AptSheetError`]: the unified error type
//! - Listing input types ([`ListingInput`], [`FloorplanInput`], [`PriceSelector`])
//! - Configuration ([`AppConfig`], [`RunConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ColumnsConfig, ExportConfig, InputConfig, NumericPolicy, OptionValue,
    OutputConfig, OutputFormat, RunConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{AptSheetError, Result};
pub use types::{FloorplanInput, ListingInput, PriceSelector, load_listings};

//! Application configuration for aptsheet.
//!
//! User config lives at `~/.aptsheet/aptsheet.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AptSheetError, Result};
use crate::types::PriceSelector;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "aptsheet.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".aptsheet";

// ---------------------------------------------------------------------------
// Config structs (matching aptsheet.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Output file settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Column schema options.
    #[serde(default)]
    pub columns: ColumnsConfig,

    /// Listing input handling.
    #[serde(default)]
    pub input: InputConfig,

    /// Row export policy.
    #[serde(default)]
    pub export: ExportConfig,
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output file name without extension.
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Output format: "csv" or "tsv".
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            format: default_format(),
        }
    }
}

fn default_file_name() -> String {
    "apartments".into()
}
fn default_format() -> String {
    "csv".into()
}

/// `[columns]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsConfig {
    /// Expand utilities into one Yes/No column per utility.
    #[serde(default)]
    pub separate_utilities: bool,

    /// Expand pets into one Yes/No column per pet kind.
    #[serde(default)]
    pub separate_pets: bool,

    /// Which end of a rent range goes into the price column.
    #[serde(default = "default_price_selector")]
    pub price_selector: String,

    /// Extra boolean options referenced by column activation predicates.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flags: BTreeMap<String, bool>,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            separate_utilities: false,
            separate_pets: false,
            price_selector: default_price_selector(),
            flags: BTreeMap::new(),
        }
    }
}

fn default_price_selector() -> String {
    "average".into()
}

/// `[input]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Skip listings whose URL was already exported in this run.
    #[serde(default = "default_true")]
    pub ignore_duplicates: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            ignore_duplicates: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// `[export]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// What to do with a numeric column that does not parse:
    /// "skip-row" or "default-zero".
    #[serde(default = "default_numeric_policy")]
    pub numeric_policy: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            numeric_policy: default_numeric_policy(),
        }
    }
}

fn default_numeric_policy() -> String {
    "skip-row".into()
}

// ---------------------------------------------------------------------------
// Resolved enums
// ---------------------------------------------------------------------------

/// Handling of numeric columns whose stored text does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericPolicy {
    /// Fail the row; the caller logs it and moves on.
    #[default]
    SkipRow,
    /// Write zero and log a warning.
    DefaultZero,
}

impl FromStr for NumericPolicy {
    type Err = AptSheetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "skip-row" => Ok(Self::SkipRow),
            "default-zero" => Ok(Self::DefaultZero),
            other => Err(AptSheetError::config(format!(
                "unknown numeric policy '{other}': expected 'skip-row' or 'default-zero'"
            ))),
        }
    }
}

/// Delimited output flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Tsv,
}

impl OutputFormat {
    /// Field separator for this format.
    pub fn delimiter(self) -> char {
        match self {
            Self::Csv => ',',
            Self::Tsv => '\t',
        }
    }

    /// File extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = AptSheetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            other => Err(AptSheetError::config(format!(
                "unknown output format '{other}': expected 'csv' or 'tsv'"
            ))),
        }
    }
}

/// A configuration value a column activation predicate can test against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Text(String),
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Run config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Resolved, validated configuration for one export run.
///
/// Built once at startup; an invalid enum value in the file fails here,
/// before any output is opened.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Rent-range resolution used when ingesting floorplans.
    pub price_selector: PriceSelector,
    /// Numeric coercion failure handling.
    pub numeric_policy: NumericPolicy,
    /// Output flavour.
    pub output_format: OutputFormat,
    /// Skip repeated listing URLs.
    pub ignore_duplicates: bool,
    options: BTreeMap<String, OptionValue>,
}

impl RunConfig {
    /// Look up a named option for predicate evaluation.
    pub fn option(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    /// Whether a boolean option is set and true.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.options.get(name), Some(OptionValue::Bool(true)))
    }

    /// All resolved options, in name order.
    pub fn options(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::try_from(&AppConfig::default()).expect("default config resolves")
    }
}

impl TryFrom<&AppConfig> for RunConfig {
    type Error = AptSheetError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let price_selector: PriceSelector = config.columns.price_selector.parse()?;
        let numeric_policy: NumericPolicy = config.export.numeric_policy.parse()?;
        let output_format: OutputFormat = config.output.format.parse()?;

        let mut options: BTreeMap<String, OptionValue> = config
            .columns
            .flags
            .iter()
            .map(|(k, v)| (k.clone(), OptionValue::Bool(*v)))
            .collect();
        options.insert(
            "separate_utilities".into(),
            config.columns.separate_utilities.into(),
        );
        options.insert("separate_pets".into(), config.columns.separate_pets.into());
        options.insert(
            "price_selector".into(),
            OptionValue::Text(price_selector.to_string()),
        );

        Ok(Self {
            price_selector,
            numeric_policy,
            output_format,
            ignore_duplicates: config.input.ignore_duplicates,
            options,
        })
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.aptsheet/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AptSheetError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.aptsheet/aptsheet.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AptSheetError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| AptSheetError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AptSheetError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AptSheetError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AptSheetError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

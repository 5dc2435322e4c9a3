//! Listing input types handed over by the scraper.
//!
//! A listings file is a JSON array of [`ListingInput`]. Every text field is
//! the raw text found on the page; normalisation happens during ingestion.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AptSheetError, Result};

// ---------------------------------------------------------------------------
// PriceSelector
// ---------------------------------------------------------------------------

/// Which value of a rent range (`$1,200 - 1,400`) ends up in the price column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSelector {
    Lowest,
    Highest,
    #[default]
    Average,
}

impl fmt::Display for PriceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Lowest => "lowest",
            Self::Highest => "highest",
            Self::Average => "average",
        };
        f.write_str(s)
    }
}

impl FromStr for PriceSelector {
    type Err = AptSheetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lowest" => Ok(Self::Lowest),
            "highest" => Ok(Self::Highest),
            "average" => Ok(Self::Average),
            other => Err(AptSheetError::config(format!(
                "unknown price selector '{other}': expected 'lowest', 'highest', or 'average'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// ListingInput
// ---------------------------------------------------------------------------

/// One apartment complex page as scraped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingInput {
    /// Complex name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Listing page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Commute distance, already computed by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<String>,
    /// Commute duration, already computed by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    /// Raw "included utilities" snippets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub utilities: Vec<String>,
    /// Parking section headings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parking: Vec<String>,
    /// Pet policy snippets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pets: Vec<String>,
    /// Monthly fee labels (amounts are ignored).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub monthly: Vec<String>,
    /// One-time fee labels (amounts are ignored).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fees: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recreation: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outdoors: Vec<String>,

    /// Floorplans offered by this complex; one output row each.
    #[serde(default)]
    pub floorplans: Vec<FloorplanInput>,
}

/// One row of a listing's availability table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FloorplanInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Rent text, e.g. `$1,200 - 1,400`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rent: Option<String>,
    /// Area text, e.g. `1,050 Sq Ft`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Bedroom text, e.g. `2 Beds` or `Studio`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beds: Option<String>,
    /// Bathroom text, e.g. `1½ Baths`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baths: Option<String>,
}

/// Read a JSON listings file.
pub fn load_listings(path: &Path) -> Result<Vec<ListingInput>> {
    let content = std::fs::read_to_string(path).map_err(|e| AptSheetError::io(path, e))?;

    serde_json::from_str(&content)
        .map_err(|e| AptSheetError::parse(format!("failed to parse {}: {e}", path.display())))
}

//! Scraped listing → record ingestion.
//!
//! The scraper hands over page text more or less verbatim. This crate cleans
//! it up, maps free-form amenity text onto the canonical tag names the
//! column vocabularies use, resolves rent ranges, and produces one
//! [`Record`](aptsheet_sheet::Record) per floorplan.

pub mod ingest;
pub mod normalize;
pub mod price;

pub use ingest::{ListingDeduper, records_from_listing};
pub use normalize::simplify;
pub use price::{normalize_area, normalize_count, select_price};

//! Listing → records.

use std::collections::HashSet;

use tracing::debug;
use url::Url;

use aptsheet_shared::{ListingInput, PriceSelector};
use aptsheet_sheet::Record;

use crate::normalize::{self, simplify};
use crate::price::{normalize_area, normalize_count, select_price};

/// Build one record per floorplan of a listing.
///
/// Listing-level fields are copied into every record. Floorplans with the
/// same name each produce their own record. Numeric text that cannot be
/// read is left unset; the exporter's numeric policy decides what happens.
pub fn records_from_listing(listing: &ListingInput, selector: PriceSelector) -> Vec<Record> {
    let name = listing.name.as_deref().map(simplify);

    let categories: [(&str, Vec<String>); 8] = [
        ("utilities", normalize::utilities(&listing.utilities)),
        ("parking", normalize::parking(&listing.parking)),
        ("pets", normalize::pets(&listing.pets)),
        ("monthly", normalize::monthly_fees(&listing.monthly)),
        ("fees", normalize::one_time_fees(&listing.fees)),
        ("recreation", normalize::passthrough(&listing.recreation)),
        ("features", normalize::passthrough(&listing.features)),
        ("outdoors", normalize::passthrough(&listing.outdoors)),
    ];

    let scalars = [
        ("neighborhood", listing.neighborhood.as_deref().map(simplify)),
        ("address", listing.address.as_deref().map(simplify)),
        ("distance", listing.distance.clone()),
        ("duration", listing.duration.clone()),
    ];

    if listing.floorplans.is_empty() {
        debug!(listing = name.as_deref().unwrap_or(""), "listing has no floorplans");
    }

    listing
        .floorplans
        .iter()
        .map(|floorplan| {
            let mut record = Record::new();
            if let Some(name) = &name {
                record.set_complex_name(name.as_str());
            }
            if let Some(url) = &listing.url {
                record.set_source_url(url.trim());
            }
            record.set_floorplan_name(floorplan.name.as_deref().map(simplify).unwrap_or_default());

            for (key, value) in &scalars {
                if let Some(value) = value {
                    record.set_scalar(*key, value.as_str());
                }
            }
            for (key, tags) in &categories {
                for tag in tags {
                    record.add_tag(*key, tag.as_str());
                }
            }

            let numeric = [
                ("price", floorplan.rent.as_deref().and_then(|t| select_price(t, selector))),
                ("size", floorplan.size.as_deref().and_then(normalize_area)),
                ("bed", floorplan.beds.as_deref().and_then(normalize_count)),
                ("bath", floorplan.baths.as_deref().and_then(normalize_count)),
            ];
            for (key, value) in numeric {
                match value {
                    Some(value) => record.set_scalar(key, value),
                    None => {
                        debug!(record = %record.label(), field = key, "no numeric value found");
                    }
                }
            }

            record
        })
        .collect()
}

/// Remembers listing URLs so a listing reached from two search pages is
/// exported once.
#[derive(Debug, Default)]
pub struct ListingDeduper {
    seen: HashSet<String>,
}

impl ListingDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` the first time a URL is offered. Listings without a URL always pass.
    pub fn admit(&mut self, listing: &ListingInput) -> bool {
        match &listing.url {
            Some(url) => self.seen.insert(normalize_url(url)),
            None => true,
        }
    }
}

/// Comparable form of a listing URL: no fragment, no trailing slash.
fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => raw.trim_end_matches('/').to_string(),
    }
}

//! Text cleanup and tag canonicalisation.
//!
//! Each category has its own mapping from page wording to a canonical tag.
//! Anything that matches no rule is kept as cleaned-up text; it is not in the
//! vocabulary and so shows up as `Other` at export time.

use std::sync::LazyLock;

use regex::Regex;

/// Strip non-ASCII symbols and line breaks, collapse runs of spaces, trim.
pub fn simplify(text: &str) -> String {
    static SPACES_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r" {2,}").expect("valid regex"));

    let ascii: String = text
        .chars()
        .filter(|c| c.is_ascii() && !matches!(c, '\r' | '\n' | '\t'))
        .collect();

    SPACES_RE.replace_all(&ascii, " ").trim().to_string()
}

/// Included-utilities snippets, e.g. `"Water, Trash Removal, Sewer"`.
///
/// Snippets that are only the "Utilities Included" caption are skipped.
pub fn utilities(snippets: &[String]) -> Vec<String> {
    let mut tags = Vec::new();
    for snippet in snippets {
        let text = simplify(snippet);
        if text.contains("Included") {
            continue;
        }
        for part in text.split(", ") {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let tag = if part.contains("Trash") {
                "Trash".to_string()
            } else if part.contains("Electric") {
                "Electric".to_string()
            } else if part.contains("Sewer") {
                "Sewage".to_string()
            } else {
                part.to_string()
            };
            tags.push(tag);
        }
    }
    tags
}

/// Parking section headings, e.g. `"Surface Lot"`.
pub fn parking(headings: &[String]) -> Vec<String> {
    non_empty(headings)
        .map(|text| {
            if text.contains("Covered") {
                "Covered".to_string()
            } else if text.contains("Surface") || text.contains("Lot") {
                "Lot".to_string()
            } else if text.contains("Garage") {
                "Garage".to_string()
            } else {
                text
            }
        })
        .collect()
}

/// Pet policy snippets; one snippet may allow both dogs and cats.
pub fn pets(snippets: &[String]) -> Vec<String> {
    let mut tags = Vec::new();
    for text in non_empty(snippets) {
        if text.contains("Dogs") {
            tags.push("Dogs".to_string());
        }
        if text.contains("Cats") {
            tags.push("Cats".to_string());
        }
    }
    tags
}

/// Monthly fee labels. Amount cells (containing `$`) are ignored.
pub fn monthly_fees(labels: &[String]) -> Vec<String> {
    non_empty(labels)
        .filter(|text| !text.contains('$'))
        .map(|text| {
            if text.contains("Storage") {
                "Storage Fee".to_string()
            } else if text.contains("Cat") {
                "Cat Rent".to_string()
            } else if text.contains("Dog") {
                "Dog Rent".to_string()
            } else if text.contains("Parking") {
                "Parking".to_string()
            } else {
                text
            }
        })
        .collect()
}

/// One-time fee labels. Amount cells (containing `$`) are ignored.
pub fn one_time_fees(labels: &[String]) -> Vec<String> {
    non_empty(labels)
        .filter(|text| !text.contains('$'))
        .map(|text| {
            if text.contains("Application") {
                "Application Fee".to_string()
            } else if text.contains("Admin") {
                "Admin Fee".to_string()
            } else if text.contains("Cat") {
                "Cat Fee".to_string()
            } else if text.contains("Dog") {
                "Dog Fee".to_string()
            } else {
                text
            }
        })
        .collect()
}

/// Categories without rewrite rules: cleaned text only.
pub fn passthrough(items: &[String]) -> Vec<String> {
    non_empty(items).collect()
}

fn non_empty(items: &[String]) -> impl Iterator<Item = String> + '_ {
    items.iter().map(|s| simplify(s)).filter(|s| !s.is_empty())
}

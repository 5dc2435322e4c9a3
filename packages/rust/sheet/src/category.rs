//! Category tag sets and their two spreadsheet projections.
//!
//! A category field (utilities, parking, ...) holds a set of tags. It is
//! shown either collapsed into one combined cell ([`collapse`]) or spread
//! over one Yes/No cell per vocabulary entry ([`tag_flags`]). Both are pure
//! functions of `(vocabulary, tags)` and are kept independent: the combined
//! form stops at the first out-of-vocabulary tag, the per-tag form checks
//! every one of them for its single `Other` flag.

use std::collections::BTreeMap;

/// Bucket for tags outside the vocabulary.
pub const OTHER: &str = "Other";

/// Separator between tags in a combined cell.
pub const SEPARATOR: &str = " / ";

/// Ordered set of distinct tags; keeps first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: Vec<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag. Returns `false` if it was already present.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Canonical vocabularies keyed by category field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabularies {
    fields: BTreeMap<String, Vec<String>>,
}

impl Vocabularies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the vocabulary for a field.
    pub fn insert<I, T>(&mut self, field: impl Into<String>, tags: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.fields
            .insert(field.into(), tags.into_iter().map(Into::into).collect());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Render a tag set as one combined cell.
///
/// Vocabulary tags come first, in vocabulary order. A second scan over the
/// tags appends [`OTHER`] once, on the first tag not already listed.
pub fn collapse(vocabulary: &[String], tags: &[String]) -> String {
    let mut items: Vec<&str> = vocabulary
        .iter()
        .filter(|v| tags.contains(v))
        .map(String::as_str)
        .collect();

    for tag in tags {
        if !items.contains(&tag.as_str()) {
            items.push(OTHER);
            break;
        }
    }

    items.join(SEPARATOR)
}

/// Whether `tag` is present in the set.
pub fn has_tag(tags: &[String], tag: &str) -> bool {
    tags.iter().any(|t| t == tag)
}

/// Whether any tag falls outside the vocabulary.
pub fn has_unlisted(vocabulary: &[String], tags: &[String]) -> bool {
    tags.iter().any(|t| !vocabulary.contains(t))
}

/// Presence flag for every vocabulary tag, followed by the [`OTHER`] flag.
pub fn tag_flags<'a>(vocabulary: &'a [String], tags: &[String]) -> Vec<(&'a str, bool)> {
    vocabulary
        .iter()
        .map(|v| (v.as_str(), has_tag(tags, v)))
        .chain(std::iter::once((OTHER, has_unlisted(vocabulary, tags))))
        .collect()
}

/// Display text for a presence flag.
pub fn yes_no(present: bool) -> &'static str {
    if present { "Yes" } else { "No" }
}

//! One output row: a single floorplan of a single listing.

use std::collections::HashMap;

use crate::category::{self, TagSet, Vocabularies};

/// Prefix of a rendered identity cell that carries a link.
pub const LINK_MARKER: &str = "=HYPERLINK(";

/// Accumulated data for one spreadsheet row.
///
/// Scalars are last-write-wins; category tags are an ordered set. Nothing is
/// validated on the way in: numeric scalars are coerced and tags are checked
/// against the vocabulary only when the row is exported.
#[derive(Debug, Clone, Default)]
pub struct Record {
    complex_name: Option<String>,
    floorplan_name: Option<String>,
    source_url: Option<String>,
    scalars: HashMap<String, String>,
    categories: HashMap<String, TagSet>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_complex_name(&mut self, name: impl Into<String>) {
        self.complex_name = Some(name.into());
    }

    pub fn set_floorplan_name(&mut self, name: impl Into<String>) {
        self.floorplan_name = Some(name.into());
    }

    pub fn set_source_url(&mut self, url: impl Into<String>) {
        self.source_url = Some(url.into());
    }

    pub fn complex_name(&self) -> Option<&str> {
        self.complex_name.as_deref()
    }

    pub fn floorplan_name(&self) -> Option<&str> {
        self.floorplan_name.as_deref()
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// Store a scalar, replacing any previous value.
    pub fn set_scalar(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.scalars.insert(key.into(), value.into());
    }

    /// Stored scalar, or `""` when unset.
    pub fn scalar(&self, key: &str) -> &str {
        self.scalars.get(key).map(String::as_str).unwrap_or("")
    }

    /// Add a tag to a category field; duplicates are ignored.
    pub fn add_tag(&mut self, key: impl Into<String>, tag: impl Into<String>) {
        self.categories.entry(key.into()).or_default().insert(tag);
    }

    /// Tags recorded for a field, in insertion order.
    pub fn tags(&self, key: &str) -> &[String] {
        self.categories
            .get(key)
            .map(TagSet::as_slice)
            .unwrap_or(&[])
    }

    /// Combined display text for a category field.
    ///
    /// A field without a vocabulary renders empty whatever its tags.
    pub fn render_category(&self, key: &str, vocabularies: &Vocabularies) -> String {
        match vocabularies.get(key) {
            Some(vocabulary) => category::collapse(vocabulary, self.tags(key)),
            None => String::new(),
        }
    }

    /// `<complex> '<floorplan>'`, with missing parts left empty.
    pub fn label(&self) -> String {
        format!(
            "{} '{}'",
            self.complex_name.as_deref().unwrap_or(""),
            self.floorplan_name.as_deref().unwrap_or("")
        )
    }

    /// Display text for the name/link column.
    ///
    /// With a source URL the label is wrapped in a hyperlink formula.
    pub fn render_identity(&self) -> String {
        let text = self.label();
        match &self.source_url {
            Some(url) => format!(
                "{LINK_MARKER}\"{}\", \"{}\")",
                escape_formula_text(url),
                escape_formula_text(&text)
            ),
            None => text,
        }
    }
}

/// Double embedded quotes so they survive inside a formula string literal.
fn escape_formula_text(text: &str) -> String {
    text.replace('"', "\"\"")
}

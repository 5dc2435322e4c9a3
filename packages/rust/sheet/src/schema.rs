//! Column table and per-run schema resolution.
//!
//! The [`ColumnTable`] lists every column that could ever appear, including
//! each per-tag expansion of a category field. [`Schema::build`] filters it
//! once against the run's configuration; the result is immutable and owns
//! the key → position index used for every row.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, instrument};

use aptsheet_shared::{AptSheetError, OptionValue, Result, RunConfig};

use crate::category::{OTHER, Vocabularies};

/// How a column turns a record into a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    /// Complex + floorplan name, linked to the listing when a URL is known.
    Identity,
    /// Raw scalar text.
    Text,
    /// Scalar coerced to a float.
    Float,
    /// Scalar coerced to a float, shown as money.
    Currency,
    /// Scalar coerced to an integer.
    Integer,
    /// Live formula dividing two other columns of the same row.
    Ratio {
        numerator: String,
        denominator: String,
    },
    /// Category field collapsed into one cell.
    Combined { field: String },
    /// One Yes/No cell of an expanded category field; `None` is the `Other` bucket.
    TagFlag { field: String, tag: Option<String> },
}

/// One possible output column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// Logical key, e.g. `utilities` or `utilities[Gas]`.
    pub key: String,
    /// Header text.
    pub title: String,
    /// Display width, if the sink supports one.
    pub width: Option<f64>,
    /// Required option values; empty means always active.
    pub activation: Vec<(String, OptionValue)>,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(key: impl Into<String>, title: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            width: None,
            activation: Vec::new(),
            kind,
        }
    }

    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    /// Require `option == value` for this column to be active.
    pub fn when(mut self, option: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.activation.push((option.into(), value.into()));
        self
    }

    /// Every predicate entry must match; an option the run does not define fails.
    pub fn is_active(&self, run: &RunConfig) -> bool {
        self.activation
            .iter()
            .all(|(name, required)| run.option(name) == Some(required))
    }

    fn category_field(&self) -> Option<&str> {
        match &self.kind {
            ColumnKind::Combined { field } | ColumnKind::TagFlag { field, .. } => {
                Some(field.as_str())
            }
            _ => None,
        }
    }
}

/// Key of a per-tag column: `field[Tag]`.
pub fn tag_key(field: &str, tag: &str) -> String {
    format!("{field}[{tag}]")
}

// ---------------------------------------------------------------------------
// ColumnTable
// ---------------------------------------------------------------------------

/// The full static set of possible columns, in output order.
#[derive(Debug, Clone, Default)]
pub struct ColumnTable {
    columns: Vec<ColumnSpec>,
    vocabularies: Vocabularies,
}

impl ColumnTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: ColumnSpec) -> &mut Self {
        self.columns.push(column);
        self
    }

    /// Add a category field shown as one combined column.
    pub fn push_category(
        &mut self,
        field: &str,
        title: &str,
        width: f64,
        vocabulary: &[&str],
    ) -> &mut Self {
        self.vocabularies.insert(field, vocabulary.iter().copied());
        self.push_unlisted_category(field, title, width)
    }

    /// Add a category field with no vocabulary; its cell is always empty.
    pub fn push_unlisted_category(&mut self, field: &str, title: &str, width: f64) -> &mut Self {
        self.push(
            ColumnSpec::new(field, title, ColumnKind::Combined { field: field.into() })
                .width(width),
        )
    }

    /// Add a category field that `option` switches between one combined
    /// column (`false`) and one Yes/No column per tag plus `Other` (`true`).
    pub fn push_separable_category(
        &mut self,
        field: &str,
        title: &str,
        width: f64,
        vocabulary: &[&str],
        option: &str,
    ) -> &mut Self {
        self.vocabularies.insert(field, vocabulary.iter().copied());
        self.push(
            ColumnSpec::new(field, title, ColumnKind::Combined { field: field.into() })
                .width(width)
                .when(option, false),
        );

        let tags = vocabulary
            .iter()
            .map(|t| Some(t.to_string()))
            .chain(std::iter::once(None));
        for tag in tags {
            let name = tag.as_deref().unwrap_or(OTHER);
            let title = format!("{title}: {name}");
            let width = (title.len() as f64).max(5.0);
            self.push(
                ColumnSpec::new(
                    tag_key(field, name),
                    title,
                    ColumnKind::TagFlag {
                        field: field.into(),
                        tag,
                    },
                )
                .width(width)
                .when(option, true),
            );
        }
        self
    }

    /// The apartment listing layout.
    pub fn standard() -> Self {
        let mut table = Self::new();
        table
            .push(ColumnSpec::new("name", "Name / Link", ColumnKind::Identity).width(35.0))
            .push(ColumnSpec::new("neighborhood", "Neighborhood", ColumnKind::Text).width(15.0))
            .push(ColumnSpec::new("price", "Price", ColumnKind::Currency).width(11.0))
            .push(ColumnSpec::new("size", "Size (sqft)", ColumnKind::Integer).width(10.0))
            .push(
                ColumnSpec::new(
                    "value",
                    "Price/sqft",
                    ColumnKind::Ratio {
                        numerator: "price".into(),
                        denominator: "size".into(),
                    },
                )
                .width(10.0),
            )
            .push(ColumnSpec::new("bed", "Bed", ColumnKind::Float).width(5.0))
            .push(ColumnSpec::new("bath", "Bath", ColumnKind::Float).width(5.0))
            .push_separable_category(
                "utilities",
                "Included Utilities",
                18.0,
                &[
                    "Air Conditioning",
                    "Electric",
                    "Gas",
                    "Heat",
                    "Sewage",
                    "Trash",
                    "Water",
                ],
                "separate_utilities",
            )
            .push_category("parking", "Parking", 10.0, &["Covered", "Garage", "Lot"])
            .push_separable_category("pets", "Pets", 7.0, &["Cats", "Dogs"], "separate_pets")
            .push_category(
                "monthly",
                "Monthly Fees",
                15.0,
                &["Storage Fee", "Cat Rent", "Dog Rent", "Parking"],
            )
            .push_category(
                "fees",
                "One-Time Fees",
                15.0,
                &["Application Fee", "Admin Fee", "Cat Fee", "Dog Fee"],
            )
            .push_category(
                "recreation",
                "Recreation",
                11.0,
                &[
                    "Fitness Center",
                    "Pool",
                    "Tennis Court",
                    "Trails",
                    "Sauna",
                    "Spa",
                    "Racquetball Court",
                    "Volleyball Court",
                    "Playground",
                ],
            )
            .push_category(
                "features",
                "Features",
                10.0,
                &["Smoke Free", "Storage Unit", "Fireplace"],
            )
            .push_category(
                "outdoors",
                "Outdoors",
                9.0,
                &[
                    "Gated",
                    "Grill",
                    "Balcony",
                    "Patio",
                    "Sundeck",
                    "Courtyard",
                    "Picnic Area",
                ],
            )
            .push_unlisted_category("lease", "Lease Length (mo)", 17.0)
            .push(ColumnSpec::new("address", "Address", ColumnKind::Text).width(23.0))
            .push(ColumnSpec::new("distance", "Distance (mi)", ColumnKind::Text))
            .push(ColumnSpec::new("duration", "Duration (min)", ColumnKind::Text));
        table
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn vocabularies(&self) -> &Vocabularies {
        &self.vocabularies
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// The active columns of one run, with their positions.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
    index: HashMap<String, usize>,
    vocabularies: Vocabularies,
}

impl Schema {
    /// Resolve the active columns for a run, keeping table order.
    ///
    /// Fails if a category field ends up with both or neither of its
    /// presentations, or if a ratio column's inputs are inactive.
    #[instrument(skip_all, fields(table_columns = table.columns().len()))]
    pub fn build(table: &ColumnTable, run: &RunConfig) -> Result<Self> {
        let columns: Vec<ColumnSpec> = table
            .columns()
            .iter()
            .filter(|c| c.is_active(run))
            .cloned()
            .collect();

        let mut index = HashMap::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            if index.insert(column.key.clone(), position).is_some() {
                return Err(AptSheetError::validation(format!(
                    "column key '{}' is active more than once",
                    column.key
                )));
            }
        }

        check_category_exclusivity(table, &columns)?;

        for column in &columns {
            if let ColumnKind::Ratio {
                numerator,
                denominator,
            } = &column.kind
            {
                for input in [numerator, denominator] {
                    if !index.contains_key(input) {
                        return Err(AptSheetError::validation(format!(
                            "column '{}' divides by inactive column '{input}'",
                            column.key
                        )));
                    }
                }
            }
        }

        debug!(active = columns.len(), "schema resolved");

        Ok(Self {
            columns,
            index,
            vocabularies: table.vocabularies().clone(),
        })
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Zero-based position of a column key.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn vocabularies(&self) -> &Vocabularies {
        &self.vocabularies
    }
}

#[derive(Default)]
struct Presentation {
    combined_defined: bool,
    combined_active: bool,
    tags_defined: usize,
    tags_active: usize,
}

fn check_category_exclusivity(table: &ColumnTable, active: &[ColumnSpec]) -> Result<()> {
    let mut fields: BTreeMap<&str, Presentation> = BTreeMap::new();

    for column in table.columns() {
        if let Some(field) = column.category_field() {
            let p = fields.entry(field).or_default();
            match column.kind {
                ColumnKind::Combined { .. } => p.combined_defined = true,
                _ => p.tags_defined += 1,
            }
        }
    }
    for column in active {
        if let Some(field) = column.category_field() {
            let p = fields.entry(field).or_default();
            match column.kind {
                ColumnKind::Combined { .. } => p.combined_active = true,
                _ => p.tags_active += 1,
            }
        }
    }

    for (field, p) in fields {
        if p.combined_active && p.tags_active > 0 {
            return Err(AptSheetError::validation(format!(
                "category '{field}' has both its combined and per-tag columns active"
            )));
        }
        if p.tags_active > 0 && p.tags_active != p.tags_defined {
            return Err(AptSheetError::validation(format!(
                "category '{field}' has {} of {} per-tag columns active",
                p.tags_active, p.tags_defined
            )));
        }
        if p.combined_defined && p.tags_defined > 0 && !p.combined_active && p.tags_active == 0 {
            return Err(AptSheetError::validation(format!(
                "category '{field}' has neither its combined nor per-tag columns active"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use aptsheet_shared::AppConfig;

    use super::*;

    fn run_with(separate_utilities: bool, separate_pets: bool) -> RunConfig {
        let mut config = AppConfig::default();
        config.columns.separate_utilities = separate_utilities;
        config.columns.separate_pets = separate_pets;
        RunConfig::try_from(&config).expect("resolve")
    }

    fn keys(schema: &Schema) -> Vec<&str> {
        schema.columns().iter().map(|c| c.key.as_str()).collect()
    }

    #[test]
    fn default_schema_matches_standard_layout() {
        let schema = Schema::build(&ColumnTable::standard(), &RunConfig::default()).unwrap();
        assert_eq!(
            keys(&schema),
            vec![
                "name",
                "neighborhood",
                "price",
                "size",
                "value",
                "bed",
                "bath",
                "utilities",
                "parking",
                "pets",
                "monthly",
                "fees",
                "recreation",
                "features",
                "outdoors",
                "lease",
                "address",
                "distance",
                "duration",
            ]
        );
        assert_eq!(schema.position("price"), Some(2));
        assert_eq!(schema.position("size"), Some(3));
    }

    #[test]
    fn separate_utilities_swaps_in_tag_columns() {
        let schema = Schema::build(&ColumnTable::standard(), &run_with(true, false)).unwrap();
        assert!(!schema.contains("utilities"));
        assert_eq!(schema.position("utilities[Air Conditioning]"), Some(7));
        assert!(schema.contains("utilities[Water]"));
        assert_eq!(schema.position("utilities[Other]"), Some(14));
        assert_eq!(schema.position("parking"), Some(15));
        assert!(schema.contains("pets"));
        assert!(!schema.contains("pets[Cats]"));
    }

    #[test]
    fn exactly_one_presentation_for_every_configuration() {
        let table = ColumnTable::standard();
        for (u, p) in [(false, false), (true, false), (false, true), (true, true)] {
            let schema = Schema::build(&table, &run_with(u, p)).unwrap();
            assert_ne!(schema.contains("utilities"), schema.contains("utilities[Gas]"));
            assert_ne!(schema.contains("pets"), schema.contains("pets[Dogs]"));
        }
    }

    #[test]
    fn missing_option_excludes_column() {
        let mut table = ColumnTable::new();
        table
            .push(ColumnSpec::new("name", "Name", ColumnKind::Identity))
            .push(ColumnSpec::new("commute", "Commute", ColumnKind::Text).when("show_commute", true));
        let schema = Schema::build(&table, &RunConfig::default()).unwrap();
        assert_eq!(keys(&schema), vec!["name"]);
    }

    #[test]
    fn flag_option_includes_column() {
        let mut config = AppConfig::default();
        config.columns.flags.insert("show_commute".into(), true);
        let run = RunConfig::try_from(&config).unwrap();

        let mut table = ColumnTable::new();
        table.push(ColumnSpec::new("commute", "Commute", ColumnKind::Text).when("show_commute", true));
        assert!(Schema::build(&table, &run).unwrap().contains("commute"));
    }

    #[test]
    fn text_predicate_matches_price_selector() {
        let mut table = ColumnTable::new();
        table.push(
            ColumnSpec::new("avg_note", "Averaged", ColumnKind::Text)
                .when("price_selector", "average"),
        );
        assert_eq!(Schema::build(&table, &RunConfig::default()).unwrap().len(), 1);
    }

    #[test]
    fn conflicting_presentations_are_rejected() {
        let mut table = ColumnTable::new();
        table
            .push(ColumnSpec::new("pets", "Pets", ColumnKind::Combined { field: "pets".into() }))
            .push(ColumnSpec::new(
                "pets[Cats]",
                "Pets: Cats",
                ColumnKind::TagFlag {
                    field: "pets".into(),
                    tag: Some("Cats".into()),
                },
            ));
        let err = Schema::build(&table, &RunConfig::default()).unwrap_err();
        assert!(err.to_string().contains("both"));
    }

    #[test]
    fn ratio_needs_active_inputs() {
        let mut table = ColumnTable::new();
        table
            .push(ColumnSpec::new("price", "Price", ColumnKind::Currency))
            .push(ColumnSpec::new(
                "value",
                "Price/sqft",
                ColumnKind::Ratio {
                    numerator: "price".into(),
                    denominator: "size".into(),
                },
            ));
        let err = Schema::build(&table, &RunConfig::default()).unwrap_err();
        assert!(err.to_string().contains("size"));
    }
}

//! Schema-driven row export.
//!
//! [`SchemaExporter`] owns the resolved [`Schema`] and the sink for the
//! duration of a run. Lifecycle:
//!
//! ```text
//! Created --write_header--> HeaderWritten --write_row--> Exporting --close--> Closed
//! any open state --sink error--> Failed --close--> Closed
//! ```
//!
//! A row is rendered in full before any of its cells reach the sink, so a
//! row that fails numeric coercion leaves no partial output and does not
//! consume a row index.

use tracing::{trace, warn};

use aptsheet_shared::{AptSheetError, NumericPolicy, Result};

use crate::category::{self, yes_no};
use crate::cell::{CellFormat, CellValue, cell_address};
use crate::record::{LINK_MARKER, Record};
use crate::schema::{ColumnKind, Schema};
use crate::sink::Sink;

/// Where the exporter is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Created,
    HeaderWritten,
    Exporting,
    /// A sink write failed; only `close` is accepted.
    Failed,
    Closed,
}

/// Writes records into a sink according to a fixed schema.
#[derive(Debug)]
pub struct SchemaExporter<S: Sink> {
    schema: Schema,
    sink: S,
    policy: NumericPolicy,
    state: ExportState,
    /// Row index of the next data row; the header occupies row 0.
    next_row: u32,
}

impl<S: Sink> SchemaExporter<S> {
    pub fn new(schema: Schema, sink: S, policy: NumericPolicy) -> Self {
        Self {
            schema,
            sink,
            policy,
            state: ExportState::Created,
            next_row: 1,
        }
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Give back the sink, typically after [`close`](Self::close).
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Data rows emitted so far.
    pub fn rows_written(&self) -> u32 {
        self.next_row - 1
    }

    /// Declare every active column and write the bold header row.
    pub fn write_header(&mut self) -> Result<()> {
        if self.state != ExportState::Created {
            return Err(AptSheetError::invalid_state(format!(
                "header can only be written once, exporter is {:?}",
                self.state
            )));
        }

        let result = self.emit_header();
        self.state = if result.is_ok() {
            ExportState::HeaderWritten
        } else {
            ExportState::Failed
        };
        result
    }

    fn emit_header(&mut self) -> Result<()> {
        for (position, column) in self.schema.columns().iter().enumerate() {
            self.sink.define_column(position, column.width)?;
        }
        for (position, column) in self.schema.columns().iter().enumerate() {
            self.sink
                .write_header_cell(position, &column.title, CellFormat::Bold)?;
        }
        Ok(())
    }

    /// Render a record against the schema and emit it as the next row.
    ///
    /// Returns the zero-based sheet row the record was written to.
    pub fn write_row(&mut self, record: &Record) -> Result<u32> {
        match self.state {
            ExportState::HeaderWritten | ExportState::Exporting => {}
            ExportState::Created => {
                return Err(AptSheetError::invalid_state(
                    "write_row called before write_header",
                ));
            }
            ExportState::Failed => {
                return Err(AptSheetError::invalid_state(
                    "write_row called after a sink failure",
                ));
            }
            ExportState::Closed => {
                return Err(AptSheetError::invalid_state("write_row called after close"));
            }
        }

        let row = self.next_row;
        let cells = self.render_row(record, row)?;

        for (position, (value, format)) in cells.iter().enumerate() {
            if let Err(e) = self.sink.write_cell(row, position, value, *format) {
                // The row may be half written; no later row may land on it.
                self.state = ExportState::Failed;
                return Err(e);
            }
        }
        trace!(row, record = %record.label(), "row written");

        self.next_row += 1;
        self.state = ExportState::Exporting;
        Ok(row)
    }

    /// Finalize the sink. No writes are accepted afterwards.
    ///
    /// Also accepted after a sink failure, to release the destination.
    pub fn close(&mut self) -> Result<()> {
        if self.state == ExportState::Closed {
            return Err(AptSheetError::invalid_state("exporter already closed"));
        }
        self.state = ExportState::Closed;
        self.sink.close()
    }

    /// Cell values for every active column, in schema order.
    pub fn render_row(&self, record: &Record, row: u32) -> Result<Vec<(CellValue, CellFormat)>> {
        self.schema
            .columns()
            .iter()
            .map(|column| self.render_cell(record, &column.key, &column.kind, row))
            .collect()
    }

    fn render_cell(
        &self,
        record: &Record,
        key: &str,
        kind: &ColumnKind,
        row: u32,
    ) -> Result<(CellValue, CellFormat)> {
        let cell = match kind {
            ColumnKind::Identity => {
                let text = record.render_identity();
                if record.source_url().is_some() && text.starts_with(LINK_MARKER) {
                    (CellValue::Formula(text), CellFormat::Hyperlink)
                } else {
                    (CellValue::Text(text), CellFormat::Plain)
                }
            }
            ColumnKind::Text => (CellValue::text(record.scalar(key)), CellFormat::Plain),
            ColumnKind::Float => (
                CellValue::Float(self.coerce_float(record, key)?),
                CellFormat::Plain,
            ),
            ColumnKind::Currency => (
                CellValue::Float(self.coerce_float(record, key)?),
                CellFormat::Currency,
            ),
            ColumnKind::Integer => (
                CellValue::Integer(self.coerce_integer(record, key)?),
                CellFormat::Plain,
            ),
            ColumnKind::Ratio {
                numerator,
                denominator,
            } => (
                CellValue::Formula(format!(
                    "={}/{}",
                    self.address(numerator, row)?,
                    self.address(denominator, row)?
                )),
                CellFormat::Currency,
            ),
            ColumnKind::Combined { field } => (
                CellValue::Text(record.render_category(field, self.schema.vocabularies())),
                CellFormat::Plain,
            ),
            ColumnKind::TagFlag { field, tag } => {
                let tags = record.tags(field);
                let present = match tag {
                    Some(tag) => category::has_tag(tags, tag),
                    None => {
                        let vocabulary = self.schema.vocabularies().get(field).unwrap_or(&[]);
                        category::has_unlisted(vocabulary, tags)
                    }
                };
                (CellValue::text(yes_no(present)), CellFormat::Plain)
            }
        };
        Ok(cell)
    }

    fn address(&self, key: &str, row: u32) -> Result<String> {
        let position = self.schema.position(key).ok_or_else(|| {
            AptSheetError::validation(format!("formula references inactive column '{key}'"))
        })?;
        Ok(cell_address(row, position))
    }

    fn coerce_float(&self, record: &Record, key: &str) -> Result<f64> {
        let raw = record.scalar(key);
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => self.numeric_fallback(record, key, raw).map(|()| 0.0),
        }
    }

    fn coerce_integer(&self, record: &Record, key: &str) -> Result<i64> {
        let raw = record.scalar(key);
        match raw.trim().parse::<i64>() {
            Ok(v) => Ok(v),
            Err(_) => self.numeric_fallback(record, key, raw).map(|()| 0),
        }
    }

    fn numeric_fallback(&self, record: &Record, key: &str, raw: &str) -> Result<()> {
        match self.policy {
            NumericPolicy::SkipRow => Err(AptSheetError::NumericCoercion {
                record: record.label(),
                column: key.to_string(),
                value: raw.to_string(),
            }),
            NumericPolicy::DefaultZero => {
                warn!(record = %record.label(), column = key, value = raw, "non-numeric value written as 0");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use aptsheet_shared::{AppConfig, RunConfig};

    use super::*;
    use crate::schema::ColumnTable;
    use crate::sink::MemorySink;

    fn exporter(run: &RunConfig, policy: NumericPolicy) -> SchemaExporter<MemorySink> {
        let schema = Schema::build(&ColumnTable::standard(), run).expect("schema");
        SchemaExporter::new(schema, MemorySink::new(), policy)
    }

    fn sample_record() -> Record {
        let mut record = Record::new();
        record.set_complex_name("Sunset Ridge");
        record.set_floorplan_name("1BR");
        record.set_source_url("http://x");
        record.set_scalar("price", "1500");
        record.set_scalar("size", "750");
        record.set_scalar("bed", "1");
        record.set_scalar("bath", "1.5");
        record.set_scalar("neighborhood", "Uptown");
        record.add_tag("utilities", "Gas");
        record.add_tag("pets", "Dogs");
        record.add_tag("pets", "Ferrets");
        record
    }

    fn text_at(sink: &MemorySink, row: u32, key: &str, schema: &Schema) -> CellValue {
        let position = schema.position(key).expect("active column");
        sink.cell(row, position).expect("cell written").value.clone()
    }

    #[test]
    fn header_is_bold_with_widths() {
        let mut exp = exporter(&RunConfig::default(), NumericPolicy::SkipRow);
        exp.write_header().unwrap();
        assert_eq!(exp.state(), ExportState::HeaderWritten);

        let sink = exp.sink();
        assert_eq!(sink.column_count(), 19);
        assert_eq!(sink.header(0), Some("Name / Link"));
        assert_eq!(sink.header_format(0), Some(CellFormat::Bold));
        assert_eq!(sink.width(0), Some(35.0));
        assert_eq!(sink.width(17), None);
        assert_eq!(sink.header(18), Some("Duration (min)"));
    }

    #[test]
    fn row_cells_follow_column_rules() {
        let mut exp = exporter(&RunConfig::default(), NumericPolicy::SkipRow);
        exp.write_header().unwrap();
        let row = exp.write_row(&sample_record()).unwrap();
        assert_eq!(row, 1);
        assert_eq!(exp.state(), ExportState::Exporting);

        let schema = exp.schema().clone();
        let sink = exp.sink();

        let name = sink.cell(1, 0).unwrap();
        assert_eq!(
            name.value,
            CellValue::Formula("=HYPERLINK(\"http://x\", \"Sunset Ridge '1BR'\")".into())
        );
        assert_eq!(name.format, CellFormat::Hyperlink);

        let price = sink.cell(1, 2).unwrap();
        assert_eq!(price.value, CellValue::Float(1500.0));
        assert_eq!(price.format, CellFormat::Currency);
        assert_eq!(text_at(sink, 1, "size", &schema), CellValue::Integer(750));
        assert_eq!(
            text_at(sink, 1, "value", &schema),
            CellValue::Formula("=C2/D2".into())
        );
        assert_eq!(text_at(sink, 1, "bath", &schema), CellValue::Float(1.5));
        assert_eq!(text_at(sink, 1, "utilities", &schema), CellValue::text("Gas"));
        assert_eq!(text_at(sink, 1, "pets", &schema), CellValue::text("Dogs / Other"));
        assert_eq!(text_at(sink, 1, "parking", &schema), CellValue::text(""));
        assert_eq!(text_at(sink, 1, "neighborhood", &schema), CellValue::text("Uptown"));
        assert_eq!(text_at(sink, 1, "address", &schema), CellValue::text(""));
        assert_eq!(sink.cells().len(), 19);
    }

    #[test]
    fn plain_identity_without_url() {
        let mut exp = exporter(&RunConfig::default(), NumericPolicy::SkipRow);
        exp.write_header().unwrap();
        let mut record = Record::new();
        record.set_complex_name("Sunset Ridge");
        for (key, value) in [("price", "1500"), ("size", "750"), ("bed", "1"), ("bath", "1")] {
            record.set_scalar(key, value);
        }
        exp.write_row(&record).unwrap();

        let name = exp.sink().cell(1, 0).unwrap();
        assert_eq!(name.value, CellValue::text("Sunset Ridge ''"));
        assert_eq!(name.format, CellFormat::Plain);
    }

    #[test]
    fn value_formula_tracks_row_number() {
        let mut exp = exporter(&RunConfig::default(), NumericPolicy::SkipRow);
        exp.write_header().unwrap();
        for _ in 0..3 {
            exp.write_row(&sample_record()).unwrap();
        }
        // Header at row 0, so the third record sits on row index 3 / sheet row 4.
        let value = exp.sink().cell(3, 4).unwrap();
        assert_eq!(value.value, CellValue::Formula("=C4/D4".into()));
        assert_eq!(value.format, CellFormat::Currency);
        assert_eq!(exp.rows_written(), 3);
    }

    #[test]
    fn separated_utilities_render_yes_no() {
        let mut config = AppConfig::default();
        config.columns.separate_utilities = true;
        let run = RunConfig::try_from(&config).unwrap();

        let mut exp = exporter(&run, NumericPolicy::SkipRow);
        exp.write_header().unwrap();
        exp.write_row(&sample_record()).unwrap();

        let schema = exp.schema().clone();
        assert!(!schema.contains("utilities"));
        let sink = exp.sink();
        assert_eq!(text_at(sink, 1, "utilities[Gas]", &schema), CellValue::text("Yes"));
        for tag in [
            "Air Conditioning",
            "Electric",
            "Heat",
            "Sewage",
            "Trash",
            "Water",
            "Other",
        ] {
            let key = format!("utilities[{tag}]");
            assert_eq!(text_at(sink, 1, &key, &schema), CellValue::text("No"), "{key}");
        }
    }

    #[test]
    fn separated_pets_other_checks_every_tag() {
        let mut config = AppConfig::default();
        config.columns.separate_pets = true;
        let run = RunConfig::try_from(&config).unwrap();

        let mut exp = exporter(&run, NumericPolicy::SkipRow);
        exp.write_header().unwrap();
        exp.write_row(&sample_record()).unwrap();

        let schema = exp.schema().clone();
        let sink = exp.sink();
        assert_eq!(text_at(sink, 1, "pets[Cats]", &schema), CellValue::text("No"));
        assert_eq!(text_at(sink, 1, "pets[Dogs]", &schema), CellValue::text("Yes"));
        assert_eq!(text_at(sink, 1, "pets[Other]", &schema), CellValue::text("Yes"));
    }

    #[test]
    fn bad_numeric_fails_row_without_output() {
        let mut exp = exporter(&RunConfig::default(), NumericPolicy::SkipRow);
        exp.write_header().unwrap();

        let mut bad = sample_record();
        bad.set_scalar("size", "call for details");
        let err = exp.write_row(&bad).unwrap_err();
        assert!(err.is_row_level());
        assert!(err.to_string().contains("Sunset Ridge '1BR'"));
        assert!(exp.sink().cells().is_empty());

        // The next good record takes the row the bad one would have used.
        assert_eq!(exp.write_row(&sample_record()).unwrap(), 1);
    }

    #[test]
    fn missing_numeric_fails_row() {
        let mut exp = exporter(&RunConfig::default(), NumericPolicy::SkipRow);
        exp.write_header().unwrap();
        let mut record = Record::new();
        record.set_complex_name("Bare");
        let err = exp.write_row(&record).unwrap_err();
        assert!(matches!(err, AptSheetError::NumericCoercion { ref column, .. } if column == "price"));
    }

    #[test]
    fn default_zero_policy_writes_zero() {
        let mut exp = exporter(&RunConfig::default(), NumericPolicy::DefaultZero);
        exp.write_header().unwrap();
        let mut record = sample_record();
        record.set_scalar("bed", "Studio");
        exp.write_row(&record).unwrap();
        let schema = exp.schema().clone();
        assert_eq!(text_at(exp.sink(), 1, "bed", &schema), CellValue::Float(0.0));
    }

    #[test]
    fn lifecycle_misuse_is_rejected() {
        let mut exp = exporter(&RunConfig::default(), NumericPolicy::SkipRow);
        let err = exp.write_row(&sample_record()).unwrap_err();
        assert!(matches!(err, AptSheetError::InvalidState { .. }));

        exp.write_header().unwrap();
        assert!(exp.write_header().is_err());

        exp.close().unwrap();
        assert_eq!(exp.state(), ExportState::Closed);
        assert!(exp.sink().is_closed());
        assert!(matches!(
            exp.write_row(&sample_record()).unwrap_err(),
            AptSheetError::InvalidState { .. }
        ));
        assert!(exp.close().is_err());
    }

    /// Memory sink that refuses one data cell.
    struct FailingSink {
        inner: MemorySink,
        fail_at: (u32, usize),
    }

    impl Sink for FailingSink {
        fn define_column(&mut self, position: usize, width: Option<f64>) -> Result<()> {
            self.inner.define_column(position, width)
        }

        fn write_header_cell(
            &mut self,
            position: usize,
            title: &str,
            format: CellFormat,
        ) -> Result<()> {
            self.inner.write_header_cell(position, title, format)
        }

        fn write_cell(
            &mut self,
            row: u32,
            position: usize,
            value: &CellValue,
            format: CellFormat,
        ) -> Result<()> {
            if (row, position) == self.fail_at {
                return Err(AptSheetError::sink("disk full"));
            }
            self.inner.write_cell(row, position, value, format)
        }

        fn close(&mut self) -> Result<()> {
            self.inner.close()
        }
    }

    #[test]
    fn sink_failure_mid_row_stops_further_rows() {
        let schema = Schema::build(&ColumnTable::standard(), &RunConfig::default()).unwrap();
        let sink = FailingSink {
            inner: MemorySink::new(),
            fail_at: (1, 5),
        };
        let mut exp = SchemaExporter::new(schema, sink, NumericPolicy::SkipRow);
        exp.write_header().unwrap();

        let err = exp.write_row(&sample_record()).unwrap_err();
        assert!(matches!(err, AptSheetError::Sink { .. }));
        assert!(!err.is_row_level());
        assert_eq!(exp.state(), ExportState::Failed);

        // A second record must not be merged into the half-written row.
        let err = exp.write_row(&sample_record()).unwrap_err();
        assert!(matches!(err, AptSheetError::InvalidState { .. }));
        assert_eq!(exp.sink().inner.cells().len(), 5);
        assert_eq!(exp.rows_written(), 0);

        exp.close().unwrap();
        assert_eq!(exp.state(), ExportState::Closed);
        assert!(exp.sink().inner.is_closed());
    }

    #[test]
    fn text_resembling_a_formula_stays_plain_without_url() {
        let mut exp = exporter(&RunConfig::default(), NumericPolicy::SkipRow);
        exp.write_header().unwrap();
        let mut record = Record::new();
        record.set_complex_name("=HYPERLINK(\"evil\")");
        for (key, value) in [("price", "1500"), ("size", "750"), ("bed", "1"), ("bath", "1")] {
            record.set_scalar(key, value);
        }
        exp.write_row(&record).unwrap();

        let name = exp.sink().cell(1, 0).unwrap();
        assert!(matches!(name.value, CellValue::Text(_)));
        assert_eq!(name.format, CellFormat::Plain);
    }
}

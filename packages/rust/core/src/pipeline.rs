//! End-to-end export pipeline: listings → records → schema → sink.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use aptsheet_listing::{ListingDeduper, records_from_listing};
use aptsheet_shared::{AptSheetError, ListingInput, Result, RunConfig};
use aptsheet_sheet::{ColumnTable, DelimitedSink, Schema, SchemaExporter, Sink};

/// Outcome of one export run.
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    /// Listings read from the input.
    pub listings: usize,
    /// Listings skipped as duplicates of an earlier URL.
    pub skipped_duplicates: usize,
    /// Data rows written to the sink.
    pub rows_written: usize,
    /// Rows dropped because a numeric column did not parse.
    pub rows_failed: usize,
    /// Number of active columns.
    pub columns: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a listing's floorplans are exported.
    fn listing_started(&self, name: &str, current: usize, total: usize);
    /// Called when a row is dropped.
    fn row_failed(&self, label: &str, error: &AptSheetError);
    /// Called when the run completes.
    fn done(&self, summary: &ExportSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn listing_started(&self, _name: &str, _current: usize, _total: usize) {}
    fn row_failed(&self, _label: &str, _error: &AptSheetError) {}
    fn done(&self, _summary: &ExportSummary) {}
}

/// Export listings into any sink.
///
/// 1. Resolve the schema (configuration problems fail here, before any write)
/// 2. Write the header
/// 3. Convert each listing to records and write them; a row that fails
///    numeric coercion is logged and skipped
/// 4. Close the sink
///
/// Sink failures abort the run. The sink is handed back for inspection.
#[instrument(skip_all, fields(listings = listings.len()))]
pub fn export_listings<S: Sink>(
    run: &RunConfig,
    table: &ColumnTable,
    listings: &[ListingInput],
    sink: S,
    progress: &dyn ProgressReporter,
) -> Result<(ExportSummary, S)> {
    let start = Instant::now();

    // --- Phase 1: Schema ---
    progress.phase("Resolving columns");
    let schema = Schema::build(table, run)?;
    let mut summary = ExportSummary {
        listings: listings.len(),
        columns: schema.len(),
        ..Default::default()
    };
    info!(columns = schema.len(), "starting export");

    let mut exporter = SchemaExporter::new(schema, sink, run.numeric_policy);
    exporter.write_header()?;

    // --- Phase 2: Rows ---
    progress.phase("Writing rows");
    let mut dedup = ListingDeduper::new();
    for (i, listing) in listings.iter().enumerate() {
        if run.ignore_duplicates && !dedup.admit(listing) {
            summary.skipped_duplicates += 1;
            info!(url = listing.url.as_deref().unwrap_or(""), "skipping duplicate listing");
            continue;
        }

        progress.listing_started(listing.name.as_deref().unwrap_or("N/A"), i + 1, listings.len());

        for record in records_from_listing(listing, run.price_selector) {
            match exporter.write_row(&record) {
                Ok(_) => summary.rows_written += 1,
                Err(e) if e.is_row_level() => {
                    let label = record.label();
                    warn!(record = %label, error = %e, "row skipped");
                    progress.row_failed(&label, &e);
                    summary.rows_failed += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    // --- Phase 3: Finalize ---
    progress.phase("Finalizing output");
    exporter.close()?;

    summary.elapsed = start.elapsed();
    info!(
        rows = summary.rows_written,
        failed = summary.rows_failed,
        duplicates = summary.skipped_duplicates,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "export complete"
    );
    progress.done(&summary);

    Ok((summary, exporter.into_sink()))
}

/// Export listings into a CSV/TSV file at `path`, per the run's output format.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn export_to_path(
    run: &RunConfig,
    table: &ColumnTable,
    listings: &[ListingInput],
    path: &Path,
    progress: &dyn ProgressReporter,
) -> Result<ExportSummary> {
    // Resolve first so a bad configuration never creates the file.
    Schema::build(table, run)?;

    let sink = DelimitedSink::create(path, run.output_format)?;
    let (summary, _sink) = export_listings(run, table, listings, sink, progress)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use aptsheet_shared::{AppConfig, FloorplanInput};
    use aptsheet_sheet::{CellFormat, CellValue, ColumnKind, ColumnSpec, MemorySink};

    use super::*;

    fn floorplan(name: &str, rent: &str, size: &str) -> FloorplanInput {
        FloorplanInput {
            name: Some(name.into()),
            rent: Some(rent.into()),
            size: Some(size.into()),
            beds: Some("1 Bed".into()),
            baths: Some("1 Bath".into()),
        }
    }

    fn listing(name: &str, url: &str, floorplans: Vec<FloorplanInput>) -> ListingInput {
        ListingInput {
            name: Some(name.into()),
            url: Some(url.into()),
            utilities: vec!["Gas".into()],
            floorplans,
            ..Default::default()
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        failed: RefCell<Vec<String>>,
        phases: RefCell<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.borrow_mut().push(name.to_string());
        }
        fn listing_started(&self, _name: &str, _current: usize, _total: usize) {}
        fn row_failed(&self, label: &str, _error: &AptSheetError) {
            self.failed.borrow_mut().push(label.to_string());
        }
        fn done(&self, _summary: &ExportSummary) {}
    }

    #[test]
    fn exports_every_floorplan() {
        let listings = vec![listing(
            "Sunset Ridge",
            "http://x",
            vec![floorplan("1BR", "$1,500", "750 Sq Ft"), floorplan("2BR", "$2,000", "1,000 Sq Ft")],
        )];
        let (summary, sink) = export_listings(
            &RunConfig::default(),
            &ColumnTable::standard(),
            &listings,
            MemorySink::new(),
            &SilentProgress,
        )
        .unwrap();

        assert_eq!(summary.rows_written, 2);
        assert_eq!(summary.columns, 19);
        assert!(sink.is_closed());
        assert_eq!(sink.row_count(), 2);
        assert_eq!(sink.cell(2, 3).unwrap().value, CellValue::Integer(1000));
        assert_eq!(sink.cell(2, 4).unwrap().value, CellValue::Formula("=C3/D3".into()));
    }

    #[test]
    fn bad_row_is_logged_and_run_continues() {
        let listings = vec![listing(
            "Sunset Ridge",
            "http://x",
            vec![
                floorplan("1BR", "Call for Rent", "750"),
                floorplan("2BR", "$2,000", "1000"),
            ],
        )];
        let progress = RecordingProgress::default();
        let (summary, sink) = export_listings(
            &RunConfig::default(),
            &ColumnTable::standard(),
            &listings,
            MemorySink::new(),
            &progress,
        )
        .unwrap();

        assert_eq!(summary.rows_written, 1);
        assert_eq!(summary.rows_failed, 1);
        assert_eq!(progress.failed.borrow().as_slice(), ["Sunset Ridge '1BR'"]);
        // The surviving row takes the first data row.
        assert_eq!(sink.cell(1, 2).unwrap().value, CellValue::Float(2000.0));
    }

    #[test]
    fn duplicate_listings_are_skipped_when_configured() {
        let listings = vec![
            listing("A", "https://example.com/a/", vec![floorplan("1BR", "$1,000", "500")]),
            listing("A", "https://example.com/a", vec![floorplan("1BR", "$1,000", "500")]),
        ];

        let (summary, _) = export_listings(
            &RunConfig::default(),
            &ColumnTable::standard(),
            &listings,
            MemorySink::new(),
            &SilentProgress,
        )
        .unwrap();
        assert_eq!(summary.skipped_duplicates, 1);
        assert_eq!(summary.rows_written, 1);

        let mut config = AppConfig::default();
        config.input.ignore_duplicates = false;
        let run = RunConfig::try_from(&config).unwrap();
        let (summary, _) = export_listings(
            &run,
            &ColumnTable::standard(),
            &listings,
            MemorySink::new(),
            &SilentProgress,
        )
        .unwrap();
        assert_eq!(summary.rows_written, 2);
    }

    #[test]
    fn invalid_schema_fails_before_any_write() {
        let mut table = ColumnTable::new();
        table.push(ColumnSpec::new(
            "value",
            "Price/sqft",
            ColumnKind::Ratio {
                numerator: "price".into(),
                denominator: "size".into(),
            },
        ));
        let progress = RecordingProgress::default();
        let err = export_listings(
            &RunConfig::default(),
            &table,
            &[],
            MemorySink::new(),
            &progress,
        )
        .unwrap_err();
        assert!(matches!(err, AptSheetError::Validation { .. }));
        assert_eq!(progress.phases.borrow().as_slice(), ["Resolving columns"]);
    }

    #[test]
    fn export_to_path_writes_csv() {
        let path = std::env::temp_dir().join(format!(
            "aptsheet-pipeline-{}.csv",
            std::process::id()
        ));
        let listings: Vec<ListingInput> = serde_json::from_str(
            r#"[{
                "name": "Sunset Ridge",
                "floorplans": [{ "name": "1BR", "rent": "$1,500", "size": "750", "beds": "1", "baths": "1" }]
            }]"#,
        )
        .unwrap();

        let summary = export_to_path(
            &RunConfig::default(),
            &ColumnTable::standard(),
            &listings,
            &path,
            &SilentProgress,
        )
        .unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(summary.rows_written, 1);
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("Name / Link,Neighborhood,Price,"));
        assert!(lines.next().unwrap().starts_with("Sunset Ridge '1BR',,1500.00,750,=C2/D2,1,1,"));
    }

    /// Memory sink that can fail on a given data row or on close.
    #[derive(Debug, Default)]
    struct BrokenSink {
        inner: MemorySink,
        fail_row: Option<u32>,
        fail_close: bool,
    }

    impl Sink for BrokenSink {
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
            if self.fail_row == Some(row) {
                return Err(AptSheetError::sink("disk full"));
            }
            self.inner.write_cell(row, position, value, format)
        }

        fn close(&mut self) -> Result<()> {
            if self.fail_close {
                return Err(AptSheetError::sink_unavailable(
                    "out.csv",
                    std::io::Error::other("device removed"),
                ));
            }
            self.inner.close()
        }
    }

    fn two_floorplans() -> Vec<ListingInput> {
        vec![listing(
            "Sunset Ridge",
            "http://x",
            vec![floorplan("1BR", "$1,500", "750"), floorplan("2BR", "$2,000", "1000")],
        )]
    }

    #[test]
    fn sink_write_error_aborts_the_run() {
        let sink = BrokenSink {
            fail_row: Some(2),
            ..Default::default()
        };
        let progress = RecordingProgress::default();
        let err = export_listings(
            &RunConfig::default(),
            &ColumnTable::standard(),
            &two_floorplans(),
            sink,
            &progress,
        )
        .unwrap_err();

        assert!(matches!(err, AptSheetError::Sink { .. }));
        assert!(progress.failed.borrow().is_empty());
        assert!(!progress.phases.borrow().iter().any(|p| p == "Finalizing output"));
    }

    #[test]
    fn sink_close_error_aborts_the_run() {
        let sink = BrokenSink {
            fail_close: true,
            ..Default::default()
        };
        let err = export_listings(
            &RunConfig::default(),
            &ColumnTable::standard(),
            &two_floorplans(),
            sink,
            &SilentProgress,
        )
        .unwrap_err();
        assert!(matches!(err, AptSheetError::SinkUnavailable { .. }));
    }
}

//! CSV / TSV file sink.
//!
//! Formulas are written as their `=`-prefixed text so spreadsheet programs
//! evaluate them on import. Widths and formats other than currency have no
//! textual representation and are dropped.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use aptsheet_shared::{AptSheetError, OutputFormat, Result};

use super::Sink;
use crate::cell::{CellFormat, CellValue};

/// Streams rows to a delimited text file.
///
/// Cells of the current row are buffered and the row is written out when a
/// later row starts or the sink is closed.
#[derive(Debug)]
pub struct DelimitedSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    delimiter: char,
    columns: usize,
    header: Vec<String>,
    header_flushed: bool,
    pending: Option<(u32, Vec<String>)>,
    rows_written: usize,
}

impl DelimitedSink {
    /// Create (or truncate) the output file.
    pub fn create(path: impl AsRef<Path>, format: OutputFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| AptSheetError::sink_unavailable(&path, e))?;
        debug!(path = %path.display(), ?format, "opened delimited sink");

        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
            delimiter: format.delimiter(),
            columns: 0,
            header: Vec::new(),
            header_flushed: false,
            pending: None,
            rows_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows flushed so far.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| AptSheetError::invalid_state("delimited sink is closed"))
    }

    fn emit(&mut self, row: &[String]) -> Result<()> {
        let delimiter = self.delimiter;
        let path = self.path.clone();
        let writer = self.writer()?;
        write_row(writer, row, delimiter)
            .map_err(|e| AptSheetError::sink(format!("write to {} failed: {e}", path.display())))
    }

    fn flush_header(&mut self) -> Result<()> {
        if self.header_flushed {
            return Ok(());
        }
        self.header_flushed = true;
        if self.header.is_empty() {
            return Ok(());
        }
        let mut header = std::mem::take(&mut self.header);
        header.resize(self.columns.max(header.len()), String::new());
        self.emit(&header)
    }

    fn flush_pending(&mut self) -> Result<()> {
        if let Some((row, cells)) = self.pending.take() {
            trace!(row, "flushing row");
            self.emit(&cells)?;
            self.rows_written += 1;
        }
        Ok(())
    }
}

impl Sink for DelimitedSink {
    fn define_column(&mut self, position: usize, width: Option<f64>) -> Result<()> {
        self.writer()?;
        trace!(position, ?width, "column width ignored for delimited output");
        self.columns = self.columns.max(position + 1);
        Ok(())
    }

    fn write_header_cell(
        &mut self,
        position: usize,
        title: &str,
        _format: CellFormat,
    ) -> Result<()> {
        self.writer()?;
        if self.header_flushed {
            return Err(AptSheetError::invalid_state(
                "header cell written after data rows",
            ));
        }
        if self.header.len() <= position {
            self.header.resize(position + 1, String::new());
        }
        self.header[position] = title.to_string();
        Ok(())
    }

    fn write_cell(
        &mut self,
        row: u32,
        position: usize,
        value: &CellValue,
        format: CellFormat,
    ) -> Result<()> {
        self.writer()?;
        self.flush_header()?;

        match &self.pending {
            Some((current, _)) if *current == row => {}
            Some((current, _)) if *current > row => {
                return Err(AptSheetError::sink(format!(
                    "row {row} written after row {current}"
                )));
            }
            _ => {
                self.flush_pending()?;
                self.pending = Some((row, vec![String::new(); self.columns]));
            }
        }

        if let Some((_, cells)) = self.pending.as_mut() {
            if cells.len() <= position {
                cells.resize(position + 1, String::new());
            }
            cells[position] = value.display(format);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.writer()?;
        self.flush_header()?;
        self.flush_pending()?;

        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| AptSheetError::sink_unavailable(&self.path, e))?;
        }
        debug!(path = %self.path.display(), rows = self.rows_written, "closed delimited sink");
        Ok(())
    }
}

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write one delimited row, quoting fields that need it.
fn write_row<W: Write>(w: &mut W, row: &[String], sep: char) -> std::io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{sep}")?;
        }
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    writeln!(w)
}

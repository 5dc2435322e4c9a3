//! Output sinks.
//!
//! The exporter drives a sink with ordered calls: column definitions, header
//! cells, data cells row by row, then `close`. A sink serializes writes in
//! call order and rejects anything after `close`.

mod delimited;

use std::collections::BTreeMap;

use aptsheet_shared::{AptSheetError, Result};

use crate::cell::{CellFormat, CellValue};

pub use delimited::DelimitedSink;

/// Destination for an exported sheet.
pub trait Sink {
    /// Declare a column, with its display width when known.
    fn define_column(&mut self, position: usize, width: Option<f64>) -> Result<()>;

    /// Write one header cell at row 0.
    fn write_header_cell(&mut self, position: usize, title: &str, format: CellFormat)
    -> Result<()>;

    /// Write one data cell.
    fn write_cell(
        &mut self,
        row: u32,
        position: usize,
        value: &CellValue,
        format: CellFormat,
    ) -> Result<()>;

    /// Flush and finalize the destination.
    fn close(&mut self) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn define_column(&mut self, position: usize, width: Option<f64>) -> Result<()> {
        (**self).define_column(position, width)
    }

    fn write_header_cell(
        &mut self,
        position: usize,
        title: &str,
        format: CellFormat,
    ) -> Result<()> {
        (**self).write_header_cell(position, title, format)
    }

    fn write_cell(
        &mut self,
        row: u32,
        position: usize,
        value: &CellValue,
        format: CellFormat,
    ) -> Result<()> {
        (**self).write_cell(row, position, value, format)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// A data cell as received by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenCell {
    pub row: u32,
    pub position: usize,
    pub value: CellValue,
    pub format: CellFormat,
}

/// Keeps everything in memory; used for previews and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    widths: BTreeMap<usize, Option<f64>>,
    headers: BTreeMap<usize, (String, CellFormat)>,
    cells: Vec<WrittenCell>,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Width declared for a column; `None` if undeclared or declared without width.
    pub fn width(&self, position: usize) -> Option<f64> {
        self.widths.get(&position).copied().flatten()
    }

    pub fn column_count(&self) -> usize {
        self.widths.len()
    }

    pub fn header(&self, position: usize) -> Option<&str> {
        self.headers.get(&position).map(|(t, _)| t.as_str())
    }

    pub fn header_format(&self, position: usize) -> Option<CellFormat> {
        self.headers.get(&position).map(|(_, f)| *f)
    }

    /// All data cells in write order.
    pub fn cells(&self) -> &[WrittenCell] {
        &self.cells
    }

    pub fn cell(&self, row: u32, position: usize) -> Option<&WrittenCell> {
        self.cells
            .iter()
            .find(|c| c.row == row && c.position == position)
    }

    /// Number of distinct data rows received.
    pub fn row_count(&self) -> usize {
        let mut rows: Vec<u32> = self.cells.iter().map(|c| c.row).collect();
        rows.dedup();
        rows.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(AptSheetError::invalid_state("memory sink is closed"));
        }
        Ok(())
    }
}

impl Sink for MemorySink {
    fn define_column(&mut self, position: usize, width: Option<f64>) -> Result<()> {
        self.ensure_open()?;
        self.widths.insert(position, width);
        Ok(())
    }

    fn write_header_cell(
        &mut self,
        position: usize,
        title: &str,
        format: CellFormat,
    ) -> Result<()> {
        self.ensure_open()?;
        self.headers.insert(position, (title.to_string(), format));
        Ok(())
    }

    fn write_cell(
        &mut self,
        row: u32,
        position: usize,
        value: &CellValue,
        format: CellFormat,
    ) -> Result<()> {
        self.ensure_open()?;
        self.cells.push(WrittenCell {
            row,
            position,
            value: value.clone(),
            format,
        });
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;
        Ok(())
    }
}

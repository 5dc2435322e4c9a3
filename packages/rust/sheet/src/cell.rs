//! Cell values, formats and spreadsheet addressing.

use std::fmt;

/// A value handed to a sink.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Literal text.
    Text(String),
    /// Live formula, including its leading `=`.
    Formula(String),
    Integer(i64),
    Float(f64),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Text as it would be typed into the cell.
    pub fn display(&self, format: CellFormat) -> String {
        match (self, format) {
            (Self::Text(s), _) | (Self::Formula(s), _) => s.clone(),
            (Self::Integer(i), _) => i.to_string(),
            (Self::Float(f), CellFormat::Currency) => format!("{f:.2}"),
            (Self::Float(f), _) => f.to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display(CellFormat::Plain))
    }
}

/// Presentation hint for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellFormat {
    #[default]
    Plain,
    Bold,
    /// Underlined blue link text.
    Hyperlink,
    /// Accounting style, two decimals.
    Currency,
}

/// Column letters for a zero-based column index: 0 → `A`, 25 → `Z`, 26 → `AA`.
pub fn column_letters(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// `A1`-style address for a zero-based row and column.
pub fn cell_address(row: u32, column: usize) -> String {
    format!("{}{}", column_letters(column), row + 1)
}

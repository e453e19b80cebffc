//! Raw and canonical table types.

use serde::{Deserialize, Serialize};

/// A table exactly as returned by a detection strategy for one page.
///
/// A jagged grid of optional text cells. No invariants are guaranteed:
/// rows may be ragged, entirely empty, or missing altogether. Detected
/// tables only become usable after normalization
/// ([`TableNormalizer`](crate::normalize::TableNormalizer)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    /// 1-based page number the table was detected on.
    pub page: u32,

    /// Rows of optional cells, in reading order.
    pub cells: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Create a raw table for a page.
    pub fn new(page: u32, cells: Vec<Vec<Option<String>>>) -> Self {
        Self { page, cells }
    }

    /// Build a raw table from plain string rows (every cell present).
    pub fn from_rows<R, S>(page: u32, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cells = rows
            .into_iter()
            .map(|row| row.into_iter().map(|c| Some(c.into())).collect())
            .collect();
        Self { page, cells }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.cells.len()
    }

    /// Check if the grid has no rows at all.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Check if every cell is missing or whitespace-only.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|row| row_is_blank(row))
    }
}

/// Check if a raw row contains no meaningful text.
pub(crate) fn row_is_blank(row: &[Option<String>]) -> bool {
    row.iter()
        .all(|cell| cell.as_deref().map_or(true, |c| c.trim().is_empty()))
}

/// A fully cleaned rectangular table, ready for serialization.
///
/// Invariants (established by
/// [`TableNormalizer`](crate::normalize::TableNormalizer)): every data row
/// has exactly `header.len()` cells, every header label is non-empty, and
/// no row or column is entirely blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalTable {
    /// Column labels. Blank source cells get positional `Column_<index>`
    /// placeholders; content duplicates are kept as-is.
    pub header: Vec<String>,

    /// Data rows, each exactly `header.len()` cells.
    pub rows: Vec<Vec<String>>,
}

impl CanonicalTable {
    /// Create a canonical table from header and rows.
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// The empty table: degenerate result of normalizing blank input.
    pub fn empty() -> Self {
        Self {
            header: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    /// Number of data rows (header excluded).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table carries no header and no rows.
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.rows.is_empty()
    }
}

//! Table normalization.
//!
//! Detected raw tables are ragged and noisy: rows of differing lengths,
//! blank filler rows, columns that never held data. Normalization turns a
//! raw table into a canonical rectangular one: a single header row, every
//! data row exactly header-length, no fully blank row or column left.

use regex::Regex;

use crate::model::{row_is_blank, CanonicalTable, RawTable};

/// Normalizes raw tables into canonical form.
///
/// This is a total function: it never fails, though a table with no
/// usable content normalizes to [`CanonicalTable::empty`].
pub struct TableNormalizer {
    whitespace_run: Regex,
}

impl TableNormalizer {
    pub fn new() -> Self {
        Self {
            whitespace_run: Regex::new(r"\s+").unwrap(),
        }
    }

    /// Normalize a raw table.
    ///
    /// Blank rows are dropped first, so a leading blank row is never
    /// mistaken for the header. The first surviving row becomes the
    /// header, with blank header cells replaced by positional
    /// `Column_<index>` labels. Data rows are truncated or right-padded
    /// to the header width, then columns and rows that ended up entirely
    /// empty are pruned.
    pub fn normalize(&self, raw: &RawTable) -> CanonicalTable {
        let mut rows: Vec<&Vec<Option<String>>> = raw
            .cells
            .iter()
            .filter(|row| !row_is_blank(row))
            .collect();

        if rows.is_empty() {
            return CanonicalTable::empty();
        }

        let header_cells = rows.remove(0);
        let header: Vec<String> = header_cells
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => self.clean_cell(text),
                _ => format!("Column_{}", i),
            })
            .collect();

        let width = header.len();
        let mut data: Vec<Vec<String>> = rows
            .into_iter()
            .map(|row| {
                let mut cells: Vec<String> = row
                    .iter()
                    .take(width)
                    .map(|cell| match cell.as_deref().map(str::trim) {
                        Some(text) if !text.is_empty() => self.clean_cell(text),
                        _ => String::new(),
                    })
                    .collect();
                cells.resize(width, String::new());
                cells
            })
            .collect();

        // Prune columns empty across every data row. With no data rows
        // there is no evidence to prune on, so header columns stay.
        let (header, pruned) = if data.is_empty() {
            (header, data)
        } else {
            let keep: Vec<bool> = (0..width)
                .map(|col| data.iter().any(|row| !row[col].is_empty()))
                .collect();
            let header = filter_by(header, &keep);
            data = data.into_iter().map(|row| filter_by(row, &keep)).collect();
            data.retain(|row| row.iter().any(|c| !c.is_empty()));
            (header, data)
        };

        CanonicalTable::new(header, pruned)
    }

    /// Collapse internal whitespace runs to single spaces.
    fn clean_cell(&self, text: &str) -> String {
        self.whitespace_run.replace_all(text, " ").into_owned()
    }
}

impl Default for TableNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

fn filter_by<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, &k)| k.then_some(item))
        .collect()
}

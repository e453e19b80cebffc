//! Plain-text grid fallback.
//!
//! Last-resort detector for documents the span-based detectors cannot
//! read: extracts the page text as a whole and looks for runs of lines
//! whose cells are separated by tabs or wide space gaps. Coarser than the
//! span detectors, but it copes with generated PDFs whose text operators
//! confuse positional analysis.

use regex::Regex;

use crate::error::Result;
use crate::model::RawTable;

use super::strategy::DetectStrategy;
use super::PdfSource;

/// Lines with fewer cells than this are prose, not table rows.
const MIN_CELLS: usize = 2;

/// Minimum consecutive table-like lines to accept as a table.
const MIN_LINES: usize = 2;

/// Detects tables in extracted plain text.
pub struct TextGridDetector {
    separator: Regex,
}

impl TextGridDetector {
    pub fn new() -> Self {
        Self {
            // Two or more spaces, or any tab run, separates cells
            separator: Regex::new(r" {2,}|\t+").unwrap(),
        }
    }

    /// Split one line into trimmed cells.
    fn split_cells(&self, line: &str) -> Vec<String> {
        self.separator
            .split(line.trim())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Collect tables from one page of extracted text.
    fn detect_in_text(&self, page: u32, text: &str) -> Vec<RawTable> {
        let mut tables = Vec::new();
        let mut run: Vec<Vec<String>> = Vec::new();

        for line in text.lines() {
            let cells = self.split_cells(line);
            if cells.len() >= MIN_CELLS {
                run.push(cells);
            } else {
                flush_run(page, &mut run, &mut tables);
            }
        }
        flush_run(page, &mut run, &mut tables);

        tables
    }
}

impl Default for TextGridDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectStrategy for TextGridDetector {
    fn name(&self) -> &str {
        "textgrid"
    }

    fn detect(&self, source: &PdfSource) -> Result<Vec<RawTable>> {
        let text = pdf_extract::extract_text_from_mem(source.bytes())?;

        let mut tables = Vec::new();
        // Page breaks surface as form feeds when the extractor emits them
        for (i, page_text) in text.split('\u{0c}').enumerate() {
            tables.extend(self.detect_in_text(i as u32 + 1, page_text));
        }
        Ok(tables)
    }
}

/// Close the current run, keeping it only if long enough to be a table.
fn flush_run(page: u32, run: &mut Vec<Vec<String>>, tables: &mut Vec<RawTable>) {
    if run.len() >= MIN_LINES {
        // Pad ragged rows to the widest line
        let width = run.iter().map(Vec::len).max().unwrap_or(0);
        let cells = run
            .drain(..)
            .map(|row| {
                let mut padded: Vec<Option<String>> = row.into_iter().map(Some).collect();
                padded.resize(width, None);
                padded
            })
            .collect();
        tables.push(RawTable::new(page, cells));
    } else {
        run.clear();
    }
}

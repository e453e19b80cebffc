//! Stream-mode table detection from text alignment.
//!
//! Detects tables by analyzing text alignment patterns without relying on
//! graphical lines: spans are grouped into rows by Y position, column
//! boundaries are inferred from left edges that repeat across rows, and
//! contiguous well-aligned row runs become tables.

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::model::RawTable;

use super::layout::{extract_page_spans, TextSpan};
use super::strategy::DetectStrategy;
use super::PdfSource;

/// Stream detector configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Y tolerance for grouping spans into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
}

impl StreamConfig {
    /// Relaxed thresholds: heuristic guessing enabled. Finds more tables
    /// at the cost of occasional false positives.
    pub fn relaxed() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
        }
    }

    /// Strict thresholds: guessing disabled. Only accepts regions where
    /// most spans sit exactly on a column edge.
    pub fn strict() -> Self {
        Self {
            min_alignment_ratio: 0.6,
            min_column_gap: 25.0,
            ..Self::relaxed()
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::relaxed()
    }
}

/// A row of text spans grouped by Y position.
#[derive(Debug, Clone)]
struct SpanRow {
    y: f32,
    spans: Vec<TextSpan>,
}

/// Detects tables from text span alignment.
pub struct StreamDetector {
    config: StreamConfig,
    name: &'static str,
}

impl StreamDetector {
    /// Relaxed-parameterization detector.
    pub fn relaxed() -> Self {
        Self {
            config: StreamConfig::relaxed(),
            name: "stream",
        }
    }

    /// Strict-parameterization detector (guessing disabled).
    pub fn strict() -> Self {
        Self {
            config: StreamConfig::strict(),
            name: "stream-strict",
        }
    }

    /// Detector with a custom configuration.
    pub fn with_config(config: StreamConfig) -> Self {
        Self {
            config,
            name: "stream-custom",
        }
    }

    /// Detect table regions among the given spans and convert each to a
    /// raw table for `page`.
    pub fn detect_in_spans(&self, page: u32, spans: &[TextSpan]) -> Vec<RawTable> {
        log::debug!(
            "StreamDetector[{}]: page {} with {} spans",
            self.name,
            page,
            spans.len()
        );

        if spans.len() < self.config.min_rows * self.config.min_columns {
            return vec![];
        }

        let rows = self.group_into_rows(spans);
        if rows.len() < self.config.min_rows {
            return vec![];
        }

        let columns = self.detect_columns(&rows);
        log::debug!(
            "StreamDetector[{}]: {} candidate columns at {:?}",
            self.name,
            columns.len(),
            columns
        );
        if columns.len() < self.config.min_columns {
            return vec![];
        }

        let mut tables = Vec::new();
        for (start, end) in self.find_table_regions(&rows, &columns) {
            let region = &rows[start..=end];

            // Re-detect columns for this specific region
            let region_columns = self.detect_columns(region);
            if region_columns.len() < self.config.min_columns {
                continue;
            }
            if region_columns.len() > self.config.max_columns {
                log::debug!(
                    "StreamDetector[{}]: skipping region with {} columns (> {})",
                    self.name,
                    region_columns.len(),
                    self.config.max_columns
                );
                continue;
            }
            if self.is_list_pattern(region, &region_columns) {
                log::debug!(
                    "StreamDetector[{}]: skipping region detected as list pattern",
                    self.name
                );
                continue;
            }

            tables.push(self.region_to_table(page, region, &region_columns));
        }

        tables
    }

    /// Group spans into rows by Y position.
    fn group_into_rows(&self, spans: &[TextSpan]) -> Vec<SpanRow> {
        if spans.is_empty() {
            return vec![];
        }

        // Sort by Y (descending for PDF coords) then X
        let mut sorted_spans = spans.to_vec();
        sorted_spans.sort_by(|a, b| {
            let y_cmp = b.y.partial_cmp(&a.y).unwrap_or(std::cmp::Ordering::Equal);
            if y_cmp == std::cmp::Ordering::Equal {
                a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal)
            } else {
                y_cmp
            }
        });

        let mut rows: Vec<SpanRow> = Vec::new();
        let mut current_row_spans: Vec<TextSpan> = Vec::new();
        let mut current_y: Option<f32> = None;

        for span in sorted_spans {
            let y_tolerance = span.font_size * self.config.y_tolerance_factor;

            match current_y {
                Some(y) if (span.y - y).abs() <= y_tolerance => {
                    current_row_spans.push(span);
                }
                _ => {
                    if !current_row_spans.is_empty() {
                        let avg_y = current_row_spans.iter().map(|s| s.y).sum::<f32>()
                            / current_row_spans.len() as f32;
                        rows.push(SpanRow {
                            y: avg_y,
                            spans: std::mem::take(&mut current_row_spans),
                        });
                    }
                    current_y = Some(span.y);
                    current_row_spans.push(span);
                }
            }
        }

        if !current_row_spans.is_empty() {
            let avg_y =
                current_row_spans.iter().map(|s| s.y).sum::<f32>() / current_row_spans.len() as f32;
            rows.push(SpanRow {
                y: avg_y,
                spans: current_row_spans,
            });
        }

        rows
    }

    /// Detect column boundaries from left edges that repeat across rows.
    fn detect_columns(&self, rows: &[SpanRow]) -> Vec<f32> {
        if rows.is_empty() {
            return vec![];
        }

        // Prefer rows with multiple spans (likely table rows)
        let multi_span_rows: Vec<&SpanRow> = rows.iter().filter(|r| r.spans.len() >= 2).collect();

        if multi_span_rows.len() < self.config.min_rows {
            return self.bucket_edges(rows.iter(), rows.len());
        }

        self.bucket_edges(multi_span_rows.iter().copied(), multi_span_rows.len())
    }

    /// Bucket span left edges into 5pt bins and keep bins that recur in
    /// enough rows, merging bins closer than the minimum column gap.
    fn bucket_edges<'a>(
        &self,
        rows: impl Iterator<Item = &'a SpanRow>,
        row_count: usize,
    ) -> Vec<f32> {
        let bucket_size = 5.0;
        let mut edge_counts: HashMap<i32, usize> = HashMap::new();

        for row in rows {
            // Count each bucket only once per row
            let mut row_buckets: HashSet<i32> = HashSet::new();
            for span in &row.spans {
                row_buckets.insert((span.x / bucket_size).round() as i32);
            }
            for bucket in row_buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((row_count as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut column_edges: Vec<f32> = edge_counts
            .iter()
            .filter(|(_, count)| **count >= min_occurrences)
            .map(|(bucket, _)| *bucket as f32 * bucket_size)
            .collect();

        column_edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut merged: Vec<f32> = Vec::new();
        for edge in column_edges {
            match merged.last() {
                Some(&last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }

        merged
    }

    /// Find contiguous row runs with good column alignment.
    fn find_table_regions(&self, rows: &[SpanRow], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions: Vec<(usize, usize)> = Vec::new();
        let mut current_start: Option<usize> = None;
        let mut consecutive = 0;

        for (i, row) in rows.iter().enumerate() {
            if self.alignment_score(row, columns) >= self.config.min_alignment_ratio {
                if current_start.is_none() {
                    current_start = Some(i);
                }
                consecutive += 1;
            } else {
                if let Some(start) = current_start {
                    if consecutive >= self.config.min_rows {
                        regions.push((start, i - 1));
                    }
                }
                current_start = None;
                consecutive = 0;
            }
        }

        if let Some(start) = current_start {
            if consecutive >= self.config.min_rows {
                regions.push((start, rows.len() - 1));
            }
        }

        regions
    }

    /// Fraction of a row's spans sitting on a detected column edge.
    fn alignment_score(&self, row: &SpanRow, columns: &[f32]) -> f32 {
        if row.spans.is_empty() || columns.is_empty() {
            return 0.0;
        }

        let tolerance = 5.0;
        let aligned = row
            .spans
            .iter()
            .filter(|span| columns.iter().any(|col| (span.x - col).abs() <= tolerance))
            .count();

        aligned as f32 / row.spans.len() as f32
    }

    /// Convert a detected region into a raw table: one cell per column,
    /// spans assigned to the nearest column, missing cells left as None.
    fn region_to_table(&self, page: u32, region: &[SpanRow], columns: &[f32]) -> RawTable {
        let right_x = region
            .iter()
            .flat_map(|r| r.spans.iter())
            .map(|s| s.right())
            .fold(0.0_f32, f32::max);

        let mut cells: Vec<Vec<Option<String>>> = Vec::with_capacity(region.len());
        for row in region {
            let mut contents: Vec<Vec<String>> = vec![Vec::new(); columns.len()];
            for span in &row.spans {
                let col = find_column_for_span(span.x, columns, right_x);
                if col < contents.len() {
                    contents[col].push(span.text.trim().to_string());
                }
            }
            cells.push(
                contents
                    .into_iter()
                    .map(|c| if c.is_empty() { None } else { Some(c.join(" ")) })
                    .collect(),
            );
        }

        RawTable::new(page, cells)
    }

    /// Check if detected table rows actually represent a numbered or
    /// bulleted list.
    ///
    /// A numbered list like "1. Item" often puts the marker and text in
    /// separate spans at different X positions, which looks like a
    /// two-column table. This catches that false positive.
    fn is_list_pattern(&self, rows: &[SpanRow], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullet_count = 0;
        let mut number_count = 0;

        for row in rows {
            let first_span = row
                .spans
                .iter()
                .min_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

            if let Some(span) = first_span {
                let text = span.text.trim();
                if is_bullet_marker(text) {
                    bullet_count += 1;
                } else if is_number_marker(text) {
                    number_count += 1;
                }
            }
        }

        let bullet_ratio = bullet_count as f32 / rows.len() as f32;
        let total_ratio = (bullet_count + number_count) as f32 / rows.len() as f32;

        // Bullet markers are almost never real table data
        if bullet_ratio >= 0.5 {
            return true;
        }

        // For numbered markers, only reject 2-column regions to avoid
        // false negatives on real tables with numbered first columns
        columns.len() == 2 && total_ratio >= 0.5
    }
}

impl DetectStrategy for StreamDetector {
    fn name(&self) -> &str {
        self.name
    }

    fn detect(&self, source: &PdfSource) -> Result<Vec<RawTable>> {
        let mut tables = Vec::new();
        for page in source.page_numbers() {
            let spans = extract_page_spans(source.doc(), page)?;
            tables.extend(self.detect_in_spans(page, &spans));
        }
        Ok(tables)
    }
}

/// Find which column a span belongs to based on its X position.
fn find_column_for_span(span_x: f32, columns: &[f32], right_x: f32) -> usize {
    if columns.is_empty() {
        return 0;
    }

    for (i, &col_start) in columns.iter().enumerate() {
        let col_end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        // Allow some tolerance for spans slightly before the column start
        if span_x >= col_start - 10.0 && span_x < col_end - 10.0 {
            return i;
        }
    }

    // No exact match: take the closest column
    let mut min_dist = f32::MAX;
    let mut closest = 0;
    for (i, &col_start) in columns.iter().enumerate() {
        let dist = (span_x - col_start).abs();
        if dist < min_dist {
            min_dist = dist;
            closest = i;
        }
    }
    closest
}

/// Check if text is a bullet marker.
fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–"
            | "—"
            | "•"
            | "·"
            | "*"
            | "○"
            | "▪"
            | "◦"
            | "▸"
            | "►"
            | "■"
            | "●"
            | "※"
            | "□"
            | "◆"
            | "▶"
            | "☞"
            | "➤"
    )
}

/// Check if text is a number-style list marker (1., 2), a., etc.).
fn is_number_marker(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }

    // Remove internal whitespace for pattern matching (handles "1 .")
    let cleaned: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();

    // Numbered markers: digits followed by "." or ")"
    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let prefix = &cleaned[..pos];
        let suffix = &cleaned[pos..];
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }

    // Just a bare number
    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    // Letter marker: "a.", "B)"
    if cleaned.len() == 2 {
        let chars: Vec<char> = cleaned.chars().collect();
        if chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')') {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_span(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan::new(text.to_string(), x, y, 12.0)
    }

    #[test]
    fn test_group_into_rows() {
        let detector = StreamDetector::relaxed();
        let spans = vec![
            make_span("A1", 10.0, 100.0),
            make_span("B1", 60.0, 100.0),
            make_span("A2", 10.0, 85.0),
            make_span("B2", 60.0, 85.0),
        ];

        let rows = detector.group_into_rows(&spans);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].spans.len(), 2);
        assert_eq!(rows[1].spans.len(), 2);
    }

    #[test]
    fn test_detect_columns() {
        let detector = StreamDetector::relaxed();
        let spans = vec![
            make_span("A1", 10.0, 100.0),
            make_span("B1", 60.0, 100.0),
            make_span("A2", 10.0, 85.0),
            make_span("B2", 60.0, 85.0),
            make_span("A3", 10.0, 70.0),
            make_span("B3", 60.0, 70.0),
        ];
        let rows = detector.group_into_rows(&spans);
        let columns = detector.detect_columns(&rows);
        assert_eq!(columns.len(), 2);
    }

    #[test]
    fn test_detect_simple_table() {
        let detector = StreamDetector::relaxed();
        let spans = vec![
            // Header row
            make_span("Name", 10.0, 100.0),
            make_span("Age", 60.0, 100.0),
            // Data rows
            make_span("Alice", 10.0, 85.0),
            make_span("30", 60.0, 85.0),
            make_span("Bob", 10.0, 70.0),
            make_span("25", 60.0, 70.0),
        ];

        let tables = detector.detect_in_spans(1, &spans);
        assert_eq!(tables.len(), 1);

        let table = &tables[0];
        assert_eq!(table.page, 1);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.cells[0][0].as_deref(), Some("Name"));
        assert_eq!(table.cells[1][1].as_deref(), Some("30"));
    }

    #[test]
    fn test_missing_cell_becomes_none() {
        let detector = StreamDetector::relaxed();
        let spans = vec![
            make_span("Name", 10.0, 100.0),
            make_span("Age", 60.0, 100.0),
            make_span("Alice", 10.0, 85.0),
            make_span("30", 60.0, 85.0),
            // Row with only the first column populated
            make_span("Bob", 10.0, 70.0),
        ];

        let tables = detector.detect_in_spans(1, &spans);
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.cells[2][0].as_deref(), Some("Bob"));
        assert_eq!(table.cells[2][1], None);
    }

    #[test]
    fn test_no_table_single_column() {
        let detector = StreamDetector::relaxed();
        let spans = vec![
            make_span("Line 1", 10.0, 100.0),
            make_span("Line 2", 10.0, 85.0),
            make_span("Line 3", 10.0, 70.0),
        ];

        let tables = detector.detect_in_spans(1, &spans);
        assert!(tables.is_empty());
    }

    #[test]
    fn test_numbered_list_not_detected_as_table() {
        let detector = StreamDetector::relaxed();
        let spans = vec![
            make_span("1.", 50.0, 400.0),
            make_span("Device management", 80.0, 400.0),
            make_span("2.", 50.0, 370.0),
            make_span("Object management", 80.0, 370.0),
            make_span("3.", 50.0, 340.0),
            make_span("Policies and routing", 80.0, 340.0),
            make_span("4.", 50.0, 310.0),
            make_span("VPN", 80.0, 310.0),
        ];

        let tables = detector.detect_in_spans(1, &spans);
        assert!(tables.is_empty(), "numbered list must not become a table");
    }

    #[test]
    fn test_bullet_list_not_detected_as_table() {
        let detector = StreamDetector::relaxed();
        let spans = vec![
            make_span("-", 50.0, 400.0),
            make_span("Management", 80.0, 400.0),
            make_span("-", 50.0, 370.0),
            make_span("Interface options", 80.0, 370.0),
            make_span("-", 50.0, 340.0),
            make_span("Firmware", 80.0, 340.0),
        ];

        let tables = detector.detect_in_spans(1, &spans);
        assert!(tables.is_empty(), "bullet list must not become a table");
    }

    #[test]
    fn test_strict_rejects_sparse_alignment() {
        // Two aligned rows drowned in misaligned ones: relaxed may bite,
        // strict must not.
        let detector = StreamDetector::strict();
        let spans = vec![
            make_span("Name", 10.0, 100.0),
            make_span("Age", 60.0, 100.0),
            make_span("wandering text", 23.0, 85.0),
            make_span("more prose", 37.0, 70.0),
            make_span("unaligned", 48.0, 55.0),
            make_span("Alice", 11.0, 40.0),
            make_span("30", 61.0, 40.0),
        ];

        let tables = detector.detect_in_spans(1, &spans);
        assert!(tables.is_empty());
    }

    #[test]
    fn test_marker_classification() {
        assert!(is_number_marker("1."));
        assert!(is_number_marker("12."));
        assert!(is_number_marker("1)"));
        assert!(is_number_marker("1 ."));
        assert!(is_number_marker("3"));
        assert!(is_number_marker("a."));
        assert!(is_number_marker("B)"));

        assert!(is_bullet_marker("-"));
        assert!(is_bullet_marker("•"));
        assert!(is_bullet_marker("*"));

        assert!(!is_number_marker("Name"));
        assert!(!is_bullet_marker("Hello"));
        assert!(!is_number_marker(""));
    }
}

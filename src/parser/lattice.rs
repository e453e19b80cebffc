//! Lattice-mode table detection from ruling lines.
//!
//! Tables with drawn borders are the easy case: the content stream carries
//! the grid as path operators. This detector collects horizontal and
//! vertical rulings from `re`, `m` and `l` operations, clusters them into
//! grid boundaries and assigns text spans to the resulting cells.

use lopdf::Document as LopdfDocument;

use crate::error::Result;
use crate::model::RawTable;

use super::layout::{extract_page_spans, get_number, page_operations, TextSpan};
use super::strategy::DetectStrategy;
use super::PdfSource;

/// A horizontal or vertical ruling segment.
#[derive(Debug, Clone, Copy)]
struct Ruling {
    /// Fixed coordinate: Y for horizontal rulings, X for vertical ones.
    position: f32,
    start: f32,
    end: f32,
}

/// Rulings collected from one page's path operators.
#[derive(Debug, Default)]
struct PageRulings {
    horizontal: Vec<Ruling>,
    vertical: Vec<Ruling>,
}

impl PageRulings {
    /// Record a segment between two points if it is axis-aligned.
    fn add_segment(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let dx = (x2 - x1).abs();
        let dy = (y2 - y1).abs();
        if dy < LINE_THICKNESS && dx >= MIN_RULING_LENGTH {
            self.horizontal.push(Ruling {
                position: (y1 + y2) / 2.0,
                start: x1.min(x2),
                end: x1.max(x2),
            });
        } else if dx < LINE_THICKNESS && dy >= MIN_RULING_LENGTH {
            self.vertical.push(Ruling {
                position: (x1 + x2) / 2.0,
                start: y1.min(y2),
                end: y1.max(y2),
            });
        }
    }

    /// Record a rectangle: thin rectangles are rulings drawn as filled
    /// bars, full rectangles contribute all four border lines.
    fn add_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        if h.abs() < LINE_THICKNESS && w.abs() >= MIN_RULING_LENGTH {
            self.horizontal.push(Ruling {
                position: y + h / 2.0,
                start: x.min(x + w),
                end: x.max(x + w),
            });
        } else if w.abs() < LINE_THICKNESS && h.abs() >= MIN_RULING_LENGTH {
            self.vertical.push(Ruling {
                position: x + w / 2.0,
                start: y.min(y + h),
                end: y.max(y + h),
            });
        } else if w.abs() >= MIN_RULING_LENGTH && h.abs() >= MIN_RULING_LENGTH {
            self.add_segment(x, y, x + w, y);
            self.add_segment(x, y + h, x + w, y + h);
            self.add_segment(x, y, x, y + h);
            self.add_segment(x + w, y, x + w, y + h);
        }
    }
}

/// Rulings thinner than this are treated as lines rather than boxes.
const LINE_THICKNESS: f32 = 2.0;

/// Segments shorter than this are decoration, not grid rulings.
const MIN_RULING_LENGTH: f32 = 10.0;

/// Boundary positions closer than this merge into one grid line.
const CLUSTER_TOLERANCE: f32 = 2.0;

/// Detects tables drawn with ruling lines.
pub struct LatticeDetector;

impl LatticeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Detect one table on a page from its rulings and text spans.
    fn detect_on_page(
        &self,
        doc: &LopdfDocument,
        page_id: (u32, u16),
        page: u32,
    ) -> Result<Option<RawTable>> {
        let rulings = collect_rulings(doc, page_id)?;

        let row_bounds = cluster_positions(&rulings.horizontal);
        let col_bounds = cluster_positions(&rulings.vertical);

        // A grid needs at least 2x2 cells, so 3 boundaries each way
        if row_bounds.len() < 3 || col_bounds.len() < 3 {
            return Ok(None);
        }

        log::debug!(
            "LatticeDetector: page {} grid {}x{} from {} h / {} v rulings",
            page,
            row_bounds.len() - 1,
            col_bounds.len() - 1,
            rulings.horizontal.len(),
            rulings.vertical.len()
        );

        let spans = extract_page_spans(doc, page)?;
        let table = fill_grid(page, &row_bounds, &col_bounds, &spans);

        // Reject grids that caught no text at all (decorative boxes)
        let has_content = table.cells.iter().flatten().any(|c| c.is_some());
        Ok(has_content.then_some(table))
    }
}

impl Default for LatticeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectStrategy for LatticeDetector {
    fn name(&self) -> &str {
        "lattice"
    }

    fn detect(&self, source: &PdfSource) -> Result<Vec<RawTable>> {
        let mut tables = Vec::new();
        for (page, page_id) in source.doc().get_pages() {
            if let Some(table) = self.detect_on_page(source.doc(), page_id, page)? {
                tables.push(table);
            }
        }
        Ok(tables)
    }
}

/// Walk the content stream and collect axis-aligned rulings.
fn collect_rulings(doc: &LopdfDocument, page_id: (u32, u16)) -> Result<PageRulings> {
    let mut rulings = PageRulings::default();
    let mut current: Option<(f32, f32)> = None;

    for op in page_operations(doc, page_id)? {
        match op.operator.as_str() {
            "m" => {
                if let (Some(x), Some(y)) = (
                    op.operands.first().and_then(get_number),
                    op.operands.get(1).and_then(get_number),
                ) {
                    current = Some((x, y));
                }
            }
            "l" => {
                if let (Some(x), Some(y)) = (
                    op.operands.first().and_then(get_number),
                    op.operands.get(1).and_then(get_number),
                ) {
                    if let Some((px, py)) = current {
                        rulings.add_segment(px, py, x, y);
                    }
                    current = Some((x, y));
                }
            }
            "re" => {
                if let (Some(x), Some(y), Some(w), Some(h)) = (
                    op.operands.first().and_then(get_number),
                    op.operands.get(1).and_then(get_number),
                    op.operands.get(2).and_then(get_number),
                    op.operands.get(3).and_then(get_number),
                ) {
                    rulings.add_rect(x, y, w, h);
                }
            }
            // Path painting ends the current subpath
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" | "n" => {
                current = None;
            }
            _ => {}
        }
    }

    Ok(rulings)
}

/// Sort ruling positions and merge those within the cluster tolerance.
fn cluster_positions(rulings: &[Ruling]) -> Vec<f32> {
    let mut positions: Vec<f32> = rulings.iter().map(|r| r.position).collect();
    positions.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut clustered: Vec<f32> = Vec::new();
    for pos in positions {
        match clustered.last() {
            Some(&last) if pos - last <= CLUSTER_TOLERANCE => {}
            _ => clustered.push(pos),
        }
    }
    clustered
}

/// Assign spans to grid cells by containment.
fn fill_grid(page: u32, row_bounds: &[f32], col_bounds: &[f32], spans: &[TextSpan]) -> RawTable {
    let n_rows = row_bounds.len() - 1;
    let n_cols = col_bounds.len() - 1;

    let mut contents: Vec<Vec<Vec<String>>> = vec![vec![Vec::new(); n_cols]; n_rows];

    // Sort spans into reading order so multi-span cells join correctly
    let mut ordered: Vec<&TextSpan> = spans.iter().collect();
    ordered.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    for span in ordered {
        let Some(col) = find_interval(col_bounds, span.x) else {
            continue;
        };
        let Some(row_from_top) = find_interval(row_bounds, span.y) else {
            continue;
        };
        // PDF Y grows upward; table rows read top to bottom
        let row = n_rows - 1 - row_from_top;
        let text = span.text.trim();
        if !text.is_empty() {
            contents[row][col].push(text.to_string());
        }
    }

    let cells = contents
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|c| if c.is_empty() { None } else { Some(c.join(" ")) })
                .collect()
        })
        .collect();

    RawTable::new(page, cells)
}

/// Index of the interval `[bounds[i], bounds[i+1])` containing `value`.
fn find_interval(bounds: &[f32], value: f32) -> Option<usize> {
    if bounds.len() < 2 {
        return None;
    }
    for i in 0..bounds.len() - 1 {
        if value >= bounds[i] && value < bounds[i + 1] {
            return Some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan::new(text.to_string(), x, y, 12.0)
    }

    #[test]
    fn test_cluster_positions_merges_near_lines() {
        let rulings: Vec<Ruling> = [100.0, 100.5, 200.0, 201.0, 300.0]
            .iter()
            .map(|&p| Ruling {
                position: p,
                start: 0.0,
                end: 100.0,
            })
            .collect();

        let clustered = cluster_positions(&rulings);
        assert_eq!(clustered, vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn test_rect_decomposes_into_rulings() {
        let mut rulings = PageRulings::default();
        rulings.add_rect(10.0, 10.0, 100.0, 50.0);
        assert_eq!(rulings.horizontal.len(), 2);
        assert_eq!(rulings.vertical.len(), 2);
    }

    #[test]
    fn test_thin_rect_is_single_ruling() {
        let mut rulings = PageRulings::default();
        rulings.add_rect(10.0, 99.5, 200.0, 1.0);
        assert_eq!(rulings.horizontal.len(), 1);
        assert!(rulings.vertical.is_empty());
        assert!((rulings.horizontal[0].position - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_short_segment_ignored() {
        let mut rulings = PageRulings::default();
        rulings.add_segment(10.0, 50.0, 15.0, 50.0);
        assert!(rulings.horizontal.is_empty());
    }

    #[test]
    fn test_fill_grid_assigns_by_containment() {
        // 2x2 grid: rows at y 100-150 (top) and 50-100 (bottom),
        // columns at x 10-110 and 110-210
        let row_bounds = vec![50.0, 100.0, 150.0];
        let col_bounds = vec![10.0, 110.0, 210.0];
        let spans = vec![
            span("Name", 20.0, 130.0),
            span("Age", 120.0, 130.0),
            span("Alice", 20.0, 70.0),
            span("30", 120.0, 70.0),
        ];

        let table = fill_grid(1, &row_bounds, &col_bounds, &spans);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.cells[0][0].as_deref(), Some("Name"));
        assert_eq!(table.cells[0][1].as_deref(), Some("Age"));
        assert_eq!(table.cells[1][0].as_deref(), Some("Alice"));
        assert_eq!(table.cells[1][1].as_deref(), Some("30"));
    }

    #[test]
    fn test_fill_grid_empty_cell_is_none() {
        let row_bounds = vec![50.0, 100.0, 150.0];
        let col_bounds = vec![10.0, 110.0, 210.0];
        let spans = vec![span("only", 20.0, 130.0)];

        let table = fill_grid(1, &row_bounds, &col_bounds, &spans);
        assert_eq!(table.cells[0][0].as_deref(), Some("only"));
        assert_eq!(table.cells[0][1], None);
        assert_eq!(table.cells[1][0], None);
    }

    #[test]
    fn test_multiple_spans_in_cell_join() {
        let row_bounds = vec![50.0, 150.0];
        let col_bounds = vec![10.0, 210.0];
        let spans = vec![span("hello", 20.0, 100.0), span("world", 60.0, 100.0)];

        let table = fill_grid(1, &row_bounds, &col_bounds, &spans);
        assert_eq!(table.cells[0][0].as_deref(), Some("hello world"));
    }
}

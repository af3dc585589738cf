//! Structural table detection from text alignment.
//!
//! Stream-mode style: rows are built from span baselines, columns from left
//! edges that line up across rows. No ruling lines are needed, which makes
//! this a cheap way to decide whether a page is worth sending through the
//! raster table detector.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::layout::TextSpan;
use crate::model::BBox;

/// Bucket width for aligning left edges, in points.
const EDGE_BUCKET: f32 = 5.0;
/// How far a span may sit from a column edge and still count as aligned.
const ALIGN_TOLERANCE: f32 = 5.0;

/// A table region found in PDF user space (origin bottom-left).
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// Baseline of the first row
    pub top_y: f32,
    /// Baseline of the last row
    pub bottom_y: f32,
    pub left_x: f32,
    pub right_x: f32,
    /// Column left edges
    pub columns: Vec<f32>,
    pub rows: Vec<TableRowData>,
}

impl DetectedTable {
    /// Bounds `(x0, y_low, x1, y_high)` including glyph ascent and descent.
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        let spans = || self.rows.iter().flat_map(|r| r.spans.iter());
        let high = spans().map(TextSpan::top).fold(self.top_y, f32::max);
        let low = spans().map(TextSpan::bottom).fold(self.bottom_y, f32::min);
        (self.left_x, low, self.right_x, high)
    }

    /// Bounds flipped into a top-left origin frame for a page `page_height` tall.
    pub fn region(&self, page_height: f32) -> BBox {
        let (x0, low, x1, high) = self.bounds();
        BBox::new(x0, page_height - high, x1, page_height - low)
    }
}

/// A row of text spans sharing a baseline.
#[derive(Debug, Clone)]
pub struct TableRowData {
    pub y: f32,
    /// Spans in this row, sorted by X
    pub spans: Vec<TextSpan>,
}

/// Table detector configuration.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
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

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
        }
    }
}

/// Detects tables in a list of text spans.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    /// Create a new table detector with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new table detector with custom configuration.
    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Detect table regions among the given spans.
    pub fn detect(&self, spans: &[TextSpan]) -> Vec<DetectedTable> {
        let cfg = &self.config;
        if spans.len() < cfg.min_rows * cfg.min_columns {
            log::trace!("TableDetector: only {} spans", spans.len());
            return Vec::new();
        }

        let rows = self.group_into_rows(spans);
        let columns = self.detect_columns(&rows);
        log::trace!(
            "TableDetector: {} rows, columns at {:?}",
            rows.len(),
            columns
        );
        if rows.len() < cfg.min_rows || columns.len() < cfg.min_columns {
            return Vec::new();
        }

        let mut tables = Vec::new();
        for (start, end) in self.find_table_regions(&rows, &columns) {
            let table_rows = rows[start..=end].to_vec();
            let table_columns = self.detect_columns(&table_rows);

            if table_columns.len() < cfg.min_columns {
                continue;
            }
            if table_columns.len() > cfg.max_columns {
                log::debug!(
                    "TableDetector: skipping region with {} columns",
                    table_columns.len()
                );
                continue;
            }
            if is_list_pattern(&table_rows, &table_columns) {
                log::debug!("TableDetector: skipping region that reads as a list");
                continue;
            }

            let all_spans = || table_rows.iter().flat_map(|r| r.spans.iter());
            tables.push(DetectedTable {
                top_y: table_rows[0].y,
                bottom_y: table_rows[table_rows.len() - 1].y,
                left_x: all_spans().map(|s| s.x).fold(f32::INFINITY, f32::min),
                right_x: all_spans().map(TextSpan::right).fold(f32::NEG_INFINITY, f32::max),
                columns: table_columns,
                rows: table_rows,
            });
        }
        tables
    }

    /// Group spans into rows by baseline, top of the page first.
    fn group_into_rows(&self, spans: &[TextSpan]) -> Vec<TableRowData> {
        let mut sorted = spans.to_vec();
        sorted.sort_by(|a, b| {
            b.y.partial_cmp(&a.y)
                .unwrap_or(Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
        });

        let mut rows: Vec<TableRowData> = Vec::new();
        let mut current: Vec<TextSpan> = Vec::new();
        let mut anchor_y: Option<f32> = None;

        let flush = |current: &mut Vec<TextSpan>, rows: &mut Vec<TableRowData>| {
            if !current.is_empty() {
                let y = current.iter().map(|s| s.y).sum::<f32>() / current.len() as f32;
                rows.push(TableRowData {
                    y,
                    spans: std::mem::take(current),
                });
            }
        };

        for span in sorted {
            let tolerance = span.font_size * self.config.y_tolerance_factor;
            match anchor_y {
                Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
                _ => {
                    flush(&mut current, &mut rows);
                    anchor_y = Some(span.y);
                    current.push(span);
                }
            }
        }
        flush(&mut current, &mut rows);
        rows
    }

    /// Column left edges shared by enough rows.
    ///
    /// Prefers rows with at least two spans; falls back to all rows when too
    /// few of those exist.
    fn detect_columns(&self, rows: &[TableRowData]) -> Vec<f32> {
        let multi: Vec<&TableRowData> = rows.iter().filter(|r| r.spans.len() >= 2).collect();
        let basis: Vec<&TableRowData> = if multi.len() >= self.config.min_rows {
            multi
        } else {
            rows.iter().collect()
        };
        if basis.is_empty() {
            return Vec::new();
        }

        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        for row in &basis {
            let buckets: HashSet<i32> = row
                .spans
                .iter()
                .map(|s| (s.x / EDGE_BUCKET).round() as i32)
                .collect();
            for bucket in buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((basis.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);
        let mut edges: Vec<f32> = edge_counts
            .into_iter()
            .filter(|(_, count)| *count >= min_occurrences)
            .map(|(bucket, _)| bucket as f32 * EDGE_BUCKET)
            .collect();
        edges.sort_by(f32::total_cmp);

        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(&last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Runs of consecutive aligned rows, as inclusive row index ranges.
    fn find_table_regions(&self, rows: &[TableRowData], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            let aligned = alignment_score(row, columns) >= self.config.min_alignment_ratio;
            match (aligned, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s >= self.config.min_rows {
                        regions.push((s, i - 1));
                    }
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }
        regions
    }
}

/// Fraction of a row's spans that start on a column edge.
fn alignment_score(row: &TableRowData, columns: &[f32]) -> f32 {
    if row.spans.is_empty() || columns.is_empty() {
        return 0.0;
    }
    let aligned = row
        .spans
        .iter()
        .filter(|s| columns.iter().any(|c| (s.x - c).abs() <= ALIGN_TOLERANCE))
        .count();
    aligned as f32 / row.spans.len() as f32
}

/// Numbered or bulleted lists split into marker and text spans look like a
/// two-column table.
fn is_list_pattern(rows: &[TableRowData], columns: &[f32]) -> bool {
    if columns.len() < 2 || rows.is_empty() {
        return false;
    }

    let (mut bullets, mut numbers) = (0usize, 0usize);
    for row in rows {
        let first = row
            .spans
            .iter()
            .min_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
        if let Some(span) = first {
            if is_bullet_marker(&span.text) {
                bullets += 1;
            } else if is_number_marker(&span.text) {
                numbers += 1;
            }
        }
    }

    let n = rows.len() as f32;
    bullets as f32 / n >= 0.5 || (columns.len() == 2 && (bullets + numbers) as f32 / n >= 0.5)
}

fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "※" | "□"
            | "◆" | "◇" | "▶" | "☞" | "➤"
    )
}

/// "1.", "12)", "3", "a.", "B)".
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }
    let body = cleaned
        .strip_suffix('.')
        .or_else(|| cleaned.strip_suffix(')'));
    match body {
        Some(b) => {
            (!b.is_empty() && b.chars().all(|c| c.is_ascii_digit()))
                || (b.chars().count() == 1 && b.chars().all(char::is_alphabetic))
        }
        None => cleaned.chars().all(|c| c.is_ascii_digit()),
    }
}

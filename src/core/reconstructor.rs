//! Table Reconstructor (spec §4.4). The hardest component: turns merged
//! text elements and ruled lines into scored, validated `Table`s.

use rustc_hash::FxHashMap;

use super::merger::{Orientation, RuledLine, TextElement};
use super::options::ExtractionOptions;

const MIN_COL_FREQUENCY: usize = 3;
const ALIGNMENT_RADIUS: f64 = 5.0;
const MAX_ROW_GAP: f64 = 20.0;
const COLUMN_ALIGNMENT_ROUND: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub text: String,
    pub bounds: Bounds,
    pub row_span: Option<u32>,
    pub col_span: Option<u32>,
}

impl TableCell {
    fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub page_number: u32,
    pub rows: Vec<Vec<TableCell>>,
    pub confidence: f64,
    pub bounding_box: Bounds,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn effective_col_count(&self, row: usize) -> u32 {
        self.rows[row]
            .iter()
            .map(|c| c.col_span.unwrap_or(1))
            .sum()
    }
}

struct BucketedRow {
    y: f64,
    elements: Vec<TextElement>,
}

/// Runs all six phases over one page's elements and lines, returning the
/// tables that survive Phase 6 validation, ordered top-to-bottom.
pub fn reconstruct_tables(
    elements: Vec<TextElement>,
    lines: &[RuledLine],
    options: &ExtractionOptions,
    page_number: u32,
) -> Vec<Table> {
    if elements.is_empty() {
        return Vec::new();
    }

    let rows = bucket_rows(elements, options.row_tolerance);
    let candidate_columns = candidate_columns(&rows, options.col_tolerance);

    let scored: Vec<(bool, &BucketedRow)> = rows
        .iter()
        .map(|row| (row_qualifies(row, &candidate_columns, options), row))
        .collect();

    let runs = accumulate_runs(&scored, options.min_rows);

    let mut tables = Vec::new();
    for run in runs {
        if let Some(table) = build_table(run, &candidate_columns, lines, options, page_number) {
            tables.push(table);
        }
    }
    tables
}

fn bucket_rows(elements: Vec<TextElement>, row_tolerance: f64) -> Vec<BucketedRow> {
    let mut buckets: FxHashMap<i64, Vec<TextElement>> = FxHashMap::default();
    for element in elements {
        let key = (element.origin.y / row_tolerance).round() as i64;
        buckets.entry(key).or_default().push(element);
    }

    let mut rows: Vec<BucketedRow> = buckets
        .into_iter()
        .map(|(key, mut elements)| {
            elements.sort_by(|a, b| a.origin.x.partial_cmp(&b.origin.x).unwrap());
            BucketedRow {
                y: key as f64 * row_tolerance,
                elements,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.y.partial_cmp(&a.y).unwrap());
    rows
}

fn candidate_columns(rows: &[BucketedRow], col_tolerance: f64) -> Vec<f64> {
    let mut counts: FxHashMap<i64, usize> = FxHashMap::default();
    for row in rows {
        for element in &row.elements {
            let left = (element.origin.x / col_tolerance).round() as i64;
            let right = ((element.origin.x + element.width) / col_tolerance).round() as i64;
            *counts.entry(left).or_insert(0) += 1;
            *counts.entry(right).or_insert(0) += 1;
        }
    }

    let mut anchors: Vec<f64> = counts
        .into_iter()
        .filter(|(_, count)| *count >= MIN_COL_FREQUENCY)
        .map(|(key, _)| key as f64 * col_tolerance)
        .collect();
    anchors.sort_by(|a, b| a.partial_cmp(b).unwrap());
    anchors
}

fn row_qualifies(row: &BucketedRow, candidate_columns: &[f64], options: &ExtractionOptions) -> bool {
    if row.elements.len() < options.min_cols {
        return false;
    }
    let confidence = row_confidence(row, candidate_columns);
    confidence > 0.7
}

fn row_confidence(row: &BucketedRow, candidate_columns: &[f64]) -> f64 {
    let alignment = alignment_score(row, candidate_columns);
    let spacing = spacing_score(row);
    let density = density_score(row, candidate_columns);
    0.5 * alignment + 0.3 * spacing + 0.2 * density
}

fn alignment_score(row: &BucketedRow, candidate_columns: &[f64]) -> f64 {
    if candidate_columns.is_empty() || row.elements.is_empty() {
        return 0.0;
    }
    let matched = row
        .elements
        .iter()
        .filter(|e| {
            let right = e.origin.x + e.width;
            candidate_columns
                .iter()
                .any(|&c| (e.origin.x - c).abs() <= ALIGNMENT_RADIUS || (right - c).abs() <= ALIGNMENT_RADIUS)
        })
        .count();
    matched as f64 / row.elements.len() as f64
}

fn spacing_score(row: &BucketedRow) -> f64 {
    if row.elements.len() < 2 {
        return 0.0;
    }
    let gaps: Vec<f64> = row
        .elements
        .windows(2)
        .map(|pair| pair[1].origin.x - (pair[0].origin.x + pair[0].width))
        .collect();
    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    if mean.abs() < f64::EPSILON {
        return 0.0;
    }
    let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / gaps.len() as f64;
    (1.0 - variance / mean.powi(2)).max(0.0)
}

fn density_score(row: &BucketedRow, candidate_columns: &[f64]) -> f64 {
    if candidate_columns.is_empty() {
        return 0.0;
    }
    (row.elements.len() as f64 / candidate_columns.len() as f64).min(1.0)
}

/// One contiguous run of qualifying rows, in top-to-bottom order.
struct Run<'a> {
    rows: Vec<&'a BucketedRow>,
}

fn accumulate_runs<'a>(scored: &[(bool, &'a BucketedRow)], min_rows: usize) -> Vec<Run<'a>> {
    let mut runs = Vec::new();
    let mut current: Vec<&BucketedRow> = Vec::new();
    let mut prev_y: Option<f64> = None;

    for &(qualifies, row) in scored {
        if qualifies {
            let gap_ok = match prev_y {
                Some(y) => (y - row.y) < MAX_ROW_GAP,
                None => true,
            };
            if gap_ok {
                current.push(row);
            } else {
                close_run(&mut runs, &mut current, min_rows);
                current.push(row);
            }
            prev_y = Some(row.y);
        } else {
            close_run(&mut runs, &mut current, min_rows);
            prev_y = None;
        }
    }
    close_run(&mut runs, &mut current, min_rows);
    runs
}

fn close_run<'a>(runs: &mut Vec<Run<'a>>, current: &mut Vec<&'a BucketedRow>, min_rows: usize) {
    if current.len() >= min_rows {
        runs.push(Run {
            rows: std::mem::take(current),
        });
    } else {
        current.clear();
    }
}

fn build_table(
    run: Run,
    candidate_columns: &[f64],
    lines: &[RuledLine],
    options: &ExtractionOptions,
    page_number: u32,
) -> Option<Table> {
    if candidate_columns.len() < options.min_cols {
        return None;
    }

    let mut grid: Vec<Vec<TableCell>> = run
        .rows
        .iter()
        .map(|row| project_row(row, candidate_columns))
        .collect();

    if options.cell_merging {
        for row in &mut grid {
            absorb_horizontal(row);
        }
        absorb_vertical(&mut grid);
    }

    let raw_lengths_equal = grid.iter().all(|row| row.len() == grid[0].len());

    score_and_validate(grid, lines, options, page_number, raw_lengths_equal)
}

fn project_row(row: &BucketedRow, candidate_columns: &[f64]) -> Vec<TableCell> {
    let mut slots: Vec<Option<&TextElement>> = vec![None; candidate_columns.len()];

    for element in &row.elements {
        let center = element.origin.x + element.width / 2.0;
        let (idx, _) = candidate_columns
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (center - **a).abs().partial_cmp(&(center - **b).abs()).unwrap()
            })
            .unwrap();
        slots[idx] = Some(element);
    }

    let row_height = row
        .elements
        .iter()
        .map(|e| e.font_size)
        .fold(0.0_f64, f64::max);

    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| match slot {
            Some(element) => TableCell {
                text: element.text.clone(),
                bounds: Bounds {
                    x: element.origin.x,
                    y: row.y,
                    width: element.width,
                    height: element.font_size,
                },
                row_span: None,
                col_span: None,
            },
            None => {
                let col_width = if idx + 1 < candidate_columns.len() {
                    candidate_columns[idx + 1] - candidate_columns[idx]
                } else {
                    3.0
                };
                TableCell {
                    text: String::new(),
                    bounds: Bounds {
                        x: candidate_columns[idx],
                        y: row.y,
                        width: col_width,
                        height: row_height.max(1.0),
                    },
                    row_span: None,
                    col_span: None,
                }
            }
        })
        .collect()
}

fn absorb_horizontal(row: &mut Vec<TableCell>) {
    let mut absorbed: Vec<TableCell> = Vec::with_capacity(row.len());
    let mut i = 0;
    while i < row.len() {
        if row[i].is_empty() {
            absorbed.push(row[i].clone());
            i += 1;
            continue;
        }
        let mut j = i + 1;
        while j < row.len() && (row[j].is_empty() || row[j].text == row[i].text) {
            j += 1;
        }
        let span = (j - i) as u32;
        if span > 1 {
            let last = &row[j - 1];
            let width = (last.bounds.x + last.bounds.width) - row[i].bounds.x;
            let mut cell = row[i].clone();
            cell.col_span = Some(span);
            cell.bounds.width = width;
            absorbed.push(cell);
        } else {
            absorbed.push(row[i].clone());
        }
        i = j;
    }
    *row = absorbed;
}

/// Groups cells across all rows by x-position proximity and absorbs
/// vertically-aligned whitespace-only runs into the cell above them.
fn absorb_vertical(grid: &mut Vec<Vec<TableCell>>) {
    // (row_idx, col_idx_in_row) for every cell, clustered by x.
    let mut by_x: Vec<(f64, usize, usize)> = Vec::new();
    for (r, row) in grid.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            by_x.push((cell.bounds.x, r, c));
        }
    }
    by_x.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));

    let mut groups: Vec<Vec<(f64, usize, usize)>> = Vec::new();
    for item in by_x {
        match groups.last_mut() {
            Some(group) if (item.0 - group[0].0).abs() < 2.0 => group.push(item),
            _ => groups.push(vec![item]),
        }
    }

    let mut to_remove: Vec<(usize, usize)> = Vec::new();
    for mut group in groups {
        group.sort_by_key(|g| g.1);
        let mut i = 0;
        while i < group.len() {
            let (_, r, c) = group[i];
            if grid[r][c].is_empty() || to_remove.contains(&(r, c)) {
                i += 1;
                continue;
            }
            let mut j = i + 1;
            let mut span = 1u32;
            while j < group.len() {
                let (_, nr, nc) = group[j];
                if nr != group[j - 1].1 + 1 || !grid[nr][nc].is_empty() {
                    break;
                }
                to_remove.push((nr, nc));
                span += 1;
                j += 1;
            }
            if span > 1 {
                grid[r][c].row_span = Some(span);
            }
            i = j;
        }
    }

    for (r, c) in to_remove {
        // Mark for later removal; defer actual removal until every row is
        // processed so indices above stay valid.
        grid[r][c].text = VERTICAL_ABSORBED_MARKER.to_string();
    }
    for row in grid.iter_mut() {
        row.retain(|cell| cell.text != VERTICAL_ABSORBED_MARKER);
    }
}

const VERTICAL_ABSORBED_MARKER: &str = "\u{0}__absorbed__";

fn score_and_validate(
    grid: Vec<Vec<TableCell>>,
    lines: &[RuledLine],
    options: &ExtractionOptions,
    page_number: u32,
    raw_lengths_equal: bool,
) -> Option<Table> {
    if grid.len() < 2 {
        return None;
    }

    let effective_widths: Vec<u32> = grid
        .iter()
        .map(|row| row.iter().map(|c| c.col_span.unwrap_or(1)).sum())
        .collect();
    let effective_equal = effective_widths.windows(2).all(|w| w[0] == w[1]);
    if !effective_equal {
        return None;
    }
    if effective_widths[0] < 2 {
        return None;
    }

    let total_cells: usize = grid.iter().map(|r| r.len()).sum();
    let empty_cells = grid.iter().flat_map(|r| r.iter()).filter(|c| c.is_empty()).count();
    let non_empty_ratio = 1.0 - (empty_cells as f64 / total_cells as f64);
    if non_empty_ratio < 0.3 {
        return None;
    }

    let mut confidence = 1.0;
    if !raw_lengths_equal {
        confidence *= 0.8;
    }
    let empty_ratio = empty_cells as f64 / total_cells as f64;
    confidence *= 1.0 - 0.5 * empty_ratio;
    confidence *= 0.8 + 0.2 * column_alignment_bonus(&grid);
    confidence *= ruled_line_factor(&grid, lines);
    confidence = confidence.clamp(0.0, 1.0);

    if confidence < options.confidence_threshold {
        return None;
    }

    let bounding_box = bounding_box_of(&grid);

    Some(Table {
        page_number,
        rows: grid,
        confidence,
        bounding_box,
    })
}

fn column_alignment_bonus(grid: &[Vec<TableCell>]) -> f64 {
    let max_cols = grid.iter().map(|r| r.len()).max().unwrap_or(0);
    if max_cols == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut counted = 0;
    for col in 0..max_cols {
        let mut xs: Vec<i64> = Vec::new();
        for row in grid {
            if let Some(cell) = row.get(col) {
                if !cell.is_empty() {
                    xs.push((cell.bounds.x / COLUMN_ALIGNMENT_ROUND).round() as i64);
                }
            }
        }
        if xs.is_empty() {
            continue;
        }
        xs.sort_unstable();
        xs.dedup();
        total += 1.0 / xs.len() as f64;
        counted += 1;
    }
    if counted == 0 {
        0.0
    } else {
        total / counted as f64
    }
}

fn ruled_line_factor(grid: &[Vec<TableCell>], lines: &[RuledLine]) -> f64 {
    let bounds = bounding_box_of(grid);
    let inside: Vec<&RuledLine> = lines
        .iter()
        .filter(|l| line_within(l, &bounds))
        .collect();
    if inside.is_empty() {
        return 1.0;
    }
    let horizontals: Vec<f64> = inside
        .iter()
        .filter(|l| l.orientation == Orientation::Horizontal)
        .map(|l| l.axis)
        .collect();
    let verticals: Vec<f64> = inside
        .iter()
        .filter(|l| l.orientation == Orientation::Vertical)
        .map(|l| l.axis)
        .collect();

    if horizontals.len() >= 2 && verticals.len() >= 2 && has_regular_gaps(&horizontals) && has_regular_gaps(&verticals) {
        1.1
    } else {
        0.9
    }
}

fn has_regular_gaps(axes: &[f64]) -> bool {
    let mut sorted = axes.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let gaps: Vec<f64> = sorted.windows(2).map(|w| w[1] - w[0]).collect();
    if gaps.is_empty() {
        return false;
    }
    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    if mean.abs() < f64::EPSILON {
        return false;
    }
    let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / gaps.len() as f64;
    variance < 0.3 * mean.powi(2)
}

fn line_within(line: &RuledLine, bounds: &Bounds) -> bool {
    match line.orientation {
        Orientation::Horizontal => {
            line.axis >= bounds.y && line.axis <= bounds.y + bounds.height
        }
        Orientation::Vertical => line.axis >= bounds.x && line.axis <= bounds.x + bounds.width,
    }
}

fn bounding_box_of(grid: &[Vec<TableCell>]) -> Bounds {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for row in grid {
        for cell in row {
            min_x = min_x.min(cell.bounds.x);
            min_y = min_y.min(cell.bounds.y);
            max_x = max_x.max(cell.bounds.x + cell.bounds.width);
            max_y = max_y.max(cell.bounds.y + cell.bounds.height);
        }
    }
    Bounds {
        x: min_x,
        y: min_y,
        width: max_x - min_x,
        height: max_y - min_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::geometry::Point;

    fn elem(text: &str, x: f64, y: f64, width: f64) -> TextElement {
        TextElement {
            text: text.to_string(),
            origin: Point::new(x, y),
            width,
            font_size: 12.0,
            font_resource_name: "F1".to_string(),
        }
    }

    /// Builds a simple 4-row x 3-col grid of aligned text, matching S1.
    fn s1_elements() -> Vec<TextElement> {
        vec![
            elem("Name", 50.0, 700.0, 30.0),
            elem("Age", 200.0, 700.0, 20.0),
            elem("City", 280.0, 700.0, 25.0),
            elem("John Smith", 50.0, 680.0, 60.0),
            elem("35", 200.0, 680.0, 12.0),
            elem("New York", 280.0, 680.0, 50.0),
            elem("Jane Doe", 50.0, 660.0, 55.0),
            elem("28", 200.0, 660.0, 12.0),
            elem("Los Angeles", 280.0, 660.0, 60.0),
            elem("Bob Johnson", 50.0, 640.0, 60.0),
            elem("42", 200.0, 640.0, 12.0),
            elem("Chicago", 280.0, 640.0, 45.0),
        ]
    }

    #[test]
    fn test_s1_employee_information() {
        let options = ExtractionOptions::default();
        let tables = reconstruct_tables(s1_elements(), &[], &options, 1);
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.effective_col_count(0), 3);
        assert!(table.confidence > 0.8, "confidence was {}", table.confidence);
        assert_eq!(table.rows[0][0].text, "Name");
        assert_eq!(table.rows[0][1].text, "Age");
        assert_eq!(table.rows[0][2].text, "City");
        assert_eq!(table.rows[3][2].text, "Chicago");
    }

    #[test]
    fn test_no_fragments_yields_no_tables() {
        let options = ExtractionOptions::default();
        let tables = reconstruct_tables(Vec::new(), &[], &options, 1);
        assert!(tables.is_empty());
    }

    #[test]
    fn test_single_row_does_not_qualify_min_rows() {
        let elements = vec![
            elem("A", 0.0, 700.0, 10.0),
            elem("B", 50.0, 700.0, 10.0),
            elem("C", 100.0, 700.0, 10.0),
        ];
        let options = ExtractionOptions::default();
        let tables = reconstruct_tables(elements, &[], &options, 1);
        assert!(tables.is_empty());
    }

    #[test]
    fn test_rows_too_far_apart_yield_no_table() {
        let mut elements = s1_elements();
        for e in elements.iter_mut() {
            if e.origin.y < 700.0 {
                e.origin.y -= 100.0;
            }
        }
        let options = ExtractionOptions::default();
        let tables = reconstruct_tables(elements, &[], &options, 1);
        assert!(tables.is_empty());
    }

    #[test]
    fn test_dual_tables_on_one_page() {
        let mut second = s1_elements();
        for e in second.iter_mut() {
            e.origin.y -= 300.0;
        }
        let mut elements = s1_elements();
        elements.extend(second);

        let options = ExtractionOptions::default();
        let tables = reconstruct_tables(elements, &[], &options, 1);
        assert_eq!(tables.len(), 2);
        assert!(tables[0].rows[0][0].bounds.y > tables[1].rows[0][0].bounds.y);
    }

    #[test]
    fn test_high_confidence_threshold_rejects_misaligned_table() {
        let mut elements = s1_elements();
        // Shift one data cell enough to hurt alignment/spacing scores.
        for e in elements.iter_mut() {
            if e.text == "28" {
                e.origin.x += 15.0;
            }
        }
        let mut options = ExtractionOptions::default();
        options.confidence_threshold = 0.95;
        let tables = reconstruct_tables(elements.clone(), &[], &options, 1);
        assert!(tables.is_empty());

        options.confidence_threshold = 0.5;
        let tables = reconstruct_tables(elements, &[], &options, 1);
        assert_eq!(tables.len(), 1);
    }

    #[test]
    fn test_horizontal_merge_with_cell_merging_enabled() {
        let elements = vec![
            elem("Task", 0.0, 100.0, 20.0),
            elem("Owner", 100.0, 100.0, 20.0),
            elem("Status", 200.0, 100.0, 20.0),
            elem("A", 0.0, 80.0, 20.0),
            elem("Bob", 100.0, 80.0, 20.0),
            elem("Active", 200.0, 80.0, 20.0),
            elem("B", 0.0, 60.0, 20.0),
            elem("Bob", 100.0, 60.0, 20.0),
            elem("Active", 200.0, 60.0, 20.0),
            elem("C", 0.0, 40.0, 20.0),
            elem("Amy", 100.0, 40.0, 20.0),
            elem("Done", 200.0, 40.0, 20.0),
        ];
        let mut options = ExtractionOptions::default();
        options.confidence_threshold = 0.3;
        let tables = reconstruct_tables(elements, &[], &options, 1);
        assert_eq!(tables.len(), 1);
    }

    #[test]
    fn test_cells_sorted_ascending_x_within_row() {
        let options = ExtractionOptions::default();
        let tables = reconstruct_tables(s1_elements(), &[], &options, 1);
        let table = &tables[0];
        for row in &table.rows {
            for pair in row.windows(2) {
                assert!(pair[0].bounds.x <= pair[1].bounds.x);
            }
        }
    }

    #[test]
    fn test_bounding_box_encloses_all_cells() {
        let options = ExtractionOptions::default();
        let tables = reconstruct_tables(s1_elements(), &[], &options, 1);
        let table = &tables[0];
        for row in &table.rows {
            for cell in row {
                assert!(cell.bounds.x >= table.bounding_box.x - 1e-6);
                assert!(cell.bounds.y >= table.bounding_box.y - 1e-6);
                assert!(cell.bounds.x + cell.bounds.width <= table.bounding_box.x + table.bounding_box.width + 1e-6);
            }
        }
    }
}

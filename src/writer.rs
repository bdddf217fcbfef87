//! Workbook-writing collaborator: serializes [`Table`]s to CSV, one file
//! per table.

use std::fmt;
use std::path::Path;

use crate::core::Table;

/// Errors from writing tables to disk. Kept separate from [`crate::core::PDFError`]
/// since these are filesystem/CSV-encoding failures, not content-stream parsing
/// failures, and the core's four-kind taxonomy has no variant that fits either.
#[derive(Debug)]
pub enum WriterError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl fmt::Display for WriterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriterError::Io(e) => write!(f, "could not write table output: {}", e),
            WriterError::Csv(e) => write!(f, "could not encode table as CSV: {}", e),
        }
    }
}

impl std::error::Error for WriterError {}

impl From<std::io::Error> for WriterError {
    fn from(e: std::io::Error) -> Self {
        WriterError::Io(e)
    }
}

impl From<csv::Error> for WriterError {
    fn from(e: csv::Error) -> Self {
        WriterError::Csv(e)
    }
}

pub type WriterResult<T> = Result<T, WriterError>;

/// Writes each table to `{output_dir}/page-{page_number}-table-{index}.csv`,
/// expanding `row_span`/`col_span` by repeating the cell's text so every
/// output row has the same column count.
pub fn write_tables_csv(tables: &[Table], output_dir: impl AsRef<Path>) -> WriterResult<Vec<String>> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;

    let mut written = Vec::with_capacity(tables.len());
    for (index, table) in tables.iter().enumerate() {
        let file_name = format!("page-{}-table-{}.csv", table.page_number, index + 1);
        let path = output_dir.join(&file_name);
        write_one_table(table, &path)?;
        written.push(file_name);
    }
    Ok(written)
}

/// A `row_span` cell still owed to rows below the one it was read from.
struct CarriedCell {
    x: f64,
    text: String,
    col_span: u32,
    rows_left: u32,
}

fn write_one_table(table: &Table, path: &Path) -> WriterResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut carried: Vec<CarriedCell> = Vec::new();

    for row in &table.rows {
        let mut slots: Vec<(f64, &str, u32)> = row
            .iter()
            .map(|cell| (cell.bounds.x, cell.text.as_str(), cell.col_span.unwrap_or(1).max(1)))
            .collect();
        for carry in &carried {
            if carry.rows_left > 0 {
                slots.push((carry.x, carry.text.as_str(), carry.col_span));
            }
        }
        slots.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut record: Vec<String> = Vec::new();
        for (_, text, span) in &slots {
            for _ in 0..*span {
                record.push(text.to_string());
            }
        }
        writer.write_record(&record)?;

        for carry in &mut carried {
            if carry.rows_left > 0 {
                carry.rows_left -= 1;
            }
        }
        carried.retain(|carry| carry.rows_left > 0);
        for cell in row {
            if let Some(span) = cell.row_span {
                if span > 1 {
                    carried.push(CarriedCell {
                        x: cell.bounds.x,
                        text: cell.text.clone(),
                        col_span: cell.col_span.unwrap_or(1).max(1),
                        rows_left: span - 1,
                    });
                }
            }
        }
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Bounds;
    use crate::core::TableCell;

    fn cell_at(text: &str, x: f64, col_span: Option<u32>, row_span: Option<u32>) -> TableCell {
        TableCell {
            text: text.to_string(),
            bounds: Bounds { x, y: 0.0, width: 10.0, height: 10.0 },
            row_span,
            col_span,
        }
    }

    #[test]
    fn test_writes_one_file_per_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table {
            page_number: 1,
            rows: vec![
                vec![cell_at("Name", 0.0, None, None), cell_at("Age", 10.0, None, None)],
                vec![cell_at("Jane", 0.0, None, None), cell_at("28", 10.0, None, None)],
            ],
            confidence: 0.9,
            bounding_box: Bounds { x: 0.0, y: 0.0, width: 100.0, height: 40.0 },
        };
        let files = write_tables_csv(&[table], dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0], "page-1-table-1.csv");

        let contents = std::fs::read_to_string(dir.path().join(&files[0])).unwrap();
        assert!(contents.contains("Name,Age"));
        assert!(contents.contains("Jane,28"));
    }

    #[test]
    fn test_col_span_repeats_cell_text() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table {
            page_number: 1,
            rows: vec![vec![cell_at("Merged", 0.0, Some(2), None), cell_at("Right", 20.0, None, None)]],
            confidence: 0.9,
            bounding_box: Bounds { x: 0.0, y: 0.0, width: 100.0, height: 10.0 },
        };
        let files = write_tables_csv(&[table], dir.path()).unwrap();
        let contents = std::fs::read_to_string(dir.path().join(&files[0])).unwrap();
        assert!(contents.contains("Merged,Merged,Right"));
    }

    #[test]
    fn test_row_span_repeats_cell_into_covered_rows() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table {
            page_number: 1,
            rows: vec![
                vec![cell_at("Region", 0.0, None, Some(2)), cell_at("Q1", 10.0, None, None)],
                vec![cell_at("Q2", 10.0, None, None)],
            ],
            confidence: 0.9,
            bounding_box: Bounds { x: 0.0, y: 0.0, width: 100.0, height: 20.0 },
        };
        let files = write_tables_csv(&[table], dir.path()).unwrap();
        let contents = std::fs::read_to_string(dir.path().join(&files[0])).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "Region,Q1");
        assert_eq!(lines[1], "Region,Q2");
    }
}

//! CSV table reader with shape and value validation.

use std::path::{Path, PathBuf};

use grove_rf::{Dimensions, Table};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads a numeric table whose last column is a 0/1 label.
///
/// Expected CSV format:
/// - One header row, skipped
/// - `feature1,feature2,...,featureN,label`
/// - Every row has the same number of columns
///
/// Without explicit dimensions the column count comes from the header and
/// every data row is read. With [`TableReader::with_dimensions`] only the
/// first `rows` data rows are read and each must hold exactly `cols` cells.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has a different column count |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
/// | [`IoError::TooFewRows`] | Fewer data rows than explicitly requested |
/// | [`IoError::InvalidTable`] | Values fail table validation (e.g. non-binary label) |
#[derive(Debug, Clone)]
pub struct TableReader {
    path: PathBuf,
    dims: Option<Dimensions>,
}

impl TableReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            dims: None,
        }
    }

    /// Bypass dimension inference with explicit row and column counts.
    #[must_use]
    pub fn with_dimensions(mut self, rows: usize, cols: usize) -> Self {
        self.dims = Some(Dimensions::new(rows, cols));
        self
    }

    /// Read and validate the CSV file, returning a [`Table`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Table, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets short or long rows reach the InconsistentRowLength check.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?;
        let expected_cols = self.dims.map_or(header.len(), |d| d.cols);
        let row_limit = self.dims.map(|d| d.rows);
        debug!(expected_cols, ?row_limit, "read CSV header");

        let mut values = Vec::new();
        let mut n_rows = 0usize;

        for (row_index, result) in rdr.records().enumerate() {
            if row_limit.is_some_and(|limit| n_rows == limit) {
                break;
            }
            let record = result.map_err(|e| self.csv_error(e))?;

            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: expected_cols,
                    got: record.len(),
                });
            }

            for (col_index, raw) in record.iter().enumerate() {
                let value = raw
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| IoError::NonFiniteValue {
                        path: self.path.clone(),
                        row_index,
                        col_index,
                        raw: raw.to_string(),
                    })?;
                values.push(value);
            }
            n_rows += 1;
        }

        if n_rows == 0 {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }
        if let Some(requested) = row_limit
            && n_rows < requested
        {
            return Err(IoError::TooFewRows {
                path: self.path.clone(),
                requested,
                found: n_rows,
            });
        }

        let dims = Dimensions::new(n_rows, expected_cols);
        let table = Table::new(values, dims).map_err(|e| IoError::InvalidTable {
            path: self.path.clone(),
            source: e,
        })?;
        info!(%dims, "table loaded");
        Ok(table)
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use grove_rf::{BinaryLabel, RfError};
    use tempfile::NamedTempFile;

    use super::*;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn valid_csv_infers_dimensions() {
        let f = write_csv("a,b,label\n1.0,2.0,0\n3.0,4.0,1\n5.0,6.0,1\n");
        let table = TableReader::new(f.path()).read().unwrap();
        assert_eq!(table.dims(), Dimensions::new(3, 3));
        assert_eq!(table.row(1), &[3.0, 4.0, 1.0]);
        assert_eq!(table.label(0), BinaryLabel::Zero);
    }

    #[test]
    fn explicit_dimensions_limit_rows() {
        let f = write_csv("a,b,label\n1,2,0\n3,4,1\n5,6,1\n");
        let table = TableReader::new(f.path())
            .with_dimensions(2, 3)
            .read()
            .unwrap();
        assert_eq!(table.rows(), 2);
        assert!((table.checksum() - 11.0).abs() < 1e-12);
    }

    #[test]
    fn explicit_dimensions_beyond_file() {
        let f = write_csv("a,b,label\n1,2,0\n");
        let err = TableReader::new(f.path())
            .with_dimensions(5, 3)
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::TooFewRows { requested: 5, found: 1, .. }));
    }

    #[test]
    fn explicit_column_count_mismatch() {
        let f = write_csv("a,b,label\n1,2,0\n");
        let err = TableReader::new(f.path())
            .with_dimensions(1, 4)
            .read()
            .unwrap_err();
        assert!(matches!(
            err,
            IoError::InconsistentRowLength { expected: 4, got: 3, .. }
        ));
    }

    #[test]
    fn file_not_found() {
        let err = TableReader::new(Path::new("/nonexistent/table.csv"))
            .read()
            .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }

    #[test]
    fn header_only_is_empty() {
        let f = write_csv("a,b,label\n");
        let err = TableReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::EmptyDataset { .. }));
    }

    #[test]
    fn ragged_row_rejected() {
        let f = write_csv("a,b,label\n1,2,0\n3,1\n");
        let err = TableReader::new(f.path()).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::InconsistentRowLength { row_index: 1, expected: 3, got: 2, .. }
        ));
    }

    #[test]
    fn non_numeric_cell_rejected() {
        let f = write_csv("a,b,label\n1,x,0\n");
        let err = TableReader::new(f.path()).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::NonFiniteValue { row_index: 0, col_index: 1, ref raw, .. } if raw == "x"
        ));
    }

    #[test]
    fn infinite_cell_rejected() {
        let f = write_csv("a,b,label\n1,inf,0\n");
        let err = TableReader::new(f.path()).read().unwrap_err();
        assert!(matches!(err, IoError::NonFiniteValue { col_index: 1, .. }));
    }

    #[test]
    fn non_binary_label_rejected() {
        let f = write_csv("a,label\n1,0\n2,3\n");
        let err = TableReader::new(f.path()).read().unwrap_err();
        assert!(matches!(
            err,
            IoError::InvalidTable {
                source: RfError::NonBinaryLabel { row: 1, .. },
                ..
            }
        ));
    }
}

//! Row-major dataset table and training views over it.

use std::fmt;
use std::ops::Range;

use crate::error::RfError;

/// Row and column counts of a table. `cols` includes the trailing label column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns, label included.
    pub cols: usize,
}

impl Dimensions {
    /// Create dimensions from row and column counts.
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Number of feature columns (every column but the label).
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.cols.saturating_sub(1)
    }

    /// Index of the label column.
    #[must_use]
    pub fn label_col(&self) -> usize {
        self.cols - 1
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// A class label of a binary classification problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum BinaryLabel {
    /// Label `0`.
    Zero,
    /// Label `1`.
    One,
}

impl BinaryLabel {
    /// Interpret a label-column value. Only exactly `0.0` and `1.0` are labels.
    #[must_use]
    pub fn from_value(value: f64) -> Option<Self> {
        if value == 0.0 {
            Some(Self::Zero)
        } else if value == 1.0 {
            Some(Self::One)
        } else {
            None
        }
    }

    /// Return `0` or `1`.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }
}

impl fmt::Display for BinaryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// An immutable row-major table whose last column is a binary label.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    values: Vec<f64>,
    labels: Vec<BinaryLabel>,
    dims: Dimensions,
}

impl Table {
    /// Validate a row-major value buffer and wrap it as a table.
    ///
    /// # Errors
    ///
    /// | Variant                       | When                                 |
    /// |-------------------------------|--------------------------------------|
    /// | [`RfError::EmptyDataset`]     | `dims.rows` is zero                  |
    /// | [`RfError::TooFewColumns`]    | `dims.cols` < 2                      |
    /// | [`RfError::ShapeMismatch`]    | `values.len() != rows * cols`        |
    /// | [`RfError::NonFiniteValue`]   | any value is NaN or infinite         |
    /// | [`RfError::NonBinaryLabel`]   | a label is neither 0 nor 1           |
    pub fn new(values: Vec<f64>, dims: Dimensions) -> Result<Self, RfError> {
        if dims.rows == 0 {
            return Err(RfError::EmptyDataset);
        }
        if dims.cols < 2 {
            return Err(RfError::TooFewColumns { cols: dims.cols });
        }
        let expected = dims.rows * dims.cols;
        if values.len() != expected {
            return Err(RfError::ShapeMismatch {
                rows: dims.rows,
                cols: dims.cols,
                expected,
                got: values.len(),
            });
        }

        let mut labels = Vec::with_capacity(dims.rows);
        for (row, chunk) in values.chunks_exact(dims.cols).enumerate() {
            if let Some(col) = chunk.iter().position(|v| !v.is_finite()) {
                return Err(RfError::NonFiniteValue { row, col });
            }
            let value = chunk[dims.label_col()];
            let label =
                BinaryLabel::from_value(value).ok_or(RfError::NonBinaryLabel { row, value })?;
            labels.push(label);
        }

        Ok(Self {
            values,
            labels,
            dims,
        })
    }

    /// Build a table from per-row vectors. Every row must hold `cols` values.
    ///
    /// # Errors
    ///
    /// Same as [`Table::new`]; a ragged row yields [`RfError::ShapeMismatch`].
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, RfError> {
        let cols = rows.first().map_or(0, Vec::len);
        let dims = Dimensions::new(rows.len(), cols);
        let values: Vec<f64> = rows.iter().flatten().copied().collect();
        if rows.iter().any(|r| r.len() != cols) {
            return Err(RfError::ShapeMismatch {
                rows: dims.rows,
                cols,
                expected: dims.rows * cols,
                got: values.len(),
            });
        }
        Self::new(values, dims)
    }

    /// Return the table dimensions.
    #[must_use]
    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    /// Return the number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.dims.rows
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.dims.n_features()
    }

    /// Return one full row, label included.
    #[must_use]
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.dims.cols;
        &self.values[start..start + self.dims.cols]
    }

    /// Return a single cell.
    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.dims.cols + col]
    }

    /// Return the label of a row.
    #[must_use]
    pub fn label(&self, row: usize) -> BinaryLabel {
        self.labels[row]
    }

    /// Sum of every value in the table.
    #[must_use]
    pub fn checksum(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// The rows of a table that a forest may train on.
#[derive(Debug, Clone)]
pub struct TrainingView<'a> {
    table: &'a Table,
    rows: Vec<usize>,
}

impl<'a> TrainingView<'a> {
    /// A view over every row of `table`.
    #[must_use]
    pub fn all(table: &'a Table) -> Self {
        Self {
            table,
            rows: (0..table.rows()).collect(),
        }
    }

    /// A view over every row of `table` outside `held_out`.
    #[must_use]
    pub fn excluding(table: &'a Table, held_out: Range<usize>) -> Self {
        let rows = (0..table.rows())
            .filter(|r| !held_out.contains(r))
            .collect();
        Self { table, rows }
    }

    /// Return the underlying table.
    #[must_use]
    pub fn table(&self) -> &'a Table {
        self.table
    }

    /// Return the table row indices in this view, ascending.
    #[must_use]
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Return the number of rows in this view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Return `true` when the view holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

use grove_comm::GroupError;

/// Errors from Random Forest operations.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    /// Returned when n_estimators is zero.
    #[error("n_estimators must be at least 1, got {n_estimators}")]
    InvalidTreeCount {
        /// The invalid n_estimators value provided.
        n_estimators: usize,
    },

    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned when min_samples_leaf is zero.
    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// The invalid min_samples_leaf value provided.
        min_samples_leaf: usize,
    },

    /// Returned when max_features is zero.
    #[error("max_features must be at least 1, got {max_features}")]
    InvalidMaxFeatures {
        /// The invalid max_features value provided.
        max_features: usize,
    },

    /// Returned when k_folds is less than 2.
    #[error("k_folds must be at least 2, got {k_folds}")]
    InvalidFoldCount {
        /// The invalid k_folds value provided.
        k_folds: usize,
    },

    /// Returned when a hyperparameter grid has no tree counts or no depths.
    #[error("hyperparameter grid is empty")]
    EmptyGrid,

    /// Returned when the dataset has fewer rows than folds.
    #[error("{rows} rows cannot fill {k_folds} folds")]
    TooFewRowsForFolds {
        /// Number of rows in the dataset.
        rows: usize,
        /// The requested number of folds.
        k_folds: usize,
    },

    /// Returned when the table has zero rows.
    #[error("table has zero rows")]
    EmptyDataset,

    /// Returned when the table has no feature column in front of the label.
    #[error("table needs at least 2 columns (features + label), got {cols}")]
    TooFewColumns {
        /// The column count provided.
        cols: usize,
    },

    /// Returned when the value buffer does not match `rows * cols`.
    #[error("table of {rows}x{cols} needs {expected} values, got {got}")]
    ShapeMismatch {
        /// Declared row count.
        rows: usize,
        /// Declared column count.
        cols: usize,
        /// `rows * cols`.
        expected: usize,
        /// Length of the value buffer.
        got: usize,
    },

    /// Returned when a table value is NaN or infinite.
    #[error("non-finite value at row {row}, column {col}")]
    NonFiniteValue {
        /// The zero-based row index.
        row: usize,
        /// The zero-based column index.
        col: usize,
    },

    /// Returned when a label is neither 0 nor 1.
    #[error("only binary classification is supported, row {row} has label {value}")]
    NonBinaryLabel {
        /// The zero-based row index.
        row: usize,
        /// The offending label value.
        value: f64,
    },

    /// Returned when a training view holds no rows.
    #[error("training view has zero rows")]
    EmptyTrainingView,

    /// Returned when a prediction row is shorter than the forest's feature count.
    #[error("prediction input has {got} values, need at least {expected}")]
    PredictionFeatureMismatch {
        /// The number of features the forest was trained on.
        expected: usize,
        /// The length of the prediction input.
        got: usize,
    },

    /// Returned when a forest is asked to vote as a forest of a different size.
    #[error("forest was trained with {trained} trees, asked to vote as {requested}")]
    ForestSizeMismatch {
        /// Trees in the forest across the whole group.
        trained: usize,
        /// The forest size the caller asked for.
        requested: usize,
    },

    /// Wraps a failed process-group collective.
    #[error(transparent)]
    Group(#[from] GroupError),
}

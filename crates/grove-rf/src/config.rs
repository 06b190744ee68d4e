//! Forest hyperparameters and run verbosity.

use crate::error::RfError;

/// Hyperparameters shared read-only by every tree of a forest.
///
/// Construct via [`RandomForestParams::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter          | Default |
/// |--------------------|---------|
/// | `max_depth`        | 7       |
/// | `min_samples_leaf` | 3       |
/// | `max_features`     | 20      |
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RandomForestParams {
    pub(crate) n_estimators: usize,
    pub(crate) max_depth: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) max_features: usize,
}

impl RandomForestParams {
    /// Default maximum depth of a tree (root is depth 1).
    pub const DEFAULT_MAX_DEPTH: usize = 7;
    /// Default minimum partition size that may be split off.
    pub const DEFAULT_MIN_SAMPLES_LEAF: usize = 3;
    /// Default number of candidate features sampled per split.
    pub const DEFAULT_MAX_FEATURES: usize = 20;

    /// Create parameters for a forest of `n_estimators` trees.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_estimators` is zero.
    pub fn new(n_estimators: usize) -> Result<Self, RfError> {
        if n_estimators == 0 {
            return Err(RfError::InvalidTreeCount { n_estimators });
        }
        Ok(Self {
            n_estimators,
            max_depth: Self::DEFAULT_MAX_DEPTH,
            min_samples_leaf: Self::DEFAULT_MIN_SAMPLES_LEAF,
            max_features: Self::DEFAULT_MAX_FEATURES,
        })
    }

    /// Set the maximum tree depth.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidMaxDepth`] if `max_depth` is zero.
    pub fn with_max_depth(mut self, max_depth: usize) -> Result<Self, RfError> {
        if max_depth == 0 {
            return Err(RfError::InvalidMaxDepth { max_depth });
        }
        self.max_depth = max_depth;
        Ok(self)
    }

    /// Set the minimum number of rows a split may leave on either side.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidMinSamplesLeaf`] if `min_samples_leaf` is zero.
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Result<Self, RfError> {
        if min_samples_leaf == 0 {
            return Err(RfError::InvalidMinSamplesLeaf { min_samples_leaf });
        }
        self.min_samples_leaf = min_samples_leaf;
        Ok(self)
    }

    /// Set the number of candidate features sampled at each split.
    ///
    /// Values above the dataset's feature count are clamped at training time.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidMaxFeatures`] if `max_features` is zero.
    pub fn with_max_features(mut self, max_features: usize) -> Result<Self, RfError> {
        if max_features == 0 {
            return Err(RfError::InvalidMaxFeatures { max_features });
        }
        self.max_features = max_features;
        Ok(self)
    }

    /// Return the number of trees in the full forest.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Return the maximum tree depth.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the minimum rows per split side.
    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    /// Return the requested number of candidate features per split.
    #[must_use]
    pub fn max_features(&self) -> usize {
        self.max_features
    }
}

/// Diagnostic verbosity of a run, passed explicitly to every component.
///
/// A diagnostic tagged with level `l` is emitted when the verbosity is
/// strictly greater than `l`. Verbosity never changes results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, serde::Serialize)]
pub struct Verbosity(u8);

impl Verbosity {
    /// Level 0: run summaries only; every gated diagnostic is suppressed.
    pub const QUIET: Verbosity = Verbosity(0);
    /// Level 1: also emits diagnostics tagged level 0.
    pub const NORMAL: Verbosity = Verbosity(1);

    /// Create a verbosity from its numeric level.
    #[must_use]
    pub fn new(level: u8) -> Self {
        Self(level)
    }

    /// Return the numeric level.
    #[must_use]
    pub fn level(self) -> u8 {
        self.0
    }

    /// Return `true` when diagnostics tagged `level` should be emitted.
    #[must_use]
    pub fn shows(self, level: u8) -> bool {
        self.0 > level
    }
}

//! Grid search over forest size and tree depth.

use grove_comm::Communicator;
use tracing::{info, instrument};

use crate::config::{RandomForestParams, Verbosity};
use crate::dataset::Table;
use crate::error::RfError;
use crate::eval::CrossValidation;
use crate::seed::SeedSource;

/// One evaluated grid configuration.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct GridPoint {
    /// Forest size.
    pub n_estimators: usize,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Mean cross-validation accuracy.
    pub accuracy: f64,
}

/// Outcome of a hyperparameter search.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SearchResult {
    /// Every configuration in grid order.
    pub evaluations: Vec<GridPoint>,
    /// The first configuration with the highest accuracy.
    pub best: GridPoint,
}

/// Grid search over `n_estimators` x `max_depth`.
///
/// # Defaults
///
/// | Setting            | Default        |
/// |--------------------|----------------|
/// | `n_estimators`     | 10, 50, 100    |
/// | `max_depth`        | 3, 7, 10       |
/// | `min_samples_leaf` | 2              |
/// | `max_features`     | 3              |
/// | `k_folds`          | 5              |
#[derive(Debug, Clone)]
pub struct HyperparameterSearch {
    tree_counts: Vec<usize>,
    depths: Vec<usize>,
    min_samples_leaf: usize,
    max_features: usize,
    k_folds: usize,
    verbosity: Verbosity,
}

impl Default for HyperparameterSearch {
    fn default() -> Self {
        Self {
            tree_counts: vec![10, 50, 100],
            depths: vec![3, 7, 10],
            min_samples_leaf: 2,
            max_features: 3,
            k_folds: 5,
            verbosity: Verbosity::QUIET,
        }
    }
}

impl HyperparameterSearch {
    /// Replace the swept tree counts and depths.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::EmptyGrid`] if either list is empty.
    pub fn with_grid(mut self, tree_counts: Vec<usize>, depths: Vec<usize>) -> Result<Self, RfError> {
        if tree_counts.is_empty() || depths.is_empty() {
            return Err(RfError::EmptyGrid);
        }
        self.tree_counts = tree_counts;
        self.depths = depths;
        Ok(self)
    }

    /// Set the fold count used for each configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidFoldCount`] if `k_folds` < 2.
    pub fn with_k_folds(mut self, k_folds: usize) -> Result<Self, RfError> {
        if k_folds < 2 {
            return Err(RfError::InvalidFoldCount { k_folds });
        }
        self.k_folds = k_folds;
        Ok(self)
    }

    /// Set the diagnostic verbosity.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Number of configurations the grid holds.
    #[must_use]
    pub fn n_configurations(&self) -> usize {
        self.tree_counts.len() * self.depths.len()
    }

    /// Cross-validate every configuration in grid order.
    ///
    /// Tree counts form the outer loop and depths the inner one. All
    /// configurations draw from the same `seeds` stream. Only a strictly
    /// higher accuracy displaces the incumbent, so ties go to the earlier
    /// configuration.
    ///
    /// Collective: every member must call it with identical arguments.
    ///
    /// # Errors
    ///
    /// Any error of [`CrossValidation::evaluate`], or a parameter error
    /// for a grid value of zero.
    #[instrument(skip_all, fields(rank = %comm.rank(), n_configurations = self.n_configurations()))]
    pub fn run<C: Communicator>(
        &self,
        comm: &C,
        table: &Table,
        seeds: &mut SeedSource,
    ) -> Result<SearchResult, RfError> {
        let cv = CrossValidation::new(self.k_folds)?.with_verbosity(self.verbosity);
        let mut evaluations = Vec::with_capacity(self.n_configurations());
        let mut best: Option<GridPoint> = None;

        for &n_estimators in &self.tree_counts {
            for &max_depth in &self.depths {
                let params = RandomForestParams::new(n_estimators)?
                    .with_max_depth(max_depth)?
                    .with_min_samples_leaf(self.min_samples_leaf)?
                    .with_max_features(self.max_features)?;
                let accuracy = cv.evaluate(comm, table, &params, seeds)?.mean_accuracy;
                let point = GridPoint {
                    n_estimators,
                    max_depth,
                    accuracy,
                };
                if comm.rank().is_root() {
                    info!(n_estimators, max_depth, accuracy, "configuration evaluated");
                }
                if best.is_none_or(|b| accuracy > b.accuracy) {
                    best = Some(point);
                }
                evaluations.push(point);
            }
        }

        let best = best.ok_or(RfError::EmptyGrid)?;
        if comm.rank().is_root() {
            info!(
                n_estimators = best.n_estimators,
                max_depth = best.max_depth,
                accuracy = best.accuracy,
                "best configuration"
            );
        }
        Ok(SearchResult { evaluations, best })
    }
}

#[cfg(test)]
mod tests {
    use grove_comm::SoloGroup;

    use super::*;

    fn banded(n: usize) -> Table {
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let x = (i % 10) as f64;
                vec![x, if x < 5.0 { 0.0 } else { 1.0 }]
            })
            .collect();
        Table::from_rows(&rows).unwrap()
    }

    #[test]
    fn default_grid_has_nine_points() {
        assert_eq!(HyperparameterSearch::default().n_configurations(), 9);
    }

    #[test]
    fn empty_grid_rejected() {
        let err = HyperparameterSearch::default()
            .with_grid(vec![], vec![3])
            .unwrap_err();
        assert!(matches!(err, RfError::EmptyGrid));
    }

    #[test]
    fn evaluations_follow_grid_order() {
        let search = HyperparameterSearch::default()
            .with_grid(vec![2, 3], vec![1, 4])
            .unwrap()
            .with_k_folds(2)
            .unwrap();
        let result = search
            .run(&SoloGroup, &banded(20), &mut SeedSource::new(3))
            .unwrap();
        let order: Vec<_> = result
            .evaluations
            .iter()
            .map(|p| (p.n_estimators, p.max_depth))
            .collect();
        assert_eq!(order, vec![(2, 1), (2, 4), (3, 1), (3, 4)]);
    }

    #[test]
    fn ties_keep_earliest_configuration() {
        // Every configuration separates this table perfectly at depth >= 2.
        let search = HyperparameterSearch::default()
            .with_grid(vec![2, 3], vec![2, 5])
            .unwrap()
            .with_k_folds(2)
            .unwrap();
        let result = search
            .run(&SoloGroup, &banded(40), &mut SeedSource::new(3))
            .unwrap();
        assert!(result.evaluations.iter().all(|p| p.accuracy == 1.0));
        assert_eq!(result.best.n_estimators, 2);
        assert_eq!(result.best.max_depth, 2);
    }
}

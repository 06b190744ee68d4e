//! Contiguous k-fold cross-validation for a distributed Random Forest.

use std::ops::Range;

use grove_comm::Communicator;
use tracing::{debug, info, instrument};

use crate::config::{RandomForestParams, Verbosity};
use crate::dataset::{Table, TrainingView};
use crate::error::RfError;
use crate::forest::Forest;
use crate::seed::SeedSource;

/// Identifies the held-out block of one cross-validation iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelContext {
    /// Zero-based fold index.
    pub fold_index: usize,
    /// Rows in every fold.
    pub rows_per_fold: usize,
}

impl ModelContext {
    /// Row indices of the test block for this fold.
    #[must_use]
    pub fn test_rows(&self) -> Range<usize> {
        let start = self.fold_index * self.rows_per_fold;
        start..start + self.rows_per_fold
    }
}

/// Cross-validation configuration.
///
/// Construct via [`CrossValidation::new`], then chain `with_verbosity` if desired.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    k_folds: usize,
    verbosity: Verbosity,
}

/// Results of contiguous k-fold cross-validation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CrossValidationResult {
    /// Accuracy for each fold.
    pub fold_accuracies: Vec<f64>,
    /// Mean accuracy across folds.
    pub mean_accuracy: f64,
    /// Population standard deviation of fold accuracies.
    pub std_accuracy: f64,
    /// Rows in each test block.
    pub rows_per_fold: usize,
    /// Number of folds.
    pub n_folds: usize,
    /// Trailing rows that fell into no fold.
    pub n_excluded_rows: usize,
    /// Size of the forest trained for each fold.
    pub trees_per_fold: usize,
}

impl CrossValidation {
    /// Create a cross-validation config with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidFoldCount`] if `k_folds` < 2.
    pub fn new(k_folds: usize) -> Result<Self, RfError> {
        if k_folds < 2 {
            return Err(RfError::InvalidFoldCount { k_folds });
        }
        Ok(Self {
            k_folds,
            verbosity: Verbosity::QUIET,
        })
    }

    /// Set the diagnostic verbosity.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn k_folds(&self) -> usize {
        self.k_folds
    }

    /// Run cross-validation across the group.
    ///
    /// Rows are cut into `k_folds` contiguous blocks of `rows / k_folds`
    /// rows; trailing rows beyond the last block are left out. For every
    /// fold a fresh forest is trained on all rows outside the block and
    /// scored on the block, then released.
    ///
    /// Collective: every member must call it with the same table, params
    /// and an identically seeded `seeds`.
    ///
    /// # Errors
    ///
    /// | Variant                         | When                                   |
    /// |---------------------------------|----------------------------------------|
    /// | [`RfError::TooFewRowsForFolds`] | `table.rows() < k_folds`               |
    /// | [`RfError::Group`]              | a collective failed                    |
    /// | Other RF errors                 | From training or prediction            |
    #[instrument(skip_all, fields(rank = %comm.rank(), k_folds = self.k_folds, rows = table.rows()))]
    pub fn evaluate<C: Communicator>(
        &self,
        comm: &C,
        table: &Table,
        params: &RandomForestParams,
        seeds: &mut SeedSource,
    ) -> Result<CrossValidationResult, RfError> {
        let rows_per_fold = table.rows() / self.k_folds;
        if rows_per_fold == 0 {
            return Err(RfError::TooFewRowsForFolds {
                rows: table.rows(),
                k_folds: self.k_folds,
            });
        }
        let n_excluded_rows = table.rows() - rows_per_fold * self.k_folds;
        let log_here = comm.rank().is_root();

        let mut fold_accuracies = Vec::with_capacity(self.k_folds);
        for fold_index in 0..self.k_folds {
            let context = ModelContext {
                fold_index,
                rows_per_fold,
            };
            let accuracy = self.run_fold(comm, table, params, seeds, &context)?;
            if log_here && self.verbosity.shows(1) {
                info!(fold = fold_index, accuracy, "fold completed");
            }
            fold_accuracies.push(accuracy);
        }

        let n = fold_accuracies.len() as f64;
        let mean_accuracy = fold_accuracies.iter().sum::<f64>() / n;
        let std_accuracy = (fold_accuracies
            .iter()
            .map(|&a| (a - mean_accuracy).powi(2))
            .sum::<f64>()
            / n)
            .sqrt();

        if log_here {
            info!(mean_accuracy, std_accuracy, "cross-validation complete");
        }

        Ok(CrossValidationResult {
            fold_accuracies,
            mean_accuracy,
            std_accuracy,
            rows_per_fold,
            n_folds: self.k_folds,
            n_excluded_rows,
            trees_per_fold: params.n_estimators,
        })
    }

    fn run_fold<C: Communicator>(
        &self,
        comm: &C,
        table: &Table,
        params: &RandomForestParams,
        seeds: &mut SeedSource,
        context: &ModelContext,
    ) -> Result<f64, RfError> {
        let test_rows = context.test_rows();
        let view = TrainingView::excluding(table, test_rows.clone());
        let forest = Forest::train(comm, &view, params, seeds, self.verbosity)?;
        drop(view);

        let log_votes = comm.rank().is_root() && self.verbosity.shows(1);
        let mut correct = 0usize;
        for row in test_rows {
            let predicted = forest.predict(comm, params.n_estimators, table.row(row))?;
            let truth = table.label(row);
            if log_votes {
                debug!(row, %predicted, %truth, "vote");
            }
            if predicted == truth {
                correct += 1;
            }
        }

        forest.release(self.verbosity);
        Ok(correct as f64 / context.rows_per_fold as f64)
    }
}

#[cfg(test)]
mod tests {
    use grove_comm::{LocalGroup, SoloGroup};

    use super::*;

    fn banded(n: usize) -> Table {
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let x = (i % 10) as f64;
                vec![x, (i % 3) as f64, if x < 5.0 { 0.0 } else { 1.0 }]
            })
            .collect();
        Table::from_rows(&rows).unwrap()
    }

    fn params(n: usize) -> RandomForestParams {
        RandomForestParams::new(n)
            .unwrap()
            .with_min_samples_leaf(1)
            .unwrap()
    }

    #[test]
    fn context_blocks_are_contiguous() {
        let c = ModelContext {
            fold_index: 2,
            rows_per_fold: 20,
        };
        assert_eq!(c.test_rows(), 40..60);
    }

    #[test]
    fn folds_cover_rows_exactly_once() {
        let rows_per_fold = 20;
        let mut seen = vec![0u32; 100];
        for fold_index in 0..5 {
            let ctx = ModelContext {
                fold_index,
                rows_per_fold,
            };
            for r in ctx.test_rows() {
                seen[r] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn invalid_fold_count() {
        assert!(CrossValidation::new(0).is_err());
        assert!(CrossValidation::new(1).is_err());
        assert_eq!(CrossValidation::new(2).unwrap().k_folds(), 2);
    }

    #[test]
    fn too_few_rows_for_folds() {
        let table = banded(4);
        let cv = CrossValidation::new(5).unwrap();
        let err = cv
            .evaluate(&SoloGroup, &table, &params(3), &mut SeedSource::new(1))
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::TooFewRowsForFolds { rows: 4, k_folds: 5 }
        ));
    }

    #[test]
    fn remainder_rows_are_excluded() {
        let table = banded(23);
        let cv = CrossValidation::new(5).unwrap();
        let result = cv
            .evaluate(&SoloGroup, &table, &params(3), &mut SeedSource::new(1))
            .unwrap();
        assert_eq!(result.rows_per_fold, 4);
        assert_eq!(result.n_excluded_rows, 3);
        assert_eq!(result.fold_accuracies.len(), 5);
    }

    #[test]
    fn separable_data_scores_perfectly() {
        let table = banded(100);
        let cv = CrossValidation::new(5).unwrap();
        let result = cv
            .evaluate(&SoloGroup, &table, &params(5), &mut SeedSource::new(9))
            .unwrap();
        assert!(
            (result.mean_accuracy - 1.0).abs() < 1e-12,
            "mean_accuracy = {}",
            result.mean_accuracy
        );
        assert_eq!(result.std_accuracy, 0.0);
        assert_eq!(result.trees_per_fold, 5);
    }

    #[test]
    fn held_out_block_is_not_learned() {
        // Block 0 holds unique large x labelled 0; everywhere else x >= 60 is 1.
        // A forest that saw block 0 would learn it; one that did not calls it 1.
        let rows: Vec<Vec<f64>> = (0..100)
            .map(|i| {
                if i < 20 {
                    vec![1000.0 + i as f64, 0.0]
                } else {
                    vec![i as f64, if i < 60 { 0.0 } else { 1.0 }]
                }
            })
            .collect();
        let table = Table::from_rows(&rows).unwrap();
        let result = CrossValidation::new(5)
            .unwrap()
            .evaluate(&SoloGroup, &table, &params(3), &mut SeedSource::new(2))
            .unwrap();
        assert_eq!(result.fold_accuracies[0], 0.0);
    }

    #[test]
    fn group_size_does_not_change_agreement() {
        let table = banded(60);
        let p = params(4);
        let results = LocalGroup::new(3)
            .unwrap()
            .run(|comm| {
                CrossValidation::new(3)
                    .unwrap()
                    .evaluate(&comm, &table, &p, &mut SeedSource::new(5))
                    .unwrap()
            })
            .unwrap();
        assert_eq!(results[0], results[1]);
        assert_eq!(results[1], results[2]);
    }
}

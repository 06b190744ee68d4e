//! Group-wide majority voting over a distributed forest.

use grove_comm::Communicator;

use crate::dataset::BinaryLabel;
use crate::error::RfError;
use crate::forest::Forest;
use crate::partition::TreeAssignment;

/// Per-label vote counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteTally {
    /// Trees voting `0`.
    pub zeros: u64,
    /// Trees voting `1`.
    pub ones: u64,
}

impl VoteTally {
    /// Count one tree's vote.
    pub fn record(&mut self, label: BinaryLabel) {
        match label {
            BinaryLabel::Zero => self.zeros += 1,
            BinaryLabel::One => self.ones += 1,
        }
    }

    /// Majority label: `One` only when it has strictly more votes.
    #[must_use]
    pub fn decide(&self) -> BinaryLabel {
        if self.ones > self.zeros {
            BinaryLabel::One
        } else {
            BinaryLabel::Zero
        }
    }

    /// Sum every member's tally; all members receive the same total.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::Group`] if the reduction fails.
    pub fn combine<C: Communicator>(self, comm: &C) -> Result<Self, RfError> {
        let total = comm.all_reduce_sum(&[self.zeros, self.ones])?;
        Ok(Self {
            zeros: total[0],
            ones: total[1],
        })
    }
}

impl Forest {
    /// Tally the votes of the locally held trees for one row.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `row` is too short.
    pub fn local_votes(&self, row: &[f64]) -> Result<VoteTally, RfError> {
        let mut tally = VoteTally::default();
        for tree in &self.trees {
            tally.record(tree.predict(row)?);
        }
        Ok(tally)
    }

    /// Predict one row with the whole forest across the group.
    ///
    /// Collective: every member evaluates its own share of the
    /// `n_estimators` trees, then the tallies are summed with one
    /// all-reduce. Ties go to [`BinaryLabel::Zero`].
    ///
    /// # Errors
    ///
    /// | Variant                                | When                                          |
    /// |----------------------------------------|-----------------------------------------------|
    /// | [`RfError::ForestSizeMismatch`]        | `n_estimators` differs from the trained size  |
    /// | [`RfError::PredictionFeatureMismatch`] | `row` is shorter than the feature count       |
    /// | [`RfError::Group`]                     | the vote reduction failed                     |
    pub fn predict<C: Communicator>(
        &self,
        comm: &C,
        n_estimators: usize,
        row: &[f64],
    ) -> Result<BinaryLabel, RfError> {
        if n_estimators != self.n_estimators {
            return Err(RfError::ForestSizeMismatch {
                trained: self.n_estimators,
                requested: n_estimators,
            });
        }
        debug_assert_eq!(
            TreeAssignment::for_rank(n_estimators, comm.rank().index(), comm.size()).len(),
            self.trees.len()
        );
        if row.len() < self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: row.len(),
            });
        }

        let tally = self.local_votes(row)?.combine(comm)?;
        Ok(tally.decide())
    }
}

//! Assignment of tree indices to the members of a process group.

use std::ops::Range;

/// The contiguous block of global tree indices one member builds.
///
/// Each member builds `n_estimators / size` trees, and the first
/// `n_estimators % size` ranks build one extra. Derived from
/// `(rank, size, n_estimators)` alone, so every member computes every
/// other member's share without communicating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TreeAssignment {
    start: usize,
    end: usize,
}

impl TreeAssignment {
    /// Compute the share of `rank` in a group of `size` building `n_estimators` trees.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or `rank >= size`.
    #[must_use]
    pub fn for_rank(n_estimators: usize, rank: usize, size: usize) -> Self {
        assert!(rank < size, "rank {rank} outside group of size {size}");
        let per_rank = n_estimators / size;
        let remainder = n_estimators % size;
        let start = rank * per_rank + rank.min(remainder);
        let end = start + per_rank + usize::from(rank < remainder);
        Self { start, end }
    }

    /// Largest share any member receives: the number of build rounds.
    #[must_use]
    pub fn max_share(n_estimators: usize, size: usize) -> usize {
        n_estimators.div_ceil(size)
    }

    /// First global tree index of this share.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of trees in this share.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Return `true` when this member builds no trees.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Global tree indices of this share.
    #[must_use]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Global index of the `local`-th tree of this share, if it exists.
    #[must_use]
    pub fn tree_id(&self, local: usize) -> Option<usize> {
        (local < self.len()).then_some(self.start + local)
    }
}

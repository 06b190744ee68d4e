//! Random Forest training across a process group.

use grove_comm::Communicator;
use tracing::{debug, info, instrument, trace};

use crate::config::{RandomForestParams, Verbosity};
use crate::dataset::TrainingView;
use crate::error::RfError;
use crate::node::NodeIdGenerator;
use crate::partition::TreeAssignment;
use crate::seed::{SeedSource, tree_rng};
use crate::tree::DecisionTree;

/// One member's share of a random forest.
///
/// Holds only the trees this member built; the rest of the forest lives
/// on the other members of the group.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) assignment: TreeAssignment,
    pub(crate) n_estimators: usize,
    pub(crate) n_features: usize,
}

impl Forest {
    /// Build this member's share of a forest of `params.n_estimators` trees.
    ///
    /// Collective: every member of `comm` must call it with the same
    /// parameters. The group runs one seed round per slot of the largest
    /// share; in each round the root draws a seed from `seeds` and
    /// broadcasts it, and each member with a tree in that round grows it
    /// from the stream `round_seed + tree_id`. Node identifiers come from
    /// one generator shared by all local trees.
    ///
    /// # Errors
    ///
    /// | Variant                        | When                          |
    /// |--------------------------------|-------------------------------|
    /// | [`RfError::EmptyTrainingView`] | `view` holds no rows          |
    /// | [`RfError::Group`]             | a seed broadcast failed       |
    #[instrument(skip_all, fields(rank = %comm.rank(), n_estimators = params.n_estimators))]
    pub fn train<C: Communicator>(
        comm: &C,
        view: &TrainingView<'_>,
        params: &RandomForestParams,
        seeds: &mut SeedSource,
        verbosity: Verbosity,
    ) -> Result<Self, RfError> {
        if view.is_empty() {
            return Err(RfError::EmptyTrainingView);
        }

        let assignment =
            TreeAssignment::for_rank(params.n_estimators, comm.rank().index(), comm.size());
        if verbosity.shows(1) {
            debug!(
                start = assignment.start(),
                end = assignment.range().end,
                n_local = assignment.len(),
                "building assigned trees"
            );
        }

        let rounds = TreeAssignment::max_share(params.n_estimators, comm.size());
        let mut ids = NodeIdGenerator::new();
        let mut trees = Vec::with_capacity(assignment.len());

        for round in 0..rounds {
            let round_seed = seeds.next_round(comm)?;
            let Some(tree_id) = assignment.tree_id(round) else {
                continue;
            };
            if verbosity.shows(2) {
                trace!(tree_id, local = round, round_seed, "building tree");
            }
            let mut rng = tree_rng(round_seed, tree_id);
            trees.push(DecisionTree::grow(view, params, &mut ids, &mut rng, verbosity)?);
        }

        if verbosity.shows(1) {
            info!(
                n_local = trees.len(),
                n_nodes = ids.issued(),
                "completed local trees"
            );
        }

        Ok(Self {
            trees,
            assignment,
            n_estimators: params.n_estimators,
            n_features: view.table().n_features(),
        })
    }

    /// Return the locally built trees, in global index order.
    #[must_use]
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Return the block of global tree indices this member built.
    #[must_use]
    pub fn assignment(&self) -> TreeAssignment {
        self.assignment
    }

    /// Return the size of the whole forest across the group.
    #[must_use]
    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    /// Return the number of features the forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Release every local tree and return the total number of nodes freed.
    pub fn release(self, verbosity: Verbosity) -> usize {
        let freed: usize = self.trees.into_iter().map(DecisionTree::release).sum();
        if verbosity.shows(2) {
            trace!(freed, "released local trees");
        }
        freed
    }
}

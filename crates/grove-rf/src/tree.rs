use rand::Rng;
use tracing::{debug, instrument, trace};

use crate::{
    RfError,
    config::{RandomForestParams, Verbosity},
    dataset::{BinaryLabel, Table, TrainingView},
    node::{Node, NodeIdGenerator, NodeIndex},
    split::find_best_split,
};

/// A fitted binary decision tree.
///
/// Stored as an arena `Vec<Node>` in allocation order; the root sits at
/// index 0 and every split references its two children by [`NodeIndex`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

impl DecisionTree {
    /// Grow a tree over the rows of `view`.
    ///
    /// The root starts at depth 1. A node becomes a leaf holding the
    /// majority label of its rows when no split separates them, when its
    /// depth has reached `max_depth`, or when either side of the best split
    /// holds fewer than `min_samples_leaf` rows. Every allocated node takes
    /// the next identifier from `ids`.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::EmptyTrainingView`] when `view` holds no rows.
    #[instrument(skip_all, fields(n_rows = view.len()))]
    pub fn grow(
        view: &TrainingView<'_>,
        params: &RandomForestParams,
        ids: &mut NodeIdGenerator,
        rng: &mut impl Rng,
        verbosity: Verbosity,
    ) -> Result<Self, RfError> {
        if view.is_empty() {
            return Err(RfError::EmptyTrainingView);
        }
        let table = view.table();
        let n_features = table.n_features();

        let mut grower = Grower {
            table,
            max_depth: params.max_depth,
            min_samples_leaf: params.min_samples_leaf,
            max_features: params.max_features.min(n_features),
            verbosity,
            ids,
            rng,
            arena: Vec::new(),
        };
        let root = grower.alloc(view.len());
        grower.grow(root, view.rows(), 1);

        let tree = Self {
            nodes: grower.arena,
            n_features,
        };
        trace!(n_nodes = tree.n_nodes(), depth = tree.depth(), "decision tree built");
        Ok(tree)
    }

    /// Predict the label of one row.
    ///
    /// At each split, goes left when `row[feature] < threshold`, right otherwise.
    /// `row` may carry a trailing label column.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `row` is shorter
    /// than the number of features the tree was trained on.
    pub fn predict(&self, row: &[f64]) -> Result<BinaryLabel, RfError> {
        if row.len() < self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: row.len(),
            });
        }
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { label, .. } => return Ok(*label),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if row[feature.index()] < *threshold {
                        left.index()
                    } else {
                        right.index()
                    };
                }
            }
        }
    }

    /// Return the nodes in allocation order; index 0 is the root.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return the root node.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.nodes[0]
    }

    /// Return the total number of nodes (splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the number of levels; a lone root leaf has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0usize;
        let mut stack = vec![(0usize, 1usize)];
        while let Some((idx, d)) = stack.pop() {
            max_depth = max_depth.max(d);
            if let Node::Split { left, right, .. } = &self.nodes[idx] {
                stack.push((left.index(), d + 1));
                stack.push((right.index(), d + 1));
            }
        }
        max_depth
    }

    /// Tear the tree down child-first from the root and return how many
    /// nodes were freed.
    pub fn release(self) -> usize {
        fn free(nodes: &[Node], idx: NodeIndex) -> usize {
            match &nodes[idx.index()] {
                Node::Split { left, right, .. } => free(nodes, *left) + free(nodes, *right) + 1,
                Node::Leaf { .. } => 1,
            }
        }
        free(&self.nodes, NodeIndex::new(0))
    }
}

struct Grower<'t, 'g, R> {
    table: &'t Table,
    max_depth: usize,
    min_samples_leaf: usize,
    max_features: usize,
    verbosity: Verbosity,
    ids: &'g mut NodeIdGenerator,
    rng: &'g mut R,
    arena: Vec<Node>,
}

impl<R: Rng> Grower<'_, '_, R> {
    /// Reserve an arena slot with a fresh identifier. The placeholder is
    /// overwritten once the node is grown.
    fn alloc(&mut self, n_samples: usize) -> NodeIndex {
        let id = self.ids.next_id();
        self.arena.push(Node::Leaf {
            id,
            label: BinaryLabel::Zero,
            n_samples,
        });
        NodeIndex::new(self.arena.len() - 1)
    }

    fn grow(&mut self, node: NodeIndex, rows: &[usize], depth: usize) {
        let split = find_best_split(self.table, rows, self.max_features, &mut *self.rng);

        if depth == 1 && self.verbosity.shows(1) {
            match &split {
                Some(s) => debug!(
                    left = s.left.len(),
                    right = s.right.len(),
                    gini = %s.gini,
                    threshold = s.threshold,
                    feature = %s.feature,
                    "root split"
                ),
                None => debug!(n_rows = rows.len(), "root has no valid split"),
            }
        }

        let split = match split {
            Some(s)
                if depth < self.max_depth
                    && s.left.len() >= self.min_samples_leaf
                    && s.right.len() >= self.min_samples_leaf =>
            {
                s
            }
            _ => {
                let id = self.arena[node.index()].id();
                self.arena[node.index()] = Node::Leaf {
                    id,
                    label: majority_label(self.table, rows),
                    n_samples: rows.len(),
                };
                return;
            }
        };

        let left = self.alloc(split.left.len());
        let right = self.alloc(split.right.len());
        let id = self.arena[node.index()].id();
        self.arena[node.index()] = Node::Split {
            id,
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            gini: split.gini,
            n_samples: rows.len(),
        };

        self.grow(left, &split.left, depth + 1);
        self.grow(right, &split.right, depth + 1);
    }
}

/// Label held by strictly more rows; a tie goes to [`BinaryLabel::Zero`].
fn majority_label(table: &Table, rows: &[usize]) -> BinaryLabel {
    let ones = rows
        .iter()
        .filter(|&&r| table.label(r) == BinaryLabel::One)
        .count();
    if ones > rows.len() - ones {
        BinaryLabel::One
    } else {
        BinaryLabel::Zero
    }
}

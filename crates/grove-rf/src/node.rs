use std::fmt;

use crate::dataset::BinaryLabel;

/// Zero-based feature column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a new feature index from a zero-based column position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based feature column index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a tree's `Vec<Node>` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a new node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-local node identifier, strictly increasing in allocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Return the raw identifier.
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues ascending [`NodeId`]s. One generator is shared by every tree a
/// process builds in a training call, so identifiers never collide.
#[derive(Debug, Default)]
pub struct NodeIdGenerator {
    next: u64,
}

impl NodeIdGenerator {
    /// Create a generator whose first identifier is `#0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next identifier.
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Return how many identifiers have been issued.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.next
    }
}

/// Weighted Gini impurity of a split (lower is better).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Gini(f64);

impl Gini {
    /// Create a new impurity value.
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw impurity value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Gini {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// A node in a decision tree arena.
///
/// Children are referenced by [`NodeIndex`] into the owning tree's arena;
/// a parent is the only node referring to its children.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// An interior split node.
    Split {
        /// Identifier assigned when the node was allocated.
        id: NodeId,
        /// Feature used for the split.
        feature: FeatureIndex,
        /// Rows with `value < threshold` go left.
        threshold: f64,
        /// Index of the left child node.
        left: NodeIndex,
        /// Index of the right child node.
        right: NodeIndex,
        /// Weighted Gini impurity achieved by this split.
        gini: Gini,
        /// Number of training rows that reached this node.
        n_samples: usize,
    },
    /// A terminal leaf node.
    Leaf {
        /// Identifier assigned when the node was allocated.
        id: NodeId,
        /// Majority label of the rows that reached this leaf.
        label: BinaryLabel,
        /// Number of training rows in this leaf.
        n_samples: usize,
    },
}

impl Node {
    /// Return the node identifier.
    #[must_use]
    pub fn id(&self) -> NodeId {
        match self {
            Node::Split { id, .. } | Node::Leaf { id, .. } => *id,
        }
    }

    /// Return the number of training rows that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }
}

//! Binary Random Forest classification across a process group.
//!
//! Trees of a forest are spread over the members of a
//! [`grove_comm::Communicator`] group: each member grows a contiguous block
//! of tree indices from a round seed broadcast by the root, and predictions
//! are settled by summing per-member vote tallies. On top of that sit
//! contiguous k-fold cross-validation and a grid search over forest size
//! and depth.

mod config;
mod dataset;
mod error;
mod eval;
mod forest;
mod node;
mod partition;
mod predict;
mod search;
mod seed;
mod split;
mod tree;

pub use config::{RandomForestParams, Verbosity};
pub use dataset::{BinaryLabel, Dimensions, Table, TrainingView};
pub use error::RfError;
pub use eval::{CrossValidation, CrossValidationResult, ModelContext};
pub use forest::Forest;
pub use node::{FeatureIndex, Gini, Node, NodeId, NodeIdGenerator, NodeIndex};
pub use partition::TreeAssignment;
pub use predict::VoteTally;
pub use search::{GridPoint, HyperparameterSearch, SearchResult};
pub use seed::{SeedSource, tree_rng, tree_seed};
pub use split::gini_impurity;
pub use tree::DecisionTree;

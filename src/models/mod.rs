//! Machine learning models module
//!
//! Provides the regression tree, the Random Forest built from it, and the
//! on-disk model artifact.

mod artifact;
mod decision_tree;
mod random_forest;

pub use artifact::ModelArtifact;
pub use decision_tree::{DecisionTree, NodeSplit, TreeConfig, TreeNode};
pub use random_forest::{ForestConfig, RandomForest};

//! # Housing Pipeline
//!
//! A four-stage ML pipeline wired as a small DAG of components that talk
//! only through files:
//!
//! 1. `data-extraction` - fetch a housing table and write it as CSV
//! 2. `data-preprocessing` - drop incomplete records, seeded 80/20 split
//! 3. `model-training` - fit a 100-tree Random Forest regressor
//! 4. `model-evaluation` - MSE and R² on the test split, written as JSON
//!
//! ## Modules
//!
//! - `source` - data source locators and the dataset download client
//! - `data` - Dataset structure and CSV persistence
//! - `models` - Decision Tree, Random Forest and the model artifact
//! - `metrics` - regression metrics
//! - `stages` - the four components
//! - `pipeline` - pipeline definition, YAML compilation and local runner

pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod source;
pub mod stages;

pub use config::PipelineConfig;
pub use data::{Dataset, Split};
pub use error::{PipelineError, Result};
pub use metrics::{Metrics, MetricsRecord};
pub use models::{ModelArtifact, RandomForest};
pub use pipeline::{LocalRunner, PipelineSpec, Workflow};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::PipelineConfig;
    pub use crate::data::{Dataset, Split, TARGET_COLUMN};
    pub use crate::metrics::{Metrics, MetricsRecord};
    pub use crate::models::{DecisionTree, ForestConfig, ModelArtifact, RandomForest, TreeConfig};
    pub use crate::pipeline::{LocalRunner, PipelineSpec, Workflow};
    pub use crate::source::{DataSource, DatasetClient};
    pub use crate::stages::Component;
}

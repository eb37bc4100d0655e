//! Dataset structure and CSV persistence
//!
//! Every artifact table in the pipeline is a [`Dataset`] written as CSV.

mod dataset;

pub use dataset::{Dataset, Split, TARGET_COLUMN};

//! Preprocessing stage: drop incomplete records, then split 80/20

use super::ensure_parent;
use crate::config::SplitConfig;
use crate::data::{Dataset, TARGET_COLUMN};
use crate::error::{PipelineError, Result};
use std::path::Path;
use tracing::info;

/// Record counts produced by preprocessing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessReport {
    pub n_input: usize,
    pub n_dropped: usize,
    pub n_train: usize,
    pub n_test: usize,
}

pub fn data_preprocessing(
    input_csv: &Path,
    train_csv: &Path,
    test_csv: &Path,
    split: &SplitConfig,
) -> Result<PreprocessReport> {
    info!("Loading data from {:?}", input_csv);
    let mut dataset = Dataset::load_csv(input_csv, TARGET_COLUMN)?;
    let n_input = dataset.n_samples();

    let n_dropped = dataset.drop_missing();
    if dataset.is_empty() {
        return Err(PipelineError::InsufficientData(format!(
            "all {} records contain missing values",
            n_input
        )));
    }

    info!("Splitting data (test_size={}, seed={})", split.test_size, split.seed);
    let parts = dataset.train_test_split(split.test_size, split.seed)?;

    ensure_parent(train_csv)?;
    ensure_parent(test_csv)?;
    parts.train.save_csv(train_csv)?;
    parts.test.save_csv(test_csv)?;

    let report = PreprocessReport {
        n_input,
        n_dropped,
        n_train: parts.train.n_samples(),
        n_test: parts.test.n_samples(),
    };
    info!(
        "Dropped {} incomplete records; wrote {} train / {} test",
        report.n_dropped, report.n_train, report.n_test
    );
    Ok(report)
}

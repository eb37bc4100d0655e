//! Extraction stage: locator in, dataset file out

use super::ensure_parent;
use crate::error::Result;
use crate::source::{DataSource, DatasetClient};
use std::path::Path;
use tracing::info;

/// Resolve `data_url`, load the table and write it as the pipeline's raw CSV.
///
/// Returns the number of records written.
pub fn data_extraction(client: &DatasetClient, data_url: &str, output_csv: &Path) -> Result<usize> {
    let source = DataSource::parse(data_url)?;
    let dataset = client.fetch(&source)?;

    ensure_parent(output_csv)?;
    dataset.save_csv(output_csv)?;

    info!(
        "Extracted {} records ({} columns) to {:?}",
        dataset.n_samples(),
        dataset.column_names().len(),
        output_csv
    );
    Ok(dataset.n_samples())
}

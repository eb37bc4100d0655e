//! Tabular dataset: numeric feature columns plus one numeric target column

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Canonical name of the target column in every dataset file the pipeline writes
pub const TARGET_COLUMN: &str = "target";

/// Cell spellings that load as a missing value
const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Dataset for regression: one row of features and one target per record
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Feature names in column order
    pub feature_names: Vec<String>,
    /// Name of the target column
    pub target_name: String,
    /// Feature matrix (n_samples x n_features)
    pub features: Vec<Vec<f64>>,
    /// Target values
    pub targets: Vec<f64>,
}

/// Train/test split result
#[derive(Debug, Clone)]
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

impl Dataset {
    /// Create an empty dataset with the canonical target column
    pub fn new(feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            target_name: TARGET_COLUMN.to_string(),
            features: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Create dataset from raw data
    pub fn from_data(
        feature_names: Vec<String>,
        target_name: impl Into<String>,
        features: Vec<Vec<f64>>,
        targets: Vec<f64>,
    ) -> Self {
        Self {
            feature_names,
            target_name: target_name.into(),
            features,
            targets,
        }
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.features.len()
    }

    /// Number of features
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Add a sample
    pub fn add_sample(&mut self, features: Vec<f64>, target: f64) {
        assert_eq!(features.len(), self.feature_names.len());
        self.features.push(features);
        self.targets.push(target);
    }

    /// All column names as written to disk: features, then the target
    pub fn column_names(&self) -> Vec<String> {
        let mut columns = self.feature_names.clone();
        columns.push(self.target_name.clone());
        columns
    }

    /// Get targets as ndarray
    pub fn targets_array(&self) -> Array1<f64> {
        Array1::from_vec(self.targets.clone())
    }

    /// Create a subset of the dataset by indices
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            feature_names: self.feature_names.clone(),
            target_name: self.target_name.clone(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }

    /// Number of records with a missing value in any feature or the target
    pub fn count_incomplete(&self) -> usize {
        self.features
            .iter()
            .zip(self.targets.iter())
            .filter(|(row, target)| target.is_nan() || row.iter().any(|v| v.is_nan()))
            .count()
    }

    /// Drop every record holding a missing value in any feature or the target.
    ///
    /// Returns the number of records removed.
    pub fn drop_missing(&mut self) -> usize {
        let before = self.n_samples();
        let keep: Vec<bool> = self
            .features
            .iter()
            .zip(self.targets.iter())
            .map(|(row, target)| !target.is_nan() && row.iter().all(|v| !v.is_nan()))
            .collect();

        let mut flags = keep.iter();
        self.features.retain(|_| *flags.next().unwrap_or(&false));
        let mut flags = keep.iter();
        self.targets.retain(|_| *flags.next().unwrap_or(&false));

        before - self.n_samples()
    }

    /// Shuffle split with a seeded permutation.
    ///
    /// The test set takes `ceil(test_size * n)` records from the front of the
    /// permutation and the train set takes the rest, both in permutation order.
    pub fn train_test_split(&self, test_size: f64, seed: u64) -> Result<Split> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(PipelineError::Config(format!(
                "test_size must be in (0, 1), got {}",
                test_size
            )));
        }

        let n = self.n_samples();
        let n_test = (test_size * n as f64).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(PipelineError::InsufficientData(format!(
                "cannot split {} records with test_size {}",
                n, test_size
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut rng);

        let (test_indices, train_indices) = indices.split_at(n_test);
        debug!(
            "Split {} records into {} train / {} test",
            n,
            train_indices.len(),
            test_indices.len()
        );

        Ok(Split {
            train: self.subset(train_indices),
            test: self.subset(test_indices),
        })
    }

    /// Load from CSV file, taking `target_column` as the target
    pub fn load_csv(path: &Path, target_column: &str) -> Result<Self> {
        let reader = csv::Reader::from_path(path)?;
        Self::from_csv_reader(reader, target_column)
    }

    /// Load from any CSV stream with a header row
    pub fn from_reader<R: Read>(reader: R, target_column: &str) -> Result<Self> {
        Self::from_csv_reader(csv::Reader::from_reader(reader), target_column)
    }

    fn from_csv_reader<R: Read>(mut reader: csv::Reader<R>, target_column: &str) -> Result<Self> {
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|s| s.trim().to_string())
            .collect();

        let target_idx = headers
            .iter()
            .position(|h| h == target_column)
            .ok_or_else(|| PipelineError::MissingColumn(target_column.to_string()))?;

        let feature_idx: Vec<usize> = (0..headers.len()).filter(|&i| i != target_idx).collect();
        let feature_names: Vec<String> = feature_idx.iter().map(|&i| headers[i].clone()).collect();

        let mut features = Vec::new();
        let mut targets = Vec::new();

        for (row, result) in reader.records().enumerate() {
            let record = result?;
            let cell = |i: usize| -> Result<f64> {
                parse_cell(record.get(i).unwrap_or(""), &headers[i], row + 1)
            };

            let values = feature_idx
                .iter()
                .map(|&i| cell(i))
                .collect::<Result<Vec<f64>>>()?;
            features.push(values);
            targets.push(cell(target_idx)?);
        }

        Ok(Dataset {
            feature_names,
            target_name: TARGET_COLUMN.to_string(),
            features,
            targets,
        })
    }

    /// Save to CSV file
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let writer = csv::Writer::from_path(path)?;
        self.write_csv(writer)
    }

    /// Write as CSV to any stream
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        self.write_csv(csv::Writer::from_writer(writer))
    }

    fn write_csv<W: Write>(&self, mut writer: csv::Writer<W>) -> Result<()> {
        writer.write_record(self.column_names())?;

        for (row, target) in self.features.iter().zip(self.targets.iter()) {
            let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            record.push(target.to_string());
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Parse one CSV cell; missing tokens become NaN
fn parse_cell(raw: &str, column: &str, row: usize) -> Result<f64> {
    let value = raw.trim();
    if MISSING_TOKENS.contains(&value) {
        return Ok(f64::NAN);
    }

    value.parse::<f64>().map_err(|_| PipelineError::NonNumeric {
        column: column.to_string(),
        row,
        value: value.to_string(),
    })
}

//! Regression metrics and the metrics record written by evaluation
//!
//! - MSE: mean of squared residuals
//! - R²: 1 - SS_res / SS_tot

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Metrics calculator
pub struct Metrics;

impl Metrics {
    /// Mean Squared Error
    pub fn mse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        assert_eq!(y_true.len(), y_pred.len(), "Arrays must have same length");

        if y_true.is_empty() {
            return 0.0;
        }

        let residuals = y_true - y_pred;
        residuals.mapv(|r| r * r).sum() / y_true.len() as f64
    }

    /// Coefficient of determination.
    ///
    /// A constant `y_true` has no variance to explain: the score is 1.0 for a
    /// perfect prediction and 0.0 otherwise.
    pub fn r2(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
        assert_eq!(y_true.len(), y_pred.len(), "Arrays must have same length");

        if y_true.is_empty() {
            return 0.0;
        }

        let mean = y_true.sum() / y_true.len() as f64;
        let ss_res: f64 = (y_true - y_pred).mapv(|r| r * r).sum();
        let ss_tot: f64 = y_true.mapv(|y| (y - mean).powi(2)).sum();

        if ss_tot == 0.0 {
            if ss_res == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - ss_res / ss_tot
        }
    }
}

/// Terminal output of the pipeline: `{"mse": .., "r2": ..}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub mse: f64,
    pub r2: f64,
}

impl MetricsRecord {
    /// Score predictions against the true targets
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.is_empty() {
            return Err(PipelineError::InsufficientData(
                "no records to evaluate".into(),
            ));
        }

        Ok(Self {
            mse: Metrics::mse(y_true, y_pred),
            r2: Metrics::r2(y_true, y_pred),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

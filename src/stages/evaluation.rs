//! Evaluation stage: score the model on the held-out split

use super::ensure_parent;
use crate::data::{Dataset, TARGET_COLUMN};
use crate::error::{PipelineError, Result};
use crate::metrics::MetricsRecord;
use crate::models::ModelArtifact;
use ndarray::Array1;
use std::path::Path;
use tracing::info;

pub fn model_evaluation(test_csv: &Path, model_path: &Path, metrics_json: &Path) -> Result<MetricsRecord> {
    info!("Loading test data and model...");
    let dataset = Dataset::load_csv(test_csv, TARGET_COLUMN)?;
    let artifact = ModelArtifact::load(model_path)?;

    if dataset.feature_names != artifact.feature_names {
        return Err(PipelineError::SchemaMismatch {
            expected: artifact.feature_names,
            actual: dataset.feature_names,
        });
    }

    let incomplete = dataset.count_incomplete();
    if incomplete > 0 {
        return Err(PipelineError::MissingValues(incomplete));
    }

    info!("Predicting {} records...", dataset.n_samples());
    let predictions = Array1::from_vec(artifact.forest.predict(&dataset));
    let metrics = MetricsRecord::compute(&dataset.targets_array(), &predictions)?;

    info!("Metrics: mse={:.6} r2={:.6}", metrics.mse, metrics.r2);

    ensure_parent(metrics_json)?;
    metrics.save(metrics_json)?;
    info!("Metrics saved to {:?}", metrics_json);

    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ForestConfig, RandomForest};

    fn linear(n: usize, names: [&str; 2]) -> Dataset {
        let mut dataset = Dataset::new(names.iter().map(|s| s.to_string()).collect());
        for i in 0..n {
            let a = i as f64;
            let b = ((i * 7) % 11) as f64;
            dataset.add_sample(vec![a, b], 0.5 * a + b);
        }
        dataset
    }

    fn save_model(dataset: &Dataset, path: &Path) {
        let mut forest = RandomForest::new(ForestConfig {
            n_estimators: 10,
            ..Default::default()
        });
        forest.fit(dataset).unwrap();
        ModelArtifact::new(forest, TARGET_COLUMN, dataset.n_samples())
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_metrics_in_range() {
        let dir = tempfile::tempdir().unwrap();
        let split = linear(100, ["a", "b"]).train_test_split(0.2, 42).unwrap();

        let test_csv = dir.path().join("test.csv");
        let model = dir.path().join("model.bin");
        let metrics_json = dir.path().join("metrics.json");
        split.test.save_csv(&test_csv).unwrap();
        save_model(&split.train, &model);

        let metrics = model_evaluation(&test_csv, &model, &metrics_json).unwrap();
        assert!(metrics.mse >= 0.0);
        assert!(metrics.r2 <= 1.0);
        assert!(metrics.r2 > 0.5, "r2 = {}", metrics.r2);

        let saved = MetricsRecord::load(&metrics_json).unwrap();
        assert!((saved.mse - metrics.mse).abs() < 1e-9);
        assert!((saved.r2 - metrics.r2).abs() < 1e-9);
    }

    #[test]
    fn test_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.bin");
        save_model(&linear(30, ["a", "b"]), &model);

        let test_csv = dir.path().join("test.csv");
        linear(10, ["b", "a"]).save_csv(&test_csv).unwrap();

        let err = model_evaluation(&test_csv, &model, &dir.path().join("m.json")).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_empty_test_set() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.bin");
        save_model(&linear(30, ["a", "b"]), &model);

        let test_csv = dir.path().join("test.csv");
        Dataset::new(vec!["a".into(), "b".into()]).save_csv(&test_csv).unwrap();

        let err = model_evaluation(&test_csv, &model, &dir.path().join("m.json")).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData(_)));
    }

    #[test]
    fn test_missing_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut train = Dataset::new(vec!["a".into()]);
        for i in 0..20 {
            train.add_sample(vec![i as f64], i as f64);
        }
        let model = dir.path().join("model.bin");
        save_model(&train, &model);

        let test_csv = dir.path().join("test.csv");
        std::fs::write(&test_csv, "a,target\n1,1\n2,\n").unwrap();
        let metrics_json = dir.path().join("m.json");

        let err = model_evaluation(&test_csv, &model, &metrics_json).unwrap_err();
        assert!(matches!(err, PipelineError::MissingValues(1)));
        assert!(!metrics_json.exists());
    }
}

//! End-to-end runs of the housing pipeline on a local synthetic table

use housing_pipeline::config::PipelineConfig;
use housing_pipeline::models::ModelArtifact;
use housing_pipeline::pipeline::{LocalRunner, PipelineSpec, Workflow};
use housing_pipeline::{Dataset, MetricsRecord, PipelineError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Write a small housing-like table where the target depends on two features
fn write_synthetic_csv(path: &Path, n: usize) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut out = String::from("MedInc,HouseAge,AveRooms,Latitude,target\n");
    for i in 0..n {
        let med_inc: f64 = rng.gen_range(0.5..10.0);
        let age: f64 = rng.gen_range(1.0..52.0);
        let rooms: f64 = rng.gen_range(2.0..8.0);
        let lat: f64 = rng.gen_range(32.0..42.0);
        let target = 0.4 * med_inc + 0.01 * age + rng.gen_range(-0.1..0.1);
        if i % 25 == 0 {
            // incomplete record, dropped by preprocessing
            out.push_str(&format!("{:.4},,{:.4},{:.4},{:.4}\n", med_inc, rooms, lat, target));
        } else {
            out.push_str(&format!(
                "{:.4},{:.1},{:.4},{:.4},{:.4}\n",
                med_inc, age, rooms, lat, target
            ));
        }
    }
    fs::write(path, out).unwrap();
}

fn small_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.forest.n_estimators = 10;
    config
}

fn arguments(data_url: &Path) -> BTreeMap<String, String> {
    let mut args = BTreeMap::new();
    args.insert("data_url".to_string(), data_url.display().to_string());
    args
}

#[test]
fn test_local_run_produces_every_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw.csv");
    write_synthetic_csv(&raw, 300);

    let workdir = dir.path().join("run");
    let runner = LocalRunner::new(small_config()).with_workdir(&workdir);
    let summary = runner.run(&PipelineSpec::housing(), &arguments(&raw)).unwrap();

    let extracted = summary.output("data-extraction", "output_csv").unwrap();
    let train = summary.output("data-preprocessing", "train_csv").unwrap();
    let test = summary.output("data-preprocessing", "test_csv").unwrap();
    let model = summary.output("model-training", "model").unwrap();
    let metrics = summary.output("model-evaluation", "metrics_json").unwrap();

    for path in [extracted, train, test, model, metrics] {
        assert!(path.exists(), "missing {:?}", path);
        assert!(path.starts_with(&workdir));
    }
    assert_eq!(metrics, workdir.join("model-evaluation").join("metrics_json.json"));

    // 12 of 300 rows have a missing cell
    let train_set = Dataset::load_csv(train, "target").unwrap();
    let test_set = Dataset::load_csv(test, "target").unwrap();
    assert_eq!(train_set.n_samples() + test_set.n_samples(), 288);
    assert_eq!(test_set.n_samples(), 58);

    let artifact = ModelArtifact::load(model).unwrap();
    assert_eq!(artifact.forest.n_trees(), 10);
    assert_eq!(artifact.n_train_samples, 230);

    let record = MetricsRecord::load(metrics).unwrap();
    assert!(record.mse >= 0.0);
    assert!(record.r2 <= 1.0);
    assert!(record.r2 > 0.5, "r2 = {}", record.r2);
}

#[test]
fn test_runs_are_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw.csv");
    write_synthetic_csv(&raw, 150);

    let read_metrics = |name: &str| {
        let runner = LocalRunner::new(small_config()).with_workdir(dir.path().join(name));
        let summary = runner.run(&PipelineSpec::housing(), &arguments(&raw)).unwrap();
        let path = summary.output("model-evaluation", "metrics_json").unwrap();
        fs::read_to_string(path).unwrap()
    };

    assert_eq!(read_metrics("a"), read_metrics("b"));
}

#[test]
fn test_compiled_workflow_runs() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw.csv");
    write_synthetic_csv(&raw, 120);

    let yaml = dir.path().join("pipeline.yaml");
    Workflow::compile(&PipelineSpec::housing())
        .unwrap()
        .save(&yaml)
        .unwrap();

    let workflow = Workflow::load(&yaml).unwrap();
    assert_eq!(workflow.pipeline, PipelineSpec::housing());
    assert_eq!(workflow.components.len(), 4);

    let runner = LocalRunner::new(small_config()).with_workdir(dir.path().join("run"));
    let summary = runner.run(&workflow.pipeline, &arguments(&raw)).unwrap();
    assert!(summary
        .output("model-evaluation", "metrics_json")
        .unwrap()
        .exists());
}

#[test]
fn test_missing_target_column_fails_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw.csv");
    fs::write(&raw, "a,b\n1,2\n3,4\n").unwrap();

    let runner = LocalRunner::new(small_config()).with_workdir(dir.path().join("run"));
    let err = runner
        .run(&PipelineSpec::housing(), &arguments(&raw))
        .unwrap_err();

    match err {
        PipelineError::TaskFailed { task, source } => {
            assert_eq!(task, "data-extraction");
            assert!(matches!(*source, PipelineError::MissingColumn(_)));
        }
        other => panic!("unexpected error: {}", other),
    }
}

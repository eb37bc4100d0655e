//! Sequential local runner

use super::spec::{Argument, PipelineSpec};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::stages::{StageEnv, StageIo};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Where a run put each task's outputs
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    outputs: BTreeMap<String, BTreeMap<String, PathBuf>>,
}

impl RunSummary {
    pub fn output(&self, task: &str, output: &str) -> Option<&Path> {
        self.outputs
            .get(task)
            .and_then(|o| o.get(output))
            .map(PathBuf::as_path)
    }

    /// (task, output, path) triples in task-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Path)> {
        self.outputs.iter().flat_map(|(task, outputs)| {
            outputs
                .iter()
                .map(move |(name, path)| (task.as_str(), name.as_str(), path.as_path()))
        })
    }
}

/// Runs every task of a pipeline once, in dependency order, on this machine.
///
/// Output `<name>` of task `<task>` goes to `<workdir>/<task>/<name>.<ext>`.
/// The first failing task aborts the run.
pub struct LocalRunner {
    env: StageEnv,
    workdir: PathBuf,
}

impl LocalRunner {
    pub fn new(config: PipelineConfig) -> Self {
        let workdir = config.run.workdir.clone();
        Self {
            env: StageEnv::new(config),
            workdir,
        }
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn run(&self, pipeline: &PipelineSpec, arguments: &BTreeMap<String, String>) -> Result<RunSummary> {
        pipeline.validate()?;
        let params = resolve_parameters(pipeline, arguments)?;
        let order = pipeline.execution_order()?;

        info!(
            "Running pipeline '{}' ({} tasks) in {:?}",
            pipeline.name,
            order.len(),
            self.workdir
        );

        let mut summary = RunSummary::default();

        for task in order {
            let mut io = StageIo::new();

            for (input, argument) in &task.arguments {
                io = match argument {
                    Argument::Parameter(name) => io.with_value(input, params[name].clone()),
                    Argument::Value(value) => io.with_value(input, value.clone()),
                    Argument::TaskOutput { task: upstream, output } => {
                        let path = summary.output(upstream, output).ok_or_else(|| {
                            PipelineError::Graph(format!(
                                "output '{}' of task '{}' not produced",
                                output, upstream
                            ))
                        })?;
                        io.with_path(input, path.to_path_buf())
                    }
                };
            }

            let mut produced = BTreeMap::new();
            for output in task.component.spec().outputs {
                let mut path = self.workdir.join(&task.name).join(&output.name);
                if let Some(ext) = output.io_type.extension() {
                    path.set_extension(ext);
                }
                io = io.with_path(&output.name, path.clone());
                produced.insert(output.name, path);
            }

            info!("Running task '{}'", task.name);
            let start = Instant::now();
            task.component
                .execute(&self.env, &io)
                .map_err(|e| PipelineError::TaskFailed {
                    task: task.name.clone(),
                    source: Box::new(e),
                })?;
            info!(
                "Task '{}' finished in {:.2}s",
                task.name,
                start.elapsed().as_secs_f64()
            );

            summary.outputs.insert(task.name.clone(), produced);
        }

        Ok(summary)
    }
}

/// Supplied arguments over declared defaults; every parameter must end up bound
fn resolve_parameters(
    pipeline: &PipelineSpec,
    arguments: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    for name in arguments.keys() {
        if !pipeline.parameters.iter().any(|p| &p.name == name) {
            return Err(PipelineError::Graph(format!("unknown parameter '{}'", name)));
        }
    }

    pipeline
        .parameters
        .iter()
        .map(|p| {
            arguments
                .get(&p.name)
                .or(p.default.as_ref())
                .map(|v| (p.name.clone(), v.clone()))
                .ok_or_else(|| PipelineError::Graph(format!("parameter '{}' has no value", p.name)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::spec::ParameterSpec;

    #[test]
    fn test_parameter_resolution() {
        let pipeline = PipelineSpec::housing();

        let params = resolve_parameters(&pipeline, &BTreeMap::new()).unwrap();
        assert_eq!(params["data_url"], "california_housing");

        let mut args = BTreeMap::new();
        args.insert("data_url".to_string(), "data/raw.csv".to_string());
        let params = resolve_parameters(&pipeline, &args).unwrap();
        assert_eq!(params["data_url"], "data/raw.csv");

        args.insert("bogus".to_string(), "x".to_string());
        assert!(resolve_parameters(&pipeline, &args).is_err());
    }

    #[test]
    fn test_parameter_without_default() {
        let mut pipeline = PipelineSpec::housing();
        pipeline.parameters = vec![ParameterSpec {
            name: "data_url".into(),
            default: None,
        }];
        assert!(resolve_parameters(&pipeline, &BTreeMap::new()).is_err());
    }

    #[test]
    fn test_failing_task_is_named() {
        let dir = tempfile::tempdir().unwrap();
        let runner = LocalRunner::new(PipelineConfig::default()).with_workdir(dir.path());

        let mut args = BTreeMap::new();
        args.insert(
            "data_url".to_string(),
            dir.path().join("does-not-exist.csv").display().to_string(),
        );

        let err = runner.run(&PipelineSpec::housing(), &args).unwrap_err();
        assert!(matches!(err, PipelineError::TaskFailed { ref task, .. } if task == "data-extraction"));
    }
}

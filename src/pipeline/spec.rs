//! Pipeline definition: tasks, argument bindings and the compiled workflow file

use crate::error::{PipelineError, Result};
use crate::source::CALIFORNIA_HOUSING;
use crate::stages::{Component, ComponentSpec, IoType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;

/// Version tag written into compiled workflow files
pub const WORKFLOW_API_VERSION: &str = "housing-pipeline/v1";

/// Where a task input gets its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Argument {
    /// Pipeline parameter, by name
    Parameter(String),
    /// Literal string
    Value(String),
    /// Output of an upstream task
    TaskOutput { task: String, output: String },
}

impl Argument {
    pub fn task_output(task: &str, output: &str) -> Self {
        Argument::TaskOutput {
            task: task.to_string(),
            output: output.to_string(),
        }
    }
}

/// A pipeline-level string parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// One use of a component in the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,
    pub component: Component,
    pub arguments: BTreeMap<String, Argument>,
}

impl TaskSpec {
    pub fn new(name: &str, component: Component) -> Self {
        Self {
            name: name.to_string(),
            component,
            arguments: BTreeMap::new(),
        }
    }

    pub fn arg(mut self, input: &str, argument: Argument) -> Self {
        self.arguments.insert(input.to_string(), argument);
        self
    }

    /// Names of the upstream tasks this task consumes outputs from
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = self
            .arguments
            .values()
            .filter_map(|arg| match arg {
                Argument::TaskOutput { task, .. } => Some(task.as_str()),
                _ => None,
            })
            .collect();
        deps.sort_unstable();
        deps.dedup();
        deps
    }
}

/// A DAG of tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
    pub tasks: Vec<TaskSpec>,
}

impl PipelineSpec {
    /// The housing pipeline:
    /// extraction -> preprocessing -> {training, evaluation}, training -> evaluation
    pub fn housing() -> Self {
        Self {
            name: "housing-pipeline".to_string(),
            description: "Train and evaluate a Random Forest on a housing dataset.".to_string(),
            parameters: vec![ParameterSpec {
                name: "data_url".to_string(),
                default: Some(CALIFORNIA_HOUSING.to_string()),
            }],
            tasks: vec![
                TaskSpec::new("data-extraction", Component::DataExtraction)
                    .arg("data_url", Argument::Parameter("data_url".to_string())),
                TaskSpec::new("data-preprocessing", Component::DataPreprocessing).arg(
                    "input_csv",
                    Argument::task_output("data-extraction", "output_csv"),
                ),
                TaskSpec::new("model-training", Component::ModelTraining).arg(
                    "train_csv",
                    Argument::task_output("data-preprocessing", "train_csv"),
                ),
                TaskSpec::new("model-evaluation", Component::ModelEvaluation)
                    .arg(
                        "test_csv",
                        Argument::task_output("data-preprocessing", "test_csv"),
                    )
                    .arg("model", Argument::task_output("model-training", "model")),
            ],
        }
    }

    pub fn task(&self, name: &str) -> Option<&TaskSpec> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Check names, bindings and types, and that the graph is acyclic
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.name.as_str()) {
                return Err(PipelineError::Graph(format!("duplicate task '{}'", task.name)));
            }
        }

        let params: HashSet<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();

        for task in &self.tasks {
            let spec = task.component.spec();
            self.check_bindings(task, &spec, &params)?;
        }

        self.execution_order().map(|_| ())
    }

    fn check_bindings(
        &self,
        task: &TaskSpec,
        spec: &ComponentSpec,
        params: &HashSet<&str>,
    ) -> Result<()> {
        for input in &spec.inputs {
            if !task.arguments.contains_key(&input.name) {
                return Err(PipelineError::Graph(format!(
                    "task '{}' leaves input '{}' unbound",
                    task.name, input.name
                )));
            }
        }

        for (input_name, argument) in &task.arguments {
            let input = spec.input(input_name).ok_or_else(|| {
                PipelineError::Graph(format!(
                    "task '{}': component '{}' has no input '{}'",
                    task.name, spec.name, input_name
                ))
            })?;

            let bound_type = match argument {
                Argument::Parameter(name) => {
                    if !params.contains(name.as_str()) {
                        return Err(PipelineError::Graph(format!(
                            "task '{}' references unknown parameter '{}'",
                            task.name, name
                        )));
                    }
                    IoType::String
                }
                Argument::Value(_) => IoType::String,
                Argument::TaskOutput { task: upstream, output } => {
                    let producer = self.task(upstream).ok_or_else(|| {
                        PipelineError::Graph(format!(
                            "task '{}' references unknown task '{}'",
                            task.name, upstream
                        ))
                    })?;
                    producer
                        .component
                        .spec()
                        .output(output)
                        .map(|o| o.io_type)
                        .ok_or_else(|| {
                            PipelineError::Graph(format!(
                                "task '{}' has no output '{}'",
                                upstream, output
                            ))
                        })?
                }
            };

            if bound_type != input.io_type {
                return Err(PipelineError::Graph(format!(
                    "task '{}': input '{}' expects {:?}, bound to {:?}",
                    task.name, input_name, input.io_type, bound_type
                )));
            }
        }
        Ok(())
    }

    /// Topological order of the tasks; ties keep declaration order
    pub fn execution_order(&self) -> Result<Vec<&TaskSpec>> {
        let index: HashMap<&str, usize> = self
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.as_str(), i))
            .collect();

        let mut in_degree = vec![0usize; self.tasks.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.tasks.len()];

        for (i, task) in self.tasks.iter().enumerate() {
            for dep in task.dependencies() {
                let &d = index.get(dep).ok_or_else(|| {
                    PipelineError::Graph(format!(
                        "task '{}' depends on unknown task '{}'",
                        task.name, dep
                    ))
                })?;
                in_degree[i] += 1;
                dependents[d].push(i);
            }
        }

        let mut ready: VecDeque<usize> = (0..self.tasks.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(self.tasks.len());

        while let Some(i) = ready.pop_front() {
            order.push(&self.tasks[i]);
            for &next in &dependents[i] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        if order.len() != self.tasks.len() {
            let stuck: Vec<&str> = self
                .tasks
                .iter()
                .enumerate()
                .filter(|(i, _)| in_degree[*i] > 0)
                .map(|(_, t)| t.name.as_str())
                .collect();
            return Err(PipelineError::Graph(format!("cycle among tasks {:?}", stuck)));
        }

        Ok(order)
    }
}

/// Compiled, self-describing workflow file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub api_version: String,
    pub pipeline: PipelineSpec,
    pub components: Vec<ComponentSpec>,
}

impl Workflow {
    /// Validate the pipeline and bundle the interfaces of the components it uses
    pub fn compile(pipeline: &PipelineSpec) -> Result<Self> {
        pipeline.validate()?;

        let mut components: Vec<ComponentSpec> = Vec::new();
        for task in &pipeline.tasks {
            let spec = task.component.spec();
            if !components.iter().any(|c| c.name == spec.name) {
                components.push(spec);
            }
        }

        Ok(Self {
            api_version: WORKFLOW_API_VERSION.to_string(),
            pipeline: pipeline.clone(),
            components,
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Load a compiled workflow and re-validate its pipeline
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let workflow: Workflow = serde_yaml::from_str(&content)?;

        if workflow.api_version != WORKFLOW_API_VERSION {
            return Err(PipelineError::Graph(format!(
                "unsupported workflow version '{}'",
                workflow.api_version
            )));
        }
        workflow.pipeline.validate()?;
        Ok(workflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names<'a>(tasks: &[&'a TaskSpec]) -> Vec<&'a str> {
        tasks.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_housing_pipeline_order() {
        let pipeline = PipelineSpec::housing();
        pipeline.validate().unwrap();

        let order = pipeline.execution_order().unwrap();
        assert_eq!(
            names(&order),
            vec![
                "data-extraction",
                "data-preprocessing",
                "model-training",
                "model-evaluation"
            ]
        );
        assert_eq!(
            pipeline.task("model-evaluation").unwrap().dependencies(),
            vec!["data-preprocessing", "model-training"]
        );
    }

    #[test]
    fn test_order_ignores_declaration_order() {
        let mut pipeline = PipelineSpec::housing();
        pipeline.tasks.reverse();

        let order = pipeline.execution_order().unwrap();
        assert_eq!(order[0].name, "data-extraction");
        assert_eq!(order[3].name, "model-evaluation");
    }

    #[test]
    fn test_cycle_detected() {
        let mut pipeline = PipelineSpec::housing();
        pipeline.tasks[0] = TaskSpec::new("data-extraction", Component::DataExtraction).arg(
            "data_url",
            Argument::task_output("model-evaluation", "metrics_json"),
        );

        let err = pipeline.execution_order().unwrap_err();
        assert!(matches!(err, PipelineError::Graph(msg) if msg.contains("cycle")));
    }

    #[test]
    fn test_unbound_and_unknown_references() {
        let mut pipeline = PipelineSpec::housing();
        pipeline.tasks[3].arguments.remove("model");
        assert!(pipeline.validate().is_err());

        let mut pipeline = PipelineSpec::housing();
        pipeline.tasks[2]
            .arguments
            .insert("train_csv".into(), Argument::task_output("data-preprocessing", "nope"));
        assert!(pipeline.validate().is_err());

        let mut pipeline = PipelineSpec::housing();
        pipeline.tasks[0]
            .arguments
            .insert("data_url".into(), Argument::Parameter("missing".into()));
        assert!(pipeline.validate().is_err());
    }

    #[test]
    fn test_type_mismatch() {
        let mut pipeline = PipelineSpec::housing();
        pipeline.tasks[3]
            .arguments
            .insert("model".into(), Argument::task_output("data-preprocessing", "test_csv"));

        let err = pipeline.validate().unwrap_err();
        assert!(matches!(err, PipelineError::Graph(msg) if msg.contains("expects")));
    }

    #[test]
    fn test_workflow_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");

        let workflow = Workflow::compile(&PipelineSpec::housing()).unwrap();
        assert_eq!(workflow.components.len(), 4);
        workflow.save(&path).unwrap();

        let yaml = std::fs::read_to_string(&path).unwrap();
        assert!(yaml.contains("api_version: housing-pipeline/v1"));
        assert!(yaml.contains("component: model-training"));

        assert_eq!(Workflow::load(&path).unwrap(), workflow);
    }
}

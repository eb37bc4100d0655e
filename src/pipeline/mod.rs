//! Pipeline definition, compilation and local execution

mod runner;
mod spec;

pub use runner::{LocalRunner, RunSummary};
pub use spec::{Argument, ParameterSpec, PipelineSpec, TaskSpec, Workflow, WORKFLOW_API_VERSION};

//! Pipeline stages (components)
//!
//! Each component declares named inputs and outputs. Outputs are always file
//! paths chosen by whoever runs the component, and a stage only writes the
//! paths it declares.

mod evaluation;
mod extraction;
mod preprocessing;
mod training;

pub use evaluation::model_evaluation;
pub use extraction::data_extraction;
pub use preprocessing::{data_preprocessing, PreprocessReport};
pub use training::model_training;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::source::DatasetClient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Type of a component input or output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IoType {
    /// Plain string value
    String,
    /// CSV dataset file
    Csv,
    /// Binary model artifact
    Model,
    /// JSON metrics record
    Json,
}

impl IoType {
    /// File extension used for artifacts of this type
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            IoType::String => None,
            IoType::Csv => Some("csv"),
            IoType::Model => Some("bin"),
            IoType::Json => Some("json"),
        }
    }
}

/// One declared input or output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub io_type: IoType,
}

impl IoSpec {
    fn new(name: &str, io_type: IoType) -> Self {
        Self {
            name: name.to_string(),
            io_type,
        }
    }
}

/// Declarative interface of a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    pub description: String,
    pub inputs: Vec<IoSpec>,
    pub outputs: Vec<IoSpec>,
}

impl ComponentSpec {
    pub fn input(&self, name: &str) -> Option<&IoSpec> {
        self.inputs.iter().find(|io| io.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&IoSpec> {
        self.outputs.iter().find(|io| io.name == name)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// The four pipeline components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Component {
    DataExtraction,
    DataPreprocessing,
    ModelTraining,
    ModelEvaluation,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::DataExtraction,
        Component::DataPreprocessing,
        Component::ModelTraining,
        Component::ModelEvaluation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Component::DataExtraction => "data-extraction",
            Component::DataPreprocessing => "data-preprocessing",
            Component::ModelTraining => "model-training",
            Component::ModelEvaluation => "model-evaluation",
        }
    }

    pub fn spec(&self) -> ComponentSpec {
        let (description, inputs, outputs) = match self {
            Component::DataExtraction => (
                "Loads the dataset named by data_url and writes it as CSV.",
                vec![IoSpec::new("data_url", IoType::String)],
                vec![IoSpec::new("output_csv", IoType::Csv)],
            ),
            Component::DataPreprocessing => (
                "Drops records with missing values and splits into train/test sets.",
                vec![IoSpec::new("input_csv", IoType::Csv)],
                vec![
                    IoSpec::new("train_csv", IoType::Csv),
                    IoSpec::new("test_csv", IoType::Csv),
                ],
            ),
            Component::ModelTraining => (
                "Trains a Random Forest regressor and saves the model.",
                vec![IoSpec::new("train_csv", IoType::Csv)],
                vec![IoSpec::new("model", IoType::Model)],
            ),
            Component::ModelEvaluation => (
                "Evaluates the model on the test set and saves metrics.",
                vec![
                    IoSpec::new("test_csv", IoType::Csv),
                    IoSpec::new("model", IoType::Model),
                ],
                vec![IoSpec::new("metrics_json", IoType::Json)],
            ),
        };

        ComponentSpec {
            name: self.name().to_string(),
            description: description.to_string(),
            inputs,
            outputs,
        }
    }

    /// Run the component with every input and output already resolved
    pub fn execute(&self, env: &StageEnv, io: &StageIo) -> Result<()> {
        match self {
            Component::DataExtraction => {
                data_extraction(env.client()?, io.value("data_url")?, io.path("output_csv")?)?;
            }
            Component::DataPreprocessing => {
                data_preprocessing(
                    io.path("input_csv")?,
                    io.path("train_csv")?,
                    io.path("test_csv")?,
                    &env.config.split,
                )?;
            }
            Component::ModelTraining => {
                model_training(io.path("train_csv")?, io.path("model")?, &env.config.forest)?;
            }
            Component::ModelEvaluation => {
                model_evaluation(
                    io.path("test_csv")?,
                    io.path("model")?,
                    io.path("metrics_json")?,
                )?;
            }
        }
        Ok(())
    }
}

/// Shared state for running stages: configuration plus a lazily built HTTP client
pub struct StageEnv {
    pub config: PipelineConfig,
    client: std::cell::OnceCell<DatasetClient>,
}

impl StageEnv {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            client: std::cell::OnceCell::new(),
        }
    }

    pub fn client(&self) -> Result<&DatasetClient> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = DatasetClient::new(&self.config.source)?;
        Ok(self.client.get_or_init(|| client))
    }
}

/// Resolved values for one component invocation, keyed by input/output name
#[derive(Debug, Clone, Default)]
pub struct StageIo {
    values: BTreeMap<String, String>,
    paths: BTreeMap<String, PathBuf>,
}

impl StageIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: &str, value: impl Into<String>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn with_path(mut self, name: &str, path: impl Into<PathBuf>) -> Self {
        self.paths.insert(name.to_string(), path.into());
        self
    }

    pub fn value(&self, name: &str) -> Result<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| PipelineError::Graph(format!("no value bound for '{}'", name)))
    }

    pub fn path(&self, name: &str) -> Result<&Path> {
        self.paths
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| PipelineError::Graph(format!("no path bound for '{}'", name)))
    }
}

/// Create the parent directory of an output path
pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

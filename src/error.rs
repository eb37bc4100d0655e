//! Error types for the housing pipeline library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised by pipeline stages, the runner and the data source client
#[derive(Error, Debug)]
pub enum PipelineError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading/writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML config parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Model artifact (de)serialization error
    #[error("Model encoding error: {0}")]
    ModelEncoding(#[from] bincode::Error),

    /// Downloaded archive does not match the expected digest
    #[error("Checksum mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// A required column is absent from a table
    #[error("Missing column '{0}'")]
    MissingColumn(String),

    /// A cell could not be parsed as a number
    #[error("Non-numeric value '{value}' in column '{column}' at row {row}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    /// A stage received no usable rows
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Rows with missing values reached a stage that needs complete records
    #[error("{0} records contain missing values")]
    MissingValues(usize),

    /// Test columns do not line up with what the model was trained on
    #[error("Schema mismatch: model expects {expected:?}, data has {actual:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// File is not a model artifact, or was written by an incompatible version
    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),

    /// Data source locator or archive layout is not usable
    #[error("Data source error: {0}")]
    DataSource(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Pipeline graph is malformed
    #[error("Invalid pipeline: {0}")]
    Graph(String),

    /// A task of a pipeline run failed
    #[error("Task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<PipelineError>,
    },
}

//! Configuration management
//!
//! Every value has a default, so an empty file (or no file) reproduces the
//! stock pipeline: 80/20 split with seed 42 and a 100-tree forest.

use crate::data::TARGET_COLUMN;
use crate::error::{PipelineError, Result};
use crate::models::ForestConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the dataset cache directory
pub const DATA_HOME_ENV: &str = "HOUSING_PIPELINE_DATA";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where extraction reads from and caches to
    pub source: SourceConfig,
    /// Train/test split
    pub split: SplitConfig,
    /// Random Forest hyperparameters
    pub forest: ForestConfig,
    /// Local runner settings
    pub run: RunConfig,
}

/// Data source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Download cache; falls back to `$HOUSING_PIPELINE_DATA`, then `~/housing_pipeline_data`
    pub data_home: Option<PathBuf>,
    /// Target column name in generic CSV sources
    pub target_column: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            data_home: None,
            target_column: TARGET_COLUMN.to_string(),
        }
    }
}

impl SourceConfig {
    /// Resolve the cache directory
    pub fn data_home(&self) -> PathBuf {
        if let Some(dir) = &self.data_home {
            return dir.clone();
        }
        if let Some(dir) = std::env::var_os(DATA_HOME_ENV) {
            return PathBuf::from(dir);
        }
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("housing_pipeline_data")
    }
}

/// Train/test split configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of records held out for evaluation
    pub test_size: f64,
    /// Shuffle seed
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
        }
    }
}

/// Local runner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory receiving every task's outputs
    pub workdir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("runs/latest"),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from TOML file
    pub fn from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from JSON file
    pub fn from_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load by extension (`.toml`, anything else is JSON) and validate
    pub fn load(path: &Path) -> Result<Self> {
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(path)?,
            _ => Self::from_json(path)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.split.test_size > 0.0 && self.split.test_size < 1.0) {
            return Err(PipelineError::Config(format!(
                "split.test_size must be in (0, 1), got {}",
                self.split.test_size
            )));
        }
        if self.source.target_column.trim().is_empty() {
            return Err(PipelineError::Config(
                "source.target_column must not be empty".into(),
            ));
        }
        self.forest.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.split.test_size, 0.2);
        assert_eq!(config.split.seed, 42);
        assert_eq!(config.forest.n_estimators, 100);
        assert_eq!(config.forest.seed, 42);
        assert_eq!(config.source.target_column, "target");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[forest]\nn_estimators = 10\n\n[source]\ndata_home = \"/tmp/cache\"").unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.forest.n_estimators, 10);
        assert_eq!(config.forest.seed, 42);
        assert_eq!(config.split, SplitConfig::default());
        assert_eq!(config.source.data_home(), PathBuf::from("/tmp/cache"));
    }

    #[test]
    fn test_json_config() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"split": {{"test_size": 0.25, "seed": 1}}}}"#).unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.split.test_size, 0.25);
        assert_eq!(config.split.seed, 1);
    }

    #[test]
    fn test_config_validation() {
        let mut config = PipelineConfig::default();
        config.split.test_size = 1.5;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.forest.min_samples_leaf = 0;
        assert!(config.validate().is_err());
    }
}

//! Data source locators

use super::california::CALIFORNIA_HOUSING_URL;
use crate::error::{PipelineError, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Locator value selecting the bundled California housing dataset
pub const CALIFORNIA_HOUSING: &str = "california_housing";

/// Unlabelled variant of the same census table (text `ocean_proximity`
/// column, no `target`); it resolves to the builtin dataset
pub const HANDSON_ML_HOUSING_URL: &str =
    "https://raw.githubusercontent.com/ageron/handson-ml/master/datasets/housing/housing.tgz";

/// Where extraction pulls its table from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// California housing, downloaded once and cached
    CaliforniaHousing,
    /// CSV over HTTP(S)
    RemoteCsv(String),
    /// Gzip tarball over HTTP(S); the first `.csv` member is used
    RemoteArchive(String),
    /// CSV on disk
    LocalCsv(PathBuf),
    /// Gzip tarball on disk
    LocalArchive(PathBuf),
}

impl DataSource {
    /// Interpret a locator string.
    ///
    /// Empty, `california_housing`, `builtin:california_housing`, the
    /// canonical archive URL and the handson-ml housing archive all select
    /// the California housing dataset.
    pub fn parse(locator: &str) -> Result<Self> {
        let locator = locator.trim();

        if locator.is_empty()
            || locator == CALIFORNIA_HOUSING
            || locator == format!("builtin:{}", CALIFORNIA_HOUSING)
            || locator == CALIFORNIA_HOUSING_URL
            || locator == HANDSON_ML_HOUSING_URL
        {
            return Ok(DataSource::CaliforniaHousing);
        }

        let lower = locator.to_ascii_lowercase();
        let is_archive = lower.ends_with(".tgz") || lower.ends_with(".tar.gz");
        let is_csv = lower.ends_with(".csv");

        if lower.starts_with("http://") || lower.starts_with("https://") {
            return if is_archive {
                Ok(DataSource::RemoteArchive(locator.to_string()))
            } else if is_csv {
                Ok(DataSource::RemoteCsv(locator.to_string()))
            } else {
                Err(PipelineError::DataSource(format!(
                    "unsupported remote source '{}': expected .csv, .tgz or .tar.gz",
                    locator
                )))
            };
        }

        if lower.contains("://") {
            return Err(PipelineError::DataSource(format!(
                "unsupported scheme in '{}'",
                locator
            )));
        }

        let path = Path::new(locator.strip_prefix("file:").unwrap_or(locator)).to_path_buf();
        if is_archive {
            Ok(DataSource::LocalArchive(path))
        } else if is_csv {
            Ok(DataSource::LocalCsv(path))
        } else {
            Err(PipelineError::DataSource(format!(
                "unsupported local source '{}': expected .csv, .tgz or .tar.gz",
                locator
            )))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::CaliforniaHousing => write!(f, "{}", CALIFORNIA_HOUSING),
            DataSource::RemoteCsv(url) | DataSource::RemoteArchive(url) => write!(f, "{}", url),
            DataSource::LocalCsv(path) | DataSource::LocalArchive(path) => {
                write!(f, "{}", path.display())
            }
        }
    }
}

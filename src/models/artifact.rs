//! Trained model artifact: header + bincode payload

use super::random_forest::RandomForest;
use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 8] = b"HPRFMODL";
const FORMAT_VERSION: u32 = 1;

/// Serialized output of the training stage, consumed by evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Fitted forest
    pub forest: RandomForest,
    /// Feature columns in the order the forest expects them
    pub feature_names: Vec<String>,
    /// Target column the forest predicts
    pub target_name: String,
    /// Number of training records
    pub n_train_samples: usize,
    /// When training finished
    pub created_at: DateTime<Utc>,
}

impl ModelArtifact {
    pub fn new(forest: RandomForest, target_name: impl Into<String>, n_train_samples: usize) -> Self {
        Self {
            feature_names: forest.feature_names().to_vec(),
            forest,
            target_name: target_name.into(),
            n_train_samples,
            created_at: Utc::now(),
        }
    }

    /// Save artifact to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Load artifact from file
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 8];
        reader
            .read_exact(&mut magic)
            .map_err(|_| PipelineError::InvalidArtifact("file too short".into()))?;
        if &magic != MAGIC {
            return Err(PipelineError::InvalidArtifact("bad magic header".into()));
        }

        let mut version = [0u8; 4];
        reader
            .read_exact(&mut version)
            .map_err(|_| PipelineError::InvalidArtifact("missing format version".into()))?;
        let version = u32::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(PipelineError::InvalidArtifact(format!(
                "unsupported format version {} (expected {})",
                version, FORMAT_VERSION
            )));
        }

        Ok(bincode::deserialize_from(reader)?)
    }
}

//! Training stage: fit the forest and persist the model artifact

use super::ensure_parent;
use crate::data::{Dataset, TARGET_COLUMN};
use crate::error::Result;
use crate::models::{ForestConfig, ModelArtifact, RandomForest};
use std::path::Path;
use std::time::Instant;
use tracing::info;

pub fn model_training(train_csv: &Path, model_path: &Path, config: &ForestConfig) -> Result<ModelArtifact> {
    info!("Loading training data from {:?}", train_csv);
    let dataset = Dataset::load_csv(train_csv, TARGET_COLUMN)?;

    info!(
        "Training Random Forest with {} trees on {} records",
        config.n_estimators,
        dataset.n_samples()
    );
    let start_time = Instant::now();
    let mut forest = RandomForest::new(config.clone());
    forest.fit(&dataset)?;
    info!("Training completed in {:.2}s", start_time.elapsed().as_secs_f64());

    for (name, importance) in forest.feature_importance_ranking().iter().take(5) {
        info!("  importance {:<12} {:.4}", name, importance);
    }

    let artifact = ModelArtifact::new(forest, dataset.target_name.clone(), dataset.n_samples());
    ensure_parent(model_path)?;
    artifact.save(model_path)?;
    info!("Model saved to {:?}", model_path);

    Ok(artifact)
}

//! Random Forest regressor

use super::decision_tree::{DecisionTree, TreeConfig};
use crate::data::Dataset;
use crate::error::{PipelineError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Random Forest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_estimators: usize,
    /// Maximum depth of each tree (None = fully grown)
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (None = all)
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random seed
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::Config("n_estimators must be > 0".into()));
        }
        if self.min_samples_split < 2 {
            return Err(PipelineError::Config("min_samples_split must be >= 2".into()));
        }
        if self.min_samples_leaf == 0 {
            return Err(PipelineError::Config("min_samples_leaf must be >= 1".into()));
        }
        if self.max_depth == Some(0) || self.max_features == Some(0) {
            return Err(PipelineError::Config(
                "max_depth and max_features must be > 0 when set".into(),
            ));
        }
        Ok(())
    }
}

/// Random Forest model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    feature_names: Vec<String>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    /// Create a new random forest
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            feature_names: Vec::new(),
            feature_importances: Vec::new(),
        }
    }

    /// Train the random forest.
    ///
    /// Tree `i` draws its bootstrap sample and its own split seed from a
    /// ChaCha8 stream seeded with `seed + i`, so the fitted forest does not
    /// depend on how rayon schedules the trees.
    pub fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        self.config.validate()?;

        if dataset.is_empty() {
            return Err(PipelineError::InsufficientData(
                "cannot fit a forest on an empty dataset".into(),
            ));
        }

        let incomplete = dataset.count_incomplete();
        if incomplete > 0 {
            return Err(PipelineError::MissingValues(incomplete));
        }

        self.feature_names = dataset.feature_names.clone();
        let n_samples = dataset.n_samples();
        let n_features = dataset.n_features();

        // Build trees in parallel
        let trees: Vec<DecisionTree> = (0..self.config.n_estimators)
            .into_par_iter()
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(i as u64));

                let indices: Vec<usize> = if self.config.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let tree_config = TreeConfig {
                    max_depth: self.config.max_depth,
                    min_samples_split: self.config.min_samples_split,
                    min_samples_leaf: self.config.min_samples_leaf,
                    max_features: self.config.max_features,
                    seed: rng.gen(),
                };

                let mut tree = DecisionTree::new(tree_config);
                tree.fit_indices(dataset, &indices);
                tree
            })
            .collect();

        self.trees = trees;

        // Aggregate feature importances
        self.feature_importances = vec![0.0; n_features];
        for tree in &self.trees {
            for (i, &imp) in tree.feature_importances().iter().enumerate() {
                self.feature_importances[i] += imp;
            }
        }

        // Normalize
        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }

        debug!(
            "Fitted {} trees, mean depth {:.1}",
            self.trees.len(),
            self.trees.iter().map(|t| t.depth()).sum::<usize>() as f64 / self.trees.len() as f64
        );

        Ok(())
    }

    /// Predict for a single sample: mean of the tree predictions
    pub fn predict_one(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }

        self.trees.iter().map(|t| t.predict_one(features)).sum::<f64>() / self.trees.len() as f64
    }

    /// Predict for multiple samples
    pub fn predict(&self, dataset: &Dataset) -> Vec<f64> {
        dataset
            .features
            .par_iter()
            .map(|f| self.predict_one(f))
            .collect()
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Get feature names with importances, sorted by importance
    pub fn feature_importance_ranking(&self) -> Vec<(&str, f64)> {
        let mut ranking: Vec<(&str, f64)> = self
            .feature_names
            .iter()
            .zip(self.feature_importances.iter())
            .map(|(n, &i)| (n.as_str(), i))
            .collect();

        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranking
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

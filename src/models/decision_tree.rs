//! Regression tree (CART, squared-error criterion)

use crate::data::Dataset;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Nodes whose variance is at or below this are not split further
const MIN_IMPURITY: f64 = 1e-12;

/// Decision tree configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum depth of tree (None = grow until leaves are pure)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf node
    pub min_samples_leaf: usize,
    /// Maximum features to consider for split (None = all)
    pub max_features: Option<usize>,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }
}

/// Internal node test: `x[feature_idx] <= threshold` goes left
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeSplit {
    pub feature_idx: usize,
    pub threshold: f64,
    pub left: usize,
    pub right: usize,
}

/// Tree node, stored in a flat arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Split rule, None for leaves
    pub split: Option<NodeSplit>,
    /// Mean target of the samples reaching this node
    pub value: f64,
    /// Number of samples in this node
    pub n_samples: usize,
    /// Variance of the targets at this node
    pub impurity: f64,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.split.is_none()
    }
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    proxy: f64,
}

/// Decision Tree regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    config: TreeConfig,
    nodes: Vec<TreeNode>,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl DecisionTree {
    /// Create a new decision tree with config
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    /// Train on every record of the dataset
    pub fn fit(&mut self, dataset: &Dataset) {
        let indices: Vec<usize> = (0..dataset.n_samples()).collect();
        self.fit_indices(dataset, &indices);
    }

    /// Train on the given records; indices may repeat (bootstrap samples)
    pub fn fit_indices(&mut self, dataset: &Dataset, sample_indices: &[usize]) {
        self.n_features = dataset.n_features();
        self.feature_importances = vec![0.0; self.n_features];
        self.nodes.clear();

        if sample_indices.is_empty() {
            return;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        let root = sample_indices.to_vec();
        self.nodes.push(make_node(dataset, &root));

        // Depth-first with an explicit stack so deep trees don't recurse
        let mut stack = vec![(0usize, root, 0usize)];

        while let Some((node_id, indices, depth)) = stack.pop() {
            let impurity = self.nodes[node_id].impurity;
            if !self.can_split(indices.len(), depth, impurity) {
                continue;
            }

            let best = match self.find_best_split(dataset, &indices, &mut rng) {
                Some(best) => best,
                None => continue,
            };

            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| dataset.features[i][best.feature_idx] <= best.threshold);

            let left = make_node(dataset, &left_idx);
            let right = make_node(dataset, &right_idx);

            let n = indices.len() as f64;
            self.feature_importances[best.feature_idx] += n * impurity
                - left.n_samples as f64 * left.impurity
                - right.n_samples as f64 * right.impurity;

            let left_id = self.nodes.len();
            self.nodes.push(left);
            let right_id = self.nodes.len();
            self.nodes.push(right);

            self.nodes[node_id].split = Some(NodeSplit {
                feature_idx: best.feature_idx,
                threshold: best.threshold,
                left: left_id,
                right: right_id,
            });

            stack.push((right_id, right_idx, depth + 1));
            stack.push((left_id, left_idx, depth + 1));
        }

        // Normalize feature importances
        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }
    }

    fn can_split(&self, n_samples: usize, depth: usize, impurity: f64) -> bool {
        let depth_ok = self.config.max_depth.map_or(true, |max| depth < max);
        depth_ok
            && n_samples >= self.config.min_samples_split
            && n_samples >= 2 * self.config.min_samples_leaf
            && impurity > MIN_IMPURITY
    }

    /// Scan candidate features for the split with the largest variance reduction.
    ///
    /// Maximizing `sum_l^2 / n_l + sum_r^2 / n_r` is equivalent to minimizing
    /// the weighted child variance.
    fn find_best_split(
        &self,
        dataset: &Dataset,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        let max_features = self
            .config
            .max_features
            .unwrap_or(self.n_features)
            .clamp(1, self.n_features.max(1));

        // Random order breaks ties between equally good features
        let mut feature_indices: Vec<usize> = (0..self.n_features).collect();
        feature_indices.shuffle(rng);
        feature_indices.truncate(max_features);

        let total_sum: f64 = indices.iter().map(|&i| dataset.targets[i]).sum();
        let mut best: Option<BestSplit> = None;
        let mut column: Vec<(f64, f64)> = Vec::with_capacity(n);

        for &feature_idx in &feature_indices {
            column.clear();
            column.extend(
                indices
                    .iter()
                    .map(|&i| (dataset.features[i][feature_idx], dataset.targets[i])),
            );
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            if column[0].0 >= column[n - 1].0 {
                continue;
            }

            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += column[k].1;

                let (x, next_x) = (column[k].0, column[k + 1].0);
                if x >= next_x {
                    continue;
                }

                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let proxy =
                    left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;

                if best.as_ref().map_or(true, |b| proxy > b.proxy) {
                    let mut threshold = x / 2.0 + next_x / 2.0;
                    if threshold >= next_x || !threshold.is_finite() {
                        threshold = x;
                    }
                    best = Some(BestSplit {
                        feature_idx,
                        threshold,
                        proxy,
                    });
                }
            }
        }

        best
    }

    /// Predict for a single sample
    pub fn predict_one(&self, features: &[f64]) -> f64 {
        let mut node = match self.nodes.first() {
            Some(root) => root,
            None => return 0.0,
        };

        while let Some(split) = node.split {
            node = if features[split.feature_idx] <= split.threshold {
                &self.nodes[split.left]
            } else {
                &self.nodes[split.right]
            };
        }

        node.value
    }

    /// Predict for multiple samples
    pub fn predict(&self, dataset: &Dataset) -> Vec<f64> {
        dataset
            .features
            .iter()
            .map(|f| self.predict_one(f))
            .collect()
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Depth of the deepest leaf (a lone root has depth 1)
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut max_depth = 0;
        let mut stack = vec![(0usize, 1usize)];
        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(split) = self.nodes[id].split {
                stack.push((split.left, depth + 1));
                stack.push((split.right, depth + 1));
            }
        }
        max_depth
    }
}

/// Leaf summary (mean and variance) for the given samples
fn make_node(dataset: &Dataset, indices: &[usize]) -> TreeNode {
    let n = indices.len();
    if n == 0 {
        return TreeNode {
            split: None,
            value: 0.0,
            n_samples: 0,
            impurity: 0.0,
        };
    }

    let mean = indices.iter().map(|&i| dataset.targets[i]).sum::<f64>() / n as f64;
    let impurity = indices
        .iter()
        .map(|&i| (dataset.targets[i] - mean).powi(2))
        .sum::<f64>()
        / n as f64;

    TreeNode {
        split: None,
        value: mean,
        n_samples: n,
        impurity,
    }
}

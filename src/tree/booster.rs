//! Gradient-boosted regression.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{grow_tree, sample_indices, BoosterParams, GrowerContext, GrowthPolicy, TreeNode};
use crate::error::{MongkolError, Result};
use crate::metrics::r_squared;
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;

/// Gradient boosting regressor over squared error.
///
/// Each round fits one tree to the weighted residuals and adds a
/// `learning_rate` fraction of it. The [`GrowthPolicy`] decides the tree
/// shape; everything else comes from [`BoosterParams`].
///
/// # Examples
///
/// ```
/// use mongkol::tree::{BoosterParams, GradientBoostingRegressor, GrowthPolicy};
/// use mongkol::traits::Estimator;
/// use mongkol::primitives::{Matrix, Vector};
///
/// let x = Matrix::from_vec(8, 1, (0..8).map(|i| i as f32).collect()).expect("valid shape");
/// let y = Vector::from_vec((0..8).map(|i| if i < 4 { 1.0 } else { 9.0 }).collect());
///
/// let params = BoosterParams { n_estimators: 20, min_child_samples: 1, ..BoosterParams::default() };
/// let mut model = GradientBoostingRegressor::new(params, GrowthPolicy::Depthwise { max_depth: 3 });
/// model.fit(&x, &y).expect("fit");
/// assert!(model.score(&x, &y) > 0.9);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    params: BoosterParams,
    policy: GrowthPolicy,
    init_prediction: f32,
    trees: Vec<TreeNode>,
    importances: Vec<f32>,
    n_features: usize,
}

impl Default for GradientBoostingRegressor {
    fn default() -> Self {
        Self::new(BoosterParams::default(), GrowthPolicy::default())
    }
}

impl GradientBoostingRegressor {
    #[must_use]
    pub fn new(params: BoosterParams, policy: GrowthPolicy) -> Self {
        Self {
            params,
            policy,
            init_prediction: 0.0,
            trees: Vec::new(),
            importances: Vec::new(),
            n_features: 0,
        }
    }

    #[must_use]
    pub fn params(&self) -> &BoosterParams {
        &self.params
    }

    #[must_use]
    pub fn policy(&self) -> GrowthPolicy {
        self.policy
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn raw_predict(&self, x: &Matrix<f32>) -> Vec<f32> {
        let n = x.n_rows();
        let mut out = vec![self.init_prediction; n];
        for tree in &self.trees {
            for (i, v) in out.iter_mut().enumerate() {
                *v += self.params.learning_rate * tree.predict_row(x, i);
            }
        }
        out
    }
}

impl Estimator for GradientBoostingRegressor {
    fn fit(&mut self, x: &Matrix<f32>, y: &Vector<f32>) -> Result<()> {
        let weights = Vector::from_vec(vec![1.0; y.len()]);
        self.fit_weighted(x, y, &weights)
    }

    fn fit_weighted(&mut self, x: &Matrix<f32>, y: &Vector<f32>, weights: &Vector<f32>) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples == 0 {
            return Err(MongkolError::empty_input("booster fit"));
        }
        if n_samples != y.len() || n_samples != weights.len() {
            return Err(MongkolError::dimension_mismatch(
                format!("{n_samples} rows"),
                format!("{} targets, {} weights", y.len(), weights.len()),
            ));
        }

        // weighted mean as the starting point
        let w_sum: f32 = weights.sum();
        self.init_prediction = if w_sum > 0.0 {
            y.iter().zip(weights.iter()).map(|(t, w)| t * w).sum::<f32>() / w_sum
        } else {
            y.mean()
        };

        self.n_features = n_features;
        self.trees = Vec::with_capacity(self.params.n_estimators);
        self.importances = vec![0.0; n_features];

        let mut rng = StdRng::seed_from_u64(self.params.random_state);
        let mut predictions = vec![self.init_prediction; n_samples];
        let mut grad = vec![0.0_f32; n_samples];
        let hess: Vec<f32> = weights.as_slice().to_vec();

        for round in 0..self.params.n_estimators {
            for i in 0..n_samples {
                grad[i] = weights[i] * (y[i] - predictions[i]);
            }

            let rows = sample_indices(n_samples, self.params.subsample, &mut rng);
            let features = sample_indices(n_features, self.params.colsample, &mut rng);

            let ctx = GrowerContext {
                x,
                grad: &grad,
                hess: &hess,
                params: &self.params,
            };
            let tree = grow_tree(&ctx, rows, &features, self.policy, &mut self.importances);

            if let TreeNode::Leaf { value } = &tree {
                if value.abs() < 1e-12 && round > 0 {
                    // residuals exhausted, later rounds would be no-ops
                    debug!(round, "early stop: residuals fully fitted");
                    break;
                }
            }

            for (i, p) in predictions.iter_mut().enumerate() {
                *p += self.params.learning_rate * tree.predict_row(x, i);
            }
            self.trees.push(tree);
        }

        debug!(
            n_trees = self.trees.len(),
            n_features,
            "fitted boosted regressor"
        );
        Ok(())
    }

    fn predict(&self, x: &Matrix<f32>) -> Vector<f32> {
        Vector::from_vec(self.raw_predict(x))
    }

    fn score(&self, x: &Matrix<f32>, y: &Vector<f32>) -> f32 {
        r_squared(&self.predict(x), y)
    }

    fn feature_importances(&self) -> Option<Vec<f32>> {
        if self.importances.is_empty() {
            return None;
        }
        let total: f32 = self.importances.iter().sum();
        if total <= 0.0 {
            return Some(self.importances.clone());
        }
        Some(self.importances.iter().map(|v| v / total).collect())
    }
}

//! Gradient-boosted multiclass classification.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{grow_tree, sample_indices, BoosterParams, GrowerContext, GrowthPolicy, TreeNode};
use crate::error::{MongkolError, Result};
use crate::primitives::Matrix;

/// Gradient boosting classifier with softmax loss.
///
/// One tree per class per round, fitted to the class's residual
/// `y_ik - p_ik` with hessian `p_ik (1 - p_ik)`, scaled by `(K-1)/K`.
/// Routes numbers to price tiers; probabilities feed the soft-voting
/// blend downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    params: BoosterParams,
    policy: GrowthPolicy,
    n_classes: usize,
    init_scores: Vec<f32>,
    /// `rounds[r][k]` is round r's tree for class k.
    rounds: Vec<Vec<TreeNode>>,
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self::new(BoosterParams::default(), GrowthPolicy::Depthwise { max_depth: 3 })
    }
}

impl GradientBoostingClassifier {
    #[must_use]
    pub fn new(params: BoosterParams, policy: GrowthPolicy) -> Self {
        Self {
            params,
            policy,
            n_classes: 0,
            init_scores: Vec::new(),
            rounds: Vec::new(),
        }
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        !self.rounds.is_empty()
    }

    fn softmax_row(scores: &[f32]) -> Vec<f32> {
        let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f32 = exps.iter().sum();
        exps.iter().map(|e| e / total).collect()
    }

    fn raw_scores(&self, x: &Matrix<f32>) -> Vec<Vec<f32>> {
        let n = x.n_rows();
        let mut scores = vec![self.init_scores.clone(); n];
        for round in &self.rounds {
            for (k, tree) in round.iter().enumerate() {
                for (i, row_scores) in scores.iter_mut().enumerate() {
                    row_scores[k] += self.params.learning_rate * tree.predict_row(x, i);
                }
            }
        }
        scores
    }

    /// Trains on integer class labels `0..n_classes`.
    ///
    /// # Errors
    ///
    /// Fails for empty input, a row/label mismatch, or a single class.
    pub fn fit(&mut self, x: &Matrix<f32>, labels: &[usize]) -> Result<()> {
        let weights = vec![1.0; labels.len()];
        self.fit_weighted(x, labels, &weights)
    }

    /// Trains with per-row weights.
    ///
    /// # Errors
    ///
    /// Fails for empty input, a row/label mismatch, or a single class.
    pub fn fit_weighted(&mut self, x: &Matrix<f32>, labels: &[usize], weights: &[f32]) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples == 0 {
            return Err(MongkolError::empty_input("classifier fit"));
        }
        if n_samples != labels.len() || n_samples != weights.len() {
            return Err(MongkolError::dimension_mismatch(
                format!("{n_samples} rows"),
                format!("{} labels, {} weights", labels.len(), weights.len()),
            ));
        }

        let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
        if n_classes < 2 {
            return Err(MongkolError::DataInsufficiency {
                context: "classifier fit".to_string(),
                available: n_classes,
                required: 2,
            });
        }
        self.n_classes = n_classes;

        // log-prior initialization
        let mut class_counts = vec![0usize; n_classes];
        for &label in labels {
            class_counts[label] += 1;
        }
        self.init_scores = class_counts
            .iter()
            .map(|&c| ((c.max(1)) as f32 / n_samples as f32).ln())
            .collect();

        let mut rng = StdRng::seed_from_u64(self.params.random_state);
        let mut scores = vec![self.init_scores.clone(); n_samples];
        let mut importances = vec![0.0_f32; n_features];
        self.rounds = Vec::with_capacity(self.params.n_estimators);

        let class_scale = (n_classes as f32 - 1.0) / n_classes as f32;
        let mut grad = vec![0.0_f32; n_samples];
        let mut hess = vec![0.0_f32; n_samples];

        for _ in 0..self.params.n_estimators {
            let probs: Vec<Vec<f32>> = scores.iter().map(|s| Self::softmax_row(s)).collect();

            let mut round_trees = Vec::with_capacity(n_classes);
            for k in 0..n_classes {
                for i in 0..n_samples {
                    let y_ik = if labels[i] == k { 1.0 } else { 0.0 };
                    let p_ik = probs[i][k];
                    grad[i] = weights[i] * class_scale * (y_ik - p_ik);
                    hess[i] = (weights[i] * p_ik * (1.0 - p_ik)).max(1e-6);
                }

                let rows = sample_indices(n_samples, self.params.subsample, &mut rng);
                let features = sample_indices(n_features, self.params.colsample, &mut rng);
                let ctx = GrowerContext {
                    x,
                    grad: &grad,
                    hess: &hess,
                    params: &self.params,
                };
                let tree = grow_tree(&ctx, rows, &features, self.policy, &mut importances);

                for (i, row_scores) in scores.iter_mut().enumerate() {
                    row_scores[k] += self.params.learning_rate * tree.predict_row(x, i);
                }
                round_trees.push(tree);
            }
            self.rounds.push(round_trees);
        }

        debug!(
            n_rounds = self.rounds.len(),
            n_classes,
            "fitted boosted classifier"
        );
        Ok(())
    }

    /// Per-class probabilities, one row per sample.
    ///
    /// # Errors
    ///
    /// Fails when the model is unfitted.
    pub fn predict_proba(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        if !self.is_fitted() {
            return Err(MongkolError::from("classifier not fitted"));
        }
        let scores = self.raw_scores(x);
        let n = x.n_rows();
        let mut data = Vec::with_capacity(n * self.n_classes);
        for row_scores in &scores {
            data.extend(Self::softmax_row(row_scores));
        }
        Matrix::from_vec(n, self.n_classes, data).map_err(Into::into)
    }

    /// Most likely class per sample; all zeros when unfitted.
    #[must_use]
    pub fn predict(&self, x: &Matrix<f32>) -> Vec<usize> {
        if !self.is_fitted() {
            return vec![0; x.n_rows()];
        }
        self.raw_scores(x)
            .iter()
            .map(|row_scores| {
                row_scores
                    .iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| {
                        a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .map_or(0, |(k, _)| k)
            })
            .collect()
    }

    /// Fraction of correctly classified samples.
    #[must_use]
    pub fn score(&self, x: &Matrix<f32>, labels: &[usize]) -> f32 {
        let predicted = self.predict(x);
        if labels.is_empty() {
            return 0.0;
        }
        let correct = predicted
            .iter()
            .zip(labels)
            .filter(|(p, t)| p == t)
            .count();
        correct as f32 / labels.len() as f32
    }
}

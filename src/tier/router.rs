//! Tier routing classifier.

use crate::error::Result;
use crate::primitives::Matrix;
use crate::tree::{BoosterParams, GradientBoostingClassifier, GrowthPolicy};
use serde::{Deserialize, Serialize};

/// Routes feature rows to price tiers.
///
/// A multiclass gradient boosting classifier trained on the ground-truth
/// tier labels derived from [`TierBoundaries`](super::TierBoundaries).
/// Soft routing exposes the full class probabilities so downstream
/// predictors can blend tier experts instead of committing to one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierRouter {
    classifier: GradientBoostingClassifier,
}

impl Default for TierRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl TierRouter {
    #[must_use]
    pub fn new() -> Self {
        let params = BoosterParams {
            n_estimators: 300,
            learning_rate: 0.1,
            ..BoosterParams::default()
        };
        Self {
            classifier: GradientBoostingClassifier::new(
                params,
                GrowthPolicy::Depthwise { max_depth: 8 },
            ),
        }
    }

    /// Overrides the default booster configuration.
    #[must_use]
    pub fn with_booster(mut self, params: BoosterParams, policy: GrowthPolicy) -> Self {
        self.classifier = GradientBoostingClassifier::new(params, policy);
        self
    }

    /// Trains the router against tier labels.
    ///
    /// # Errors
    ///
    /// Fails on empty input, row/label mismatch, or a single class.
    pub fn fit(&mut self, x: &Matrix<f32>, tiers: &[usize], weights: Option<&[f32]>) -> Result<()> {
        match weights {
            Some(w) => self.classifier.fit_weighted(x, tiers, w),
            None => self.classifier.fit(x, tiers),
        }
    }

    /// Hard tier assignment per row.
    #[must_use]
    pub fn predict(&self, x: &Matrix<f32>) -> Vec<usize> {
        self.classifier.predict(x)
    }

    /// Per-row tier probabilities, one column per tier.
    ///
    /// # Errors
    ///
    /// Fails when the router has not been fitted.
    pub fn predict_proba(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.classifier.predict_proba(x)
    }

    #[must_use]
    pub fn n_tiers(&self) -> usize {
        self.classifier.n_classes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_router() -> TierRouter {
        TierRouter::new().with_booster(
            BoosterParams {
                n_estimators: 30,
                learning_rate: 0.3,
                ..BoosterParams::default()
            },
            GrowthPolicy::Depthwise { max_depth: 3 },
        )
    }

    fn banded_data() -> (Matrix<f32>, Vec<usize>) {
        let mut values = Vec::new();
        let mut tiers = Vec::new();
        for i in 0..60 {
            let x = i as f32;
            values.push(x);
            values.push(x * 0.5);
            tiers.push(if x < 20.0 {
                0
            } else if x < 40.0 {
                1
            } else {
                2
            });
        }
        (Matrix::from_vec(60, 2, values).expect("matrix"), tiers)
    }

    #[test]
    fn test_router_learns_bands() {
        let (x, tiers) = banded_data();
        let mut router = small_router();
        router.fit(&x, &tiers, None).expect("fit");
        let predicted = router.predict(&x);
        let correct = predicted
            .iter()
            .zip(tiers.iter())
            .filter(|(a, b)| a == b)
            .count();
        assert!(correct as f32 / tiers.len() as f32 > 0.9);
        assert_eq!(router.n_tiers(), 3);
    }

    #[test]
    fn test_proba_rows_sum_to_one() {
        let (x, tiers) = banded_data();
        let mut router = small_router();
        router.fit(&x, &tiers, None).expect("fit");
        let proba = router.predict_proba(&x).expect("proba");
        for r in 0..proba.n_rows() {
            let total: f32 = (0..proba.n_cols()).map(|c| proba.get(r, c)).sum();
            assert!((total - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_unfitted_proba_errors() {
        let router = small_router();
        let x = Matrix::zeros(2, 2);
        assert!(router.predict_proba(&x).is_err());
    }
}

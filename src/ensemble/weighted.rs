//! Validation-optimized weighted blending.

use crate::error::{MongkolError, Result};
use crate::metrics::r_squared;
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Ensemble whose member weights are fitted on a held-out validation set.
///
/// Weights live on the probability simplex: every weight is non-negative
/// and they sum to one. They are found by coordinate descent on validation
/// R² with a shrinking step, which is deterministic and needs no gradient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedEnsemble<E> {
    members: Vec<E>,
    weights: Vec<f32>,
    fitted: Vec<bool>,
}

impl<E: Estimator + Clone> WeightedEnsemble<E> {
    #[must_use]
    pub fn new(members: Vec<E>) -> Self {
        let n = members.len();
        Self {
            members,
            weights: Vec::new(),
            fitted: vec![false; n],
        }
    }

    #[must_use]
    pub fn n_members(&self) -> usize {
        self.members.len()
    }

    /// Optimized simplex weights, one per member (zero for dropped members).
    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Fits members on the training split and weights on the validation
    /// split.
    ///
    /// # Errors
    ///
    /// Fails when there are no members, splits are malformed, or every
    /// member fails to fit.
    pub fn fit(
        &mut self,
        x_train: &Matrix<f32>,
        y_train: &Vector<f32>,
        x_val: &Matrix<f32>,
        y_val: &Vector<f32>,
    ) -> Result<()> {
        if self.members.is_empty() {
            return Err(MongkolError::empty_input("ensemble members"));
        }
        if x_val.n_rows() != y_val.len() || x_val.n_rows() == 0 {
            return Err(MongkolError::dimension_mismatch(
                format!("{} validation rows", x_val.n_rows()),
                format!("{} validation targets", y_val.len()),
            ));
        }

        for (i, member) in self.members.iter_mut().enumerate() {
            match member.fit(x_train, y_train) {
                Ok(()) => self.fitted[i] = true,
                Err(err) => {
                    warn!(member = i, error = %err, "ensemble member failed, weight forced to zero");
                    self.fitted[i] = false;
                }
            }
        }
        let active: Vec<usize> = (0..self.members.len())
            .filter(|&i| self.fitted[i])
            .collect();
        if active.is_empty() {
            return Err(MongkolError::from("all ensemble members failed to fit"));
        }

        // validation predictions per active member
        let preds: Vec<Vector<f32>> = active
            .iter()
            .map(|&i| self.members[i].predict(x_val))
            .collect();

        let active_weights = optimize_simplex_weights(&preds, y_val);
        self.weights = vec![0.0; self.members.len()];
        for (slot, &i) in active.iter().enumerate() {
            self.weights[i] = active_weights[slot];
        }
        debug!(weights = ?self.weights, "weighted ensemble fitted");
        Ok(())
    }

    /// Weighted blend of member predictions.
    ///
    /// # Errors
    ///
    /// Fails when called before [`fit`](Self::fit).
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Vector<f32>> {
        if self.weights.is_empty() {
            return Err(MongkolError::from("weighted ensemble is not fitted"));
        }
        let n = x.n_rows();
        let mut out = vec![0.0f32; n];
        for (i, member) in self.members.iter().enumerate() {
            let w = self.weights[i];
            if w == 0.0 || !self.fitted[i] {
                continue;
            }
            let preds = member.predict(x);
            for (o, j) in out.iter_mut().zip(0..n) {
                *o += w * preds[j];
            }
        }
        Ok(Vector::from_vec(out))
    }

    #[must_use]
    pub fn score(&self, x: &Matrix<f32>, y: &Vector<f32>) -> f32 {
        match self.predict(x) {
            Ok(preds) => r_squared(&preds, y),
            Err(_) => f32::NEG_INFINITY,
        }
    }
}

/// Coordinate descent over the simplex maximizing validation R².
fn optimize_simplex_weights(preds: &[Vector<f32>], y_val: &Vector<f32>) -> Vec<f32> {
    let m = preds.len();
    if m == 1 {
        return vec![1.0];
    }
    let blend_score = |weights: &[f32]| -> f32 {
        let blended: Vec<f32> = (0..y_val.len())
            .map(|i| weights.iter().zip(preds.iter()).map(|(w, p)| w * p[i]).sum())
            .collect();
        r_squared(&Vector::from_vec(blended), y_val)
    };

    let mut weights = vec![1.0 / m as f32; m];
    let mut best = blend_score(&weights);
    let mut step = 0.2f32;
    while step > 1e-3 {
        let mut improved = false;
        for i in 0..m {
            for delta in [step, -step] {
                let mut trial = weights.clone();
                trial[i] = (trial[i] + delta).max(0.0);
                let total: f32 = trial.iter().sum();
                if total <= 0.0 {
                    continue;
                }
                for w in &mut trial {
                    *w /= total;
                }
                let score = blend_score(&trial);
                if score > best + 1e-7 {
                    weights = trial;
                    best = score;
                    improved = true;
                }
            }
        }
        if !improved {
            step *= 0.5;
        }
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::tests::{linear_data, small_booster, FailingModel, ToyModel};

    fn split(x: &Matrix<f32>, y: &Vector<f32>) -> (Matrix<f32>, Vector<f32>, Matrix<f32>, Vector<f32>) {
        let n = x.n_rows();
        // hold out every fourth row so validation stays inside the
        // training support of the ordered fixture
        let val: Vec<usize> = (0..n).filter(|i| i % 4 == 3).collect();
        let train: Vec<usize> = (0..n).filter(|i| i % 4 != 3).collect();
        (
            x.select_rows(&train),
            Vector::from_vec(train.iter().map(|&i| y[i]).collect()),
            x.select_rows(&val),
            Vector::from_vec(val.iter().map(|&i| y[i]).collect()),
        )
    }

    #[test]
    fn test_weights_form_simplex() {
        let (x, y) = linear_data();
        let (xt, yt, xv, yv) = split(&x, &y);
        let mut ensemble = WeightedEnsemble::new(vec![small_booster(1), small_booster(2), small_booster(3)]);
        ensemble.fit(&xt, &yt, &xv, &yv).expect("fit");
        let total: f32 = ensemble.weights().iter().sum();
        assert!((total - 1.0).abs() < 1e-4, "weights sum {total}");
        assert!(ensemble.weights().iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn test_better_member_gets_more_weight() {
        let (x, y) = linear_data();
        let (xt, yt, xv, yv) = split(&x, &y);
        // a constant model against a real booster
        use crate::ensemble::tests::EitherModel;
        let mut mixed = WeightedEnsemble::new(vec![
            EitherModel::Constant(ToyModel::new(0.0)),
            EitherModel::Booster(Box::new(small_booster(1))),
        ]);
        mixed.fit(&xt, &yt, &xv, &yv).expect("fit");
        assert!(mixed.weights()[1] > mixed.weights()[0]);
    }

    #[test]
    fn test_failed_member_weight_is_zero() {
        let (x, y) = linear_data();
        let (xt, yt, xv, yv) = split(&x, &y);
        let mut ensemble = WeightedEnsemble::new(vec![
            FailingModel::working(3.0),
            FailingModel::broken(),
        ]);
        ensemble.fit(&xt, &yt, &xv, &yv).expect("fit");
        assert_eq!(ensemble.weights()[1], 0.0);
        assert!((ensemble.weights()[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_unfitted_predict_errors() {
        let ensemble = WeightedEnsemble::new(vec![small_booster(1)]);
        assert!(ensemble.predict(&Matrix::zeros(2, 2)).is_err());
    }

    #[test]
    fn test_single_member_gets_all_weight() {
        let (x, y) = linear_data();
        let (xt, yt, xv, yv) = split(&x, &y);
        let mut ensemble = WeightedEnsemble::new(vec![small_booster(1)]);
        ensemble.fit(&xt, &yt, &xv, &yv).expect("fit");
        assert!((ensemble.weights()[0] - 1.0).abs() < 1e-6);
    }
}

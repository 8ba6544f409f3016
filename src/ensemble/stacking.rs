//! Stacked generalization with a ridge meta-model.

use crate::error::{MongkolError, Result};
use crate::metrics::r_squared;
use crate::model_selection::KFold;
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Two-level ensemble: base members feed a ridge regression meta-model.
///
/// The meta-model is trained on out-of-fold base predictions so it never
/// sees a prediction made by a model that trained on the same row, then
/// the base members are refitted on the full training set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackingEnsemble<E> {
    members: Vec<E>,
    fitted: Vec<bool>,
    /// Meta coefficients, one per member, plus intercept last.
    meta: Vec<f32>,
    alpha: f32,
    n_folds: usize,
}

impl<E: Estimator + Clone> StackingEnsemble<E> {
    #[must_use]
    pub fn new(members: Vec<E>) -> Self {
        let n = members.len();
        Self {
            members,
            fitted: vec![false; n],
            meta: Vec::new(),
            alpha: 1.0,
            n_folds: 5,
        }
    }

    /// Ridge penalty on the meta coefficients.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.max(0.0);
        self
    }

    #[must_use]
    pub fn with_n_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds.max(2);
        self
    }

    #[must_use]
    pub fn n_members(&self) -> usize {
        self.members.len()
    }

    /// Meta coefficients (member order), without the intercept.
    #[must_use]
    pub fn meta_coefficients(&self) -> &[f32] {
        if self.meta.is_empty() {
            &[]
        } else {
            &self.meta[..self.meta.len() - 1]
        }
    }

    /// Fits the stack: out-of-fold base predictions, ridge meta-model,
    /// then base members on the full data.
    ///
    /// # Errors
    ///
    /// Fails on empty member lists, too few rows for the fold count, or
    /// when every member fails.
    pub fn fit(&mut self, x: &Matrix<f32>, y: &Vector<f32>) -> Result<()> {
        if self.members.is_empty() {
            return Err(MongkolError::empty_input("ensemble members"));
        }
        let n = x.n_rows();
        if n < self.n_folds {
            return Err(MongkolError::DataInsufficiency {
                context: "stacking folds".to_string(),
                available: n,
                required: self.n_folds,
            });
        }

        // out-of-fold prediction matrix, one column per member
        let m = self.members.len();
        let mut oof = vec![0.0f32; n * m];
        let mut member_ok = vec![true; m];
        let folds = KFold::new(self.n_folds).split(n);
        for (train_idx, test_idx) in &folds {
            let x_train = x.select_rows(train_idx);
            let y_train = Vector::from_vec(train_idx.iter().map(|&i| y[i]).collect());
            let x_test = x.select_rows(test_idx);
            for (j, member) in self.members.iter().enumerate() {
                if !member_ok[j] {
                    continue;
                }
                let mut fold_model = member.clone();
                match fold_model.fit(&x_train, &y_train) {
                    Ok(()) => {
                        let preds = fold_model.predict(&x_test);
                        for (k, &i) in test_idx.iter().enumerate() {
                            oof[i * m + j] = preds[k];
                        }
                    }
                    Err(err) => {
                        warn!(member = j, error = %err, "member failed out-of-fold, dropped from stack");
                        member_ok[j] = false;
                    }
                }
            }
        }
        let active: Vec<usize> = (0..m).filter(|&j| member_ok[j]).collect();
        if active.is_empty() {
            return Err(MongkolError::from("all stacking members failed to fit"));
        }

        // ridge on active columns plus intercept
        let d = active.len() + 1;
        let mut z = Vec::with_capacity(n * d);
        for i in 0..n {
            for &j in &active {
                z.push(oof[i * m + j]);
            }
            z.push(1.0);
        }
        let z = Matrix::from_vec(n, d, z).map_err(MongkolError::from)?;
        let zt = z.transpose();
        let mut gram = zt.matmul(&z).map_err(MongkolError::from)?;
        for j in 0..d - 1 {
            // intercept stays unpenalized
            let g = gram.get(j, j);
            gram.set(j, j, g + self.alpha);
        }
        let rhs = zt.matvec(y).map_err(MongkolError::from)?;
        let coef = gram.cholesky_solve(&rhs).map_err(MongkolError::from)?;

        self.meta = vec![0.0; m + 1];
        for (slot, &j) in active.iter().enumerate() {
            self.meta[j] = coef[slot];
        }
        self.meta[m] = coef[d - 1];
        debug!(meta = ?self.meta, "stacking meta-model fitted");

        // refit surviving members on the full training set
        for (j, member) in self.members.iter_mut().enumerate() {
            if !member_ok[j] {
                self.fitted[j] = false;
                continue;
            }
            match member.fit(x, y) {
                Ok(()) => self.fitted[j] = true,
                Err(err) => {
                    warn!(member = j, error = %err, "member failed on full refit, dropped");
                    self.fitted[j] = false;
                    self.meta[j] = 0.0;
                }
            }
        }
        if !self.fitted.iter().any(|&f| f) {
            return Err(MongkolError::from("all stacking members failed to fit"));
        }
        Ok(())
    }

    /// Meta-model blend of member predictions.
    ///
    /// # Errors
    ///
    /// Fails when called before [`fit`](Self::fit).
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Vector<f32>> {
        if self.meta.is_empty() {
            return Err(MongkolError::from("stacking ensemble is not fitted"));
        }
        let n = x.n_rows();
        let intercept = self.meta[self.members.len()];
        let mut out = vec![intercept; n];
        for (j, member) in self.members.iter().enumerate() {
            if !self.fitted[j] || self.meta[j] == 0.0 {
                continue;
            }
            let preds = member.predict(x);
            for (o, i) in out.iter_mut().zip(0..n) {
                *o += self.meta[j] * preds[i];
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::tests::{linear_data, small_booster, FailingModel};

    #[test]
    fn test_stack_beats_noise() {
        let (x, y) = linear_data();
        let mut stack = StackingEnsemble::new(vec![small_booster(1), small_booster(2)])
            .with_n_folds(4);
        stack.fit(&x, &y).expect("fit");
        assert!(stack.score(&x, &y) > 0.8, "score {}", stack.score(&x, &y));
        assert_eq!(stack.meta_coefficients().len(), 2);
    }

    #[test]
    fn test_too_few_rows_for_folds_errors() {
        let x = Matrix::from_vec(3, 1, vec![1.0, 2.0, 3.0]).expect("matrix");
        let y = Vector::from_slice(&[1.0, 2.0, 3.0]);
        let mut stack = StackingEnsemble::new(vec![small_booster(1)]).with_n_folds(5);
        assert!(stack.fit(&x, &y).is_err());
    }

    #[test]
    fn test_failed_member_dropped_from_stack() {
        let (x, y) = linear_data();
        let mut stack = StackingEnsemble::new(vec![
            FailingModel::working(3.0),
            FailingModel::broken(),
        ])
        .with_n_folds(4);
        stack.fit(&x, &y).expect("fit");
        assert_eq!(stack.meta_coefficients()[1], 0.0);
        let preds = stack.predict(&x).expect("predict");
        assert_eq!(preds.len(), y.len());
    }

    #[test]
    fn test_unfitted_predict_errors() {
        let stack = StackingEnsemble::new(vec![small_booster(1)]);
        assert!(stack.predict(&Matrix::zeros(2, 2)).is_err());
    }
}

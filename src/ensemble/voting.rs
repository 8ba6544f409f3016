//! Unweighted prediction pooling.

use crate::error::{MongkolError, Result};
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How member predictions are pooled per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteKind {
    /// Arithmetic mean of member predictions.
    Mean,
    /// Per-row median, robust to one member going off the rails.
    Median,
}

/// Ensemble that pools member predictions without learned weights.
///
/// Members that fail to fit are dropped with a warning instead of
/// poisoning the whole ensemble; fitting only errors when every member
/// failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingEnsemble<E> {
    members: Vec<E>,
    fitted: Vec<bool>,
    kind: VoteKind,
}

impl<E: Estimator + Clone> VotingEnsemble<E> {
    #[must_use]
    pub fn new(members: Vec<E>) -> Self {
        let n = members.len();
        Self {
            members,
            fitted: vec![false; n],
            kind: VoteKind::Mean,
        }
    }

    #[must_use]
    pub fn with_kind(mut self, kind: VoteKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn n_members(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn n_fitted(&self) -> usize {
        self.fitted.iter().filter(|&&f| f).count()
    }

    /// Fits every member, isolating individual failures.
    ///
    /// # Errors
    ///
    /// Fails when there are no members or all of them fail to fit.
    pub fn fit(&mut self, x: &Matrix<f32>, y: &Vector<f32>) -> Result<()> {
        if self.members.is_empty() {
            return Err(MongkolError::empty_input("ensemble members"));
        }
        for (i, member) in self.members.iter_mut().enumerate() {
            match member.fit(x, y) {
                Ok(()) => self.fitted[i] = true,
                Err(err) => {
                    warn!(member = i, error = %err, "ensemble member failed, dropped");
                    self.fitted[i] = false;
                }
            }
        }
        if self.n_fitted() == 0 {
            return Err(MongkolError::from("all ensemble members failed to fit"));
        }
        Ok(())
    }

    /// Per-member predictions for the fitted members.
    fn member_predictions(&self, x: &Matrix<f32>) -> Vec<Vector<f32>> {
        self.members
            .iter()
            .zip(self.fitted.iter())
            .filter(|(_, &fitted)| fitted)
            .map(|(member, _)| member.predict(x))
            .collect()
    }

    /// Pools fitted member predictions.
    ///
    /// # Errors
    ///
    /// Fails when no member is fitted.
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Vector<f32>> {
        let preds = self.member_predictions(x);
        if preds.is_empty() {
            return Err(MongkolError::from("voting ensemble is not fitted"));
        }
        let n = x.n_rows();
        let mut out = Vec::with_capacity(n);
        match self.kind {
            VoteKind::Mean => {
                for i in 0..n {
                    let sum: f32 = preds.iter().map(|p| p[i]).sum();
                    out.push(sum / preds.len() as f32);
                }
            }
            VoteKind::Median => {
                let mut row = Vec::with_capacity(preds.len());
                for i in 0..n {
                    row.clear();
                    row.extend(preds.iter().map(|p| p[i]));
                    row.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                    let mid = row.len() / 2;
                    out.push(if row.len() % 2 == 0 {
                        (row[mid - 1] + row[mid]) / 2.0
                    } else {
                        row[mid]
                    });
                }
            }
        }
        Ok(Vector::from_vec(out))
    }

    /// R² on held-out data, negative infinity when unfitted.
    #[must_use]
    pub fn score(&self, x: &Matrix<f32>, y: &Vector<f32>) -> f32 {
        match self.predict(x) {
            Ok(preds) => crate::metrics::r_squared(&preds, y),
            Err(_) => f32::NEG_INFINITY,
        }
    }
}

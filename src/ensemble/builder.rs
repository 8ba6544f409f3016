//! Candidate selection and ensemble assembly.

use crate::ensemble::{StackingEnsemble, VoteKind, VotingEnsemble, WeightedEnsemble};
use crate::error::{MongkolError, Result};
use crate::metrics::r_squared;
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Which ensemble to assemble from the selected candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnsembleStrategy {
    /// Unweighted mean of member predictions.
    Simple,
    /// Per-row median vote.
    Voting,
    /// Validation-optimized simplex weights.
    Weighted,
    /// Ridge meta-model on out-of-fold predictions.
    Stacking,
    /// Plain average of the simple, voting, weighted, and stacking outputs.
    Super,
}

/// Plain average over the four ensemble flavors.
///
/// Sub-ensembles answer independently; one failing at prediction time just
/// drops out and the mean is taken over the survivors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuperEnsemble<E> {
    simple: VotingEnsemble<E>,
    voting: VotingEnsemble<E>,
    weighted: WeightedEnsemble<E>,
    stacking: StackingEnsemble<E>,
}

impl<E: Estimator + Clone> SuperEnsemble<E> {
    /// Mean of the sub-ensemble outputs.
    ///
    /// # Errors
    ///
    /// Fails only when every sub-ensemble fails to predict.
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Vector<f32>> {
        let answers = [
            self.simple.predict(x).ok(),
            self.voting.predict(x).ok(),
            self.weighted.predict(x).ok(),
            self.stacking.predict(x).ok(),
        ];
        let n_answered = answers.iter().flatten().count();
        if n_answered == 0 {
            return Err(MongkolError::from("every sub-ensemble failed to predict"));
        }
        let n = x.n_rows();
        let mut out = vec![0.0f32; n];
        for preds in answers.iter().flatten() {
            for (o, i) in out.iter_mut().zip(0..n) {
                *o += preds[i] / n_answered as f32;
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

/// A fitted ensemble of any strategy, with a uniform prediction surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedEnsemble<E> {
    Voting(VotingEnsemble<E>),
    Weighted(WeightedEnsemble<E>),
    Stacking(StackingEnsemble<E>),
    Super(SuperEnsemble<E>),
}

impl<E: Estimator + Clone> FittedEnsemble<E> {
    /// # Errors
    ///
    /// Propagates the underlying ensemble's prediction error.
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Vector<f32>> {
        match self {
            Self::Voting(e) => e.predict(x),
            Self::Weighted(e) => e.predict(x),
            Self::Stacking(e) => e.predict(x),
            Self::Super(e) => e.predict(x),
        }
    }

    #[must_use]
    pub fn score(&self, x: &Matrix<f32>, y: &Vector<f32>) -> f32 {
        match self {
            Self::Voting(e) => e.score(x, y),
            Self::Weighted(e) => e.score(x, y),
            Self::Stacking(e) => e.score(x, y),
            Self::Super(e) => e.score(x, y),
        }
    }
}

const DEFAULT_MAX_MEMBERS: usize = 5;

/// Screens candidate models on validation R² and assembles the survivors.
#[derive(Debug, Clone)]
pub struct EnsembleBuilder<E> {
    candidates: Vec<(String, E)>,
    strategy: EnsembleStrategy,
    max_members: usize,
}

impl<E: Estimator + Clone> Default for EnsembleBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Estimator + Clone> EnsembleBuilder<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            candidates: Vec::new(),
            strategy: EnsembleStrategy::Super,
            max_members: DEFAULT_MAX_MEMBERS,
        }
    }

    #[must_use]
    pub fn add_candidate(mut self, name: impl Into<String>, model: E) -> Self {
        self.candidates.push((name.into(), model));
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: EnsembleStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Caps how many screened candidates make it into the ensemble.
    #[must_use]
    pub fn with_max_members(mut self, max_members: usize) -> Self {
        self.max_members = max_members.max(1);
        self
    }

    /// Screens candidates on the validation split and returns the top
    /// performers by R², best first.
    fn select_members(
        &self,
        x_train: &Matrix<f32>,
        y_train: &Vector<f32>,
        x_val: &Matrix<f32>,
        y_val: &Vector<f32>,
    ) -> Vec<(String, E, f32)> {
        let mut scored: Vec<(String, E, f32, f32)> = Vec::new();
        for (name, model) in &self.candidates {
            let mut probe = model.clone();
            match probe.fit(x_train, y_train) {
                Ok(()) => {
                    let score = probe.score(x_val, y_val);
                    if score.is_finite() {
                        let err = crate::metrics::mae(&probe.predict(x_val), y_val);
                        scored.push((name.clone(), model.clone(), score, err));
                    } else {
                        warn!(candidate = %name, "non-finite validation score, dropped");
                    }
                }
                Err(err) => {
                    warn!(candidate = %name, error = %err, "candidate failed screening, dropped");
                }
            }
        }
        // best R2 first, equal scores broken by lower absolute error
        scored.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.3.partial_cmp(&b.3).unwrap_or(std::cmp::Ordering::Equal))
        });
        scored.truncate(self.max_members);
        for (name, _, score, err) in &scored {
            info!(candidate = %name, r2 = score, mae = err, "ensemble member selected");
        }
        scored
            .into_iter()
            .map(|(name, model, score, _)| (name, model, score))
            .collect()
    }

    /// Builds and fits the configured ensemble.
    ///
    /// # Errors
    ///
    /// Fails when no candidate survives screening or the chosen ensemble
    /// cannot be fitted.
    pub fn build(
        &self,
        x_train: &Matrix<f32>,
        y_train: &Vector<f32>,
        x_val: &Matrix<f32>,
        y_val: &Vector<f32>,
    ) -> Result<FittedEnsemble<E>> {
        let selected = self.select_members(x_train, y_train, x_val, y_val);
        if selected.is_empty() {
            return Err(MongkolError::from("no candidate survived screening"));
        }
        let members: Vec<E> = selected.into_iter().map(|(_, m, _)| m).collect();

        match self.strategy {
            EnsembleStrategy::Simple => {
                let mut ensemble = VotingEnsemble::new(members);
                ensemble.fit(x_train, y_train)?;
                Ok(FittedEnsemble::Voting(ensemble))
            }
            EnsembleStrategy::Voting => {
                let mut ensemble = VotingEnsemble::new(members).with_kind(VoteKind::Median);
                ensemble.fit(x_train, y_train)?;
                Ok(FittedEnsemble::Voting(ensemble))
            }
            EnsembleStrategy::Weighted => {
                let mut ensemble = WeightedEnsemble::new(members);
                ensemble.fit(x_train, y_train, x_val, y_val)?;
                Ok(FittedEnsemble::Weighted(ensemble))
            }
            EnsembleStrategy::Stacking => {
                let mut ensemble = StackingEnsemble::new(members);
                ensemble.fit(x_train, y_train)?;
                Ok(FittedEnsemble::Stacking(ensemble))
            }
            EnsembleStrategy::Super => {
                let mut simple = VotingEnsemble::new(members.clone());
                simple.fit(x_train, y_train)?;
                let mut voting = VotingEnsemble::new(members.clone()).with_kind(VoteKind::Median);
                voting.fit(x_train, y_train)?;
                let mut weighted = WeightedEnsemble::new(members.clone());
                weighted.fit(x_train, y_train, x_val, y_val)?;
                let mut stacking = StackingEnsemble::new(members);
                stacking.fit(x_train, y_train)?;
                Ok(FittedEnsemble::Super(SuperEnsemble {
                    simple,
                    voting,
                    weighted,
                    stacking,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::tests::{linear_data, small_booster, EitherModel, FailingModel, ToyModel};
    use crate::primitives::{Matrix, Vector};

    fn splits() -> (Matrix<f32>, Vector<f32>, Matrix<f32>, Vector<f32>) {
        let (x, y) = linear_data();
        let n = x.n_rows();
        // rows are ordered by the dominant feature, so hold out every
        // fourth row to keep validation inside the training support
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
    fn test_every_strategy_builds_and_predicts() {
        let (xt, yt, xv, yv) = splits();
        for strategy in [
            EnsembleStrategy::Simple,
            EnsembleStrategy::Voting,
            EnsembleStrategy::Weighted,
            EnsembleStrategy::Stacking,
            EnsembleStrategy::Super,
        ] {
            let ensemble = EnsembleBuilder::new()
                .add_candidate("a", small_booster(1))
                .add_candidate("b", small_booster(2))
                .add_candidate("c", small_booster(3))
                .with_strategy(strategy)
                .build(&xt, &yt, &xv, &yv)
                .expect("build");
            let preds = ensemble.predict(&xv).expect("predict");
            assert_eq!(preds.len(), yv.len());
            assert!(
                ensemble.score(&xv, &yv) > 0.0,
                "{strategy:?} scored {}",
                ensemble.score(&xv, &yv)
            );
        }
    }

    #[test]
    fn test_selection_keeps_top_members() {
        let (xt, yt, xv, yv) = splits();
        let builder = EnsembleBuilder::new()
            .add_candidate("constant", EitherModel::Constant(ToyModel::new(0.0)))
            .add_candidate("booster", EitherModel::Booster(Box::new(small_booster(1))))
            .with_max_members(1)
            .with_strategy(EnsembleStrategy::Simple);
        let ensemble = builder.build(&xt, &yt, &xv, &yv).expect("build");
        // the booster must win the single slot
        assert!(ensemble.score(&xv, &yv) > 0.5);
    }

    #[test]
    fn test_failing_candidates_are_screened_out() {
        let (xt, yt, xv, yv) = splits();
        let ensemble = EnsembleBuilder::new()
            .add_candidate("broken", FailingModel::broken())
            .add_candidate("ok", FailingModel::working(3.0))
            .with_strategy(EnsembleStrategy::Simple)
            .build(&xt, &yt, &xv, &yv)
            .expect("build");
        let preds = ensemble.predict(&xv).expect("predict");
        for i in 0..preds.len() {
            assert!((preds[i] - 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_no_surviving_candidate_errors() {
        let (xt, yt, xv, yv) = splits();
        let builder: EnsembleBuilder<FailingModel> = EnsembleBuilder::new()
            .add_candidate("broken", FailingModel::broken());
        assert!(builder.build(&xt, &yt, &xv, &yv).is_err());
    }

    #[test]
    fn test_super_is_mean_of_sub_ensembles() {
        // each flavor answers a different constant; the super ensemble
        // must return their plain average
        let x = Matrix::zeros(8, 1);
        let y = Vector::from_vec(vec![8.0; 8]);

        let mut simple = VotingEnsemble::new(vec![ToyModel::new(2.0)]);
        simple.fit(&x, &y).expect("fit");
        let mut voting = VotingEnsemble::new(vec![ToyModel::new(4.0)]).with_kind(VoteKind::Median);
        voting.fit(&x, &y).expect("fit");
        let mut weighted = WeightedEnsemble::new(vec![ToyModel::new(6.0)]);
        weighted.fit(&x, &y, &x, &y).expect("fit");
        // a zero-output member leaves the ridge meta-model with only its
        // intercept, the training target mean of 8
        let mut stacking = StackingEnsemble::new(vec![ToyModel::new(0.0)]);
        stacking.fit(&x, &y).expect("fit");

        let ensemble = SuperEnsemble {
            simple,
            voting,
            weighted,
            stacking,
        };
        let preds = ensemble.predict(&x).expect("predict");
        for i in 0..preds.len() {
            assert!((preds[i] - 5.0).abs() < 1e-3, "got {}", preds[i]);
        }
    }
}

//! Cross-validated booster tuning.

use crate::automl::device::{Device, DeviceProbe, PROBE_MAX_ROWS};
use crate::automl::search::{HyperParam, SearchSpace, SearchStrategy, Trial, TrialResult, TuneParam};
use crate::automl::tpe::TpeSearch;
use crate::error::{MongkolError, Result};
use crate::model_selection::{cross_validate, cross_validate_weighted, KFold};
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use crate::tree::{BoosterParams, GradientBoostingRegressor, GrowthPolicy};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Winning configuration of a tuning run.
#[derive(Debug, Clone)]
pub struct TunedBooster {
    pub params: BoosterParams,
    pub policy: GrowthPolicy,
    /// Mean cross-validated R² of the winner.
    pub cv_score: f32,
    /// Device the session settled on after probing.
    pub device: Device,
    pub n_trials: usize,
}

/// Default tuning ranges for a growth policy family.
#[must_use]
pub fn search_space_for(family: GrowthPolicy) -> SearchSpace {
    let space = SearchSpace::new()
        .add(TuneParam::NEstimators, HyperParam::integer(100, 2000))
        .add(
            TuneParam::LearningRate,
            HyperParam::continuous_log(0.001, 0.3),
        )
        .add(TuneParam::Subsample, HyperParam::continuous(0.5, 1.0))
        .add(TuneParam::Colsample, HyperParam::continuous(0.5, 1.0))
        .add(TuneParam::RegAlpha, HyperParam::continuous(0.0, 5.0))
        .add(TuneParam::RegLambda, HyperParam::continuous(0.0, 5.0));
    match family {
        GrowthPolicy::Depthwise { .. } => space
            .add(TuneParam::MaxDepth, HyperParam::integer(3, 15))
            .add(TuneParam::MinChildSamples, HyperParam::integer(1, 10)),
        GrowthPolicy::Leafwise { .. } => space
            .add(TuneParam::NumLeaves, HyperParam::integer(20, 300))
            .add(TuneParam::MaxDepth, HyperParam::integer(3, 15))
            .add(TuneParam::MinChildSamples, HyperParam::integer(5, 100)),
        GrowthPolicy::Oblivious { .. } => space.add(TuneParam::MaxDepth, HyperParam::integer(4, 10)),
    }
}

/// Materializes a trial into booster configuration, keeping the family of
/// the given template policy.
#[must_use]
pub fn apply_trial(trial: &Trial, family: GrowthPolicy, random_state: u64) -> (BoosterParams, GrowthPolicy) {
    let mut params = BoosterParams {
        random_state,
        ..BoosterParams::default()
    };
    if let Some(v) = trial.get_usize(TuneParam::NEstimators) {
        params.n_estimators = v;
    }
    if let Some(v) = trial.get_f64(TuneParam::LearningRate) {
        params.learning_rate = v as f32;
    }
    if let Some(v) = trial.get_f64(TuneParam::Subsample) {
        params.subsample = v as f32;
    }
    if let Some(v) = trial.get_f64(TuneParam::Colsample) {
        params.colsample = v as f32;
    }
    if let Some(v) = trial.get_f64(TuneParam::RegAlpha) {
        params.reg_alpha = v as f32;
    }
    if let Some(v) = trial.get_f64(TuneParam::RegLambda) {
        params.reg_lambda = v as f32;
    }
    if let Some(v) = trial.get_usize(TuneParam::MinChildSamples) {
        params.min_child_samples = v;
    }

    let policy = match family {
        GrowthPolicy::Depthwise { max_depth } => GrowthPolicy::Depthwise {
            max_depth: trial.get_usize(TuneParam::MaxDepth).unwrap_or(max_depth),
        },
        GrowthPolicy::Leafwise {
            num_leaves,
            max_depth,
        } => GrowthPolicy::Leafwise {
            num_leaves: trial.get_usize(TuneParam::NumLeaves).unwrap_or(num_leaves),
            max_depth: trial.get_usize(TuneParam::MaxDepth).unwrap_or(max_depth),
        },
        GrowthPolicy::Oblivious { depth } => GrowthPolicy::Oblivious {
            depth: trial.get_usize(TuneParam::MaxDepth).unwrap_or(depth),
        },
    };
    (params, policy)
}

/// TPE-driven hyperparameter optimizer for one booster family.
///
/// Scores each trial by mean cross-validated R² and keeps the best. The
/// training device is settled once per session by [`DeviceProbe`] before
/// any trial runs.
#[derive(Debug, Clone)]
pub struct HyperparameterOptimizer {
    family: GrowthPolicy,
    space: SearchSpace,
    n_trials: usize,
    cv: KFold,
    seed: u64,
    probe: DeviceProbe,
    sample_weights: Option<Vector<f32>>,
}

impl HyperparameterOptimizer {
    #[must_use]
    pub fn new(family: GrowthPolicy) -> Self {
        Self {
            family,
            space: search_space_for(family),
            n_trials: 50,
            cv: KFold::new(10),
            seed: 42,
            probe: DeviceProbe::new(Device::Cpu),
            sample_weights: None,
        }
    }

    #[must_use]
    pub fn with_n_trials(mut self, n_trials: usize) -> Self {
        self.n_trials = n_trials.max(1);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_cv(mut self, cv: KFold) -> Self {
        self.cv = cv;
        self
    }

    /// Weighs each training row in the trial objective.
    #[must_use]
    pub fn with_sample_weights(mut self, weights: Vector<f32>) -> Self {
        self.sample_weights = Some(weights);
        self
    }

    /// Overrides the default tuning ranges.
    #[must_use]
    pub fn with_search_space(mut self, space: SearchSpace) -> Self {
        self.space = space;
        self
    }

    /// Requests a device; anything but CPU is verified by a probe fit.
    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.probe = DeviceProbe::new(device);
        self
    }

    #[must_use]
    pub fn with_latency_budget(mut self, budget: Duration) -> Self {
        self.probe = self.probe.with_latency_budget(budget);
        self
    }

    fn resolve_device(&mut self, x: &Matrix<f32>, y: &Vector<f32>) -> Device {
        let n_probe = x.n_rows().min(PROBE_MAX_ROWS);
        let rows: Vec<usize> = (0..n_probe).collect();
        let probe_x = x.select_rows(&rows);
        let probe_y = Vector::from_vec((0..n_probe).map(|i| y[i]).collect());
        self.probe.resolve(|| {
            let params = BoosterParams {
                n_estimators: 20,
                ..BoosterParams::default()
            };
            let mut model =
                GradientBoostingRegressor::new(params, GrowthPolicy::Depthwise { max_depth: 3 });
            let start = Instant::now();
            model.fit(&probe_x, &probe_y)?;
            Ok(start.elapsed())
        })
    }

    /// Runs the tuning loop and returns the best configuration found.
    ///
    /// Trials whose cross-validation fails are logged and skipped rather
    /// than aborting the session.
    ///
    /// # Errors
    ///
    /// Fails when the dataset is empty or no trial completes.
    pub fn optimize(&mut self, x: &Matrix<f32>, y: &Vector<f32>) -> Result<TunedBooster> {
        if x.n_rows() == 0 {
            return Err(MongkolError::empty_input("tuning data"));
        }
        if x.n_rows() != y.len() {
            return Err(MongkolError::dimension_mismatch(
                format!("{} rows", x.n_rows()),
                format!("{} targets", y.len()),
            ));
        }
        if let Some(w) = &self.sample_weights {
            if w.len() != y.len() {
                return Err(MongkolError::dimension_mismatch(
                    format!("{} targets", y.len()),
                    format!("{} sample weights", w.len()),
                ));
            }
        }

        let device = self.resolve_device(x, y);
        info!(%device, n_trials = self.n_trials, "tuning session start");

        let mut strategy = TpeSearch::new(self.n_trials).with_seed(self.seed);
        let mut best: Option<TunedBooster> = None;
        let mut completed = 0;

        for trial_idx in 0..self.n_trials {
            let Some(trial) = strategy.suggest(&self.space, 1).into_iter().next() else {
                break;
            };
            let (params, policy) = apply_trial(&trial, self.family, self.seed);
            let estimator = GradientBoostingRegressor::new(params.clone(), policy);

            let validated = match &self.sample_weights {
                Some(w) => cross_validate_weighted(&estimator, x, y, w, &self.cv),
                None => cross_validate(&estimator, x, y, &self.cv),
            };
            let score = match validated {
                Ok(result) => result.mean(),
                Err(err) => {
                    warn!(trial = trial_idx, error = %err, "trial skipped");
                    continue;
                }
            };
            debug!(trial = trial_idx, score, config = %trial, "trial scored");
            completed += 1;

            strategy.tell(
                &self.space,
                &TrialResult {
                    trial,
                    score: f64::from(score),
                },
            );
            if best.as_ref().map_or(true, |b| score > b.cv_score) {
                best = Some(TunedBooster {
                    params,
                    policy,
                    cv_score: score,
                    device,
                    n_trials: 0,
                });
            }
        }

        let mut winner = best.ok_or_else(|| MongkolError::ConvergenceFailure {
            iterations: self.n_trials,
            final_loss: f64::INFINITY,
        })?;
        winner.n_trials = completed;
        info!(
            cv_score = winner.cv_score,
            trials = completed,
            "tuning session done"
        );
        Ok(winner)
    }
}

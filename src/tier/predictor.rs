//! Tier-specific price regressors.

use crate::error::{MongkolError, Result};
use crate::primitives::{Matrix, Vector};
use crate::tier::{TierBoundaries, TierRouter};
use crate::traits::Estimator;
use crate::tree::{BoosterParams, GradientBoostingRegressor, GrowthPolicy};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Booster configuration for one tier expert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierExpertConfig {
    pub params: BoosterParams,
    pub policy: GrowthPolicy,
}

impl TierExpertConfig {
    /// Fast leaf-wise grower for the bulk standard segment.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            params: BoosterParams {
                n_estimators: 500,
                learning_rate: 0.05,
                ..BoosterParams::default()
            },
            policy: GrowthPolicy::Leafwise {
                num_leaves: 31,
                max_depth: 15,
            },
        }
    }

    /// Regularized depth-wise grower for the premium segment.
    #[must_use]
    pub fn premium() -> Self {
        Self {
            params: BoosterParams {
                n_estimators: 800,
                learning_rate: 0.03,
                reg_alpha: 0.1,
                reg_lambda: 1.0,
                ..BoosterParams::default()
            },
            policy: GrowthPolicy::Depthwise { max_depth: 12 },
        }
    }

    /// Heavily regularized oblivious grower for the sparse luxury segment.
    #[must_use]
    pub fn luxury() -> Self {
        Self {
            params: BoosterParams {
                n_estimators: 1000,
                learning_rate: 0.02,
                reg_lambda: 5.0,
                ..BoosterParams::default()
            },
            policy: GrowthPolicy::Oblivious { depth: 10 },
        }
    }
}

/// Default expert lineup for a given tier count: the lowest tier gets the
/// standard configuration, the highest gets luxury, everything between
/// premium.
#[must_use]
pub fn default_expert_configs(n_tiers: usize) -> Vec<TierExpertConfig> {
    (0..n_tiers)
        .map(|tier| {
            if tier == 0 {
                TierExpertConfig::standard()
            } else if tier + 1 == n_tiers {
                TierExpertConfig::luxury()
            } else {
                TierExpertConfig::premium()
            }
        })
        .collect()
}

const MIN_TIER_SAMPLES: usize = 10;
const LUXURY_BOOST_THRESHOLD: f32 = 1_000_000.0;
const LUXURY_BOOST_FACTOR: f32 = 3.0;
const ULTRA_BOOST_THRESHOLD: f32 = 2_000_000.0;
const ULTRA_BOOST_FACTOR: f32 = 5.0;

/// Tier-aware price predictor.
///
/// Splits training rows by tier, trains a dedicated regressor per tier on
/// log-prices, and routes inference through [`TierRouter`]. Tiers with too
/// few rows fall back to the first fitted expert. `soft_blend` mixes the
/// probability-weighted expert average with the hard-routed expert: 1.0 is
/// fully soft, 0.0 fully hard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierPredictor {
    boundaries: TierBoundaries,
    router: TierRouter,
    configs: Vec<TierExpertConfig>,
    experts: Vec<Option<GradientBoostingRegressor>>,
    soft_blend: f32,
    min_tier_samples: usize,
}

impl TierPredictor {
    #[must_use]
    pub fn new(boundaries: TierBoundaries) -> Self {
        let n_tiers = boundaries.n_tiers();
        Self {
            boundaries,
            router: TierRouter::new(),
            configs: default_expert_configs(n_tiers),
            experts: vec![None; n_tiers],
            soft_blend: 1.0,
            min_tier_samples: MIN_TIER_SAMPLES,
        }
    }

    /// Sets the soft/hard routing mix. Clamped to [0, 1].
    #[must_use]
    pub fn with_soft_blend(mut self, soft_blend: f32) -> Self {
        self.soft_blend = soft_blend.clamp(0.0, 1.0);
        self
    }

    #[must_use]
    pub fn with_router(mut self, router: TierRouter) -> Self {
        self.router = router;
        self
    }

    /// Replaces the per-tier expert configurations.
    #[must_use]
    pub fn with_expert_configs(mut self, configs: Vec<TierExpertConfig>) -> Self {
        self.configs = configs;
        self
    }

    #[must_use]
    pub fn with_min_tier_samples(mut self, min_tier_samples: usize) -> Self {
        self.min_tier_samples = min_tier_samples.max(1);
        self
    }

    #[must_use]
    pub fn boundaries(&self) -> &TierBoundaries {
        &self.boundaries
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.experts.iter().any(Option::is_some)
    }

    /// Trains the router and tier experts.
    ///
    /// Luxury-tier rows above the million and two-million marks get their
    /// sample weights multiplied so the scarce top of the market is not
    /// drowned out.
    ///
    /// # Errors
    ///
    /// Fails on shape mismatches or when no tier has enough rows to train
    /// any expert.
    pub fn fit(&mut self, x: &Matrix<f32>, prices: &[f32], weights: Option<&[f32]>) -> Result<()> {
        if x.n_rows() != prices.len() {
            return Err(MongkolError::dimension_mismatch(
                format!("{} rows", x.n_rows()),
                format!("{} prices", prices.len()),
            ));
        }
        if self.configs.len() != self.boundaries.n_tiers() {
            return Err(MongkolError::ValidationError {
                message: format!(
                    "{} expert configs for {} tiers",
                    self.configs.len(),
                    self.boundaries.n_tiers()
                ),
            });
        }
        let tiers = self.boundaries.assign(prices);
        self.router.fit(x, &tiers, weights)?;

        let base_weights: Vec<f32> = match weights {
            Some(w) => w.to_vec(),
            None => vec![1.0; prices.len()],
        };
        let luxury_tier = self.boundaries.n_tiers() - 1;

        self.experts = vec![None; self.boundaries.n_tiers()];
        for (tier, config) in self.configs.iter().enumerate() {
            let rows: Vec<usize> = tiers
                .iter()
                .enumerate()
                .filter(|(_, &t)| t == tier)
                .map(|(i, _)| i)
                .collect();
            if rows.len() < self.min_tier_samples {
                warn!(
                    tier = self.boundaries.label(tier),
                    samples = rows.len(),
                    required = self.min_tier_samples,
                    "too few samples, tier falls back to neighbor expert"
                );
                continue;
            }
            let sub_x = x.select_rows(&rows);
            let mut sub_w = Vec::with_capacity(rows.len());
            let mut targets = Vec::with_capacity(rows.len());
            for &i in &rows {
                let mut w = base_weights[i];
                if tier == luxury_tier {
                    if prices[i] > ULTRA_BOOST_THRESHOLD {
                        w *= ULTRA_BOOST_FACTOR;
                    } else if prices[i] > LUXURY_BOOST_THRESHOLD {
                        w *= LUXURY_BOOST_FACTOR;
                    }
                }
                sub_w.push(w);
                targets.push(prices[i].max(0.0).ln_1p());
            }
            let sub_y = Vector::from_vec(targets);
            let mut expert = GradientBoostingRegressor::new(config.params.clone(), config.policy);
            expert.fit_weighted(&sub_x, &sub_y, &Vector::from_vec(sub_w))?;
            info!(
                tier = self.boundaries.label(tier),
                samples = rows.len(),
                "trained tier expert"
            );
            self.experts[tier] = Some(expert);
        }

        if !self.is_fitted() {
            return Err(MongkolError::DataInsufficiency {
                context: "tier experts".to_string(),
                available: prices.len(),
                required: self.min_tier_samples,
            });
        }
        Ok(())
    }

    /// Expert index actually serving a tier, walking down to the first
    /// fitted expert when the tier's own is missing.
    fn serving_expert(&self, tier: usize) -> Option<&GradientBoostingRegressor> {
        if let Some(Some(expert)) = self.experts.get(tier) {
            return Some(expert);
        }
        self.experts.iter().flatten().next()
    }

    /// Predicts prices, blending tier experts by router probability.
    ///
    /// # Errors
    ///
    /// Fails when called before [`fit`](Self::fit).
    pub fn predict(&self, x: &Matrix<f32>) -> Result<Vector<f32>> {
        if !self.is_fitted() {
            return Err(MongkolError::from("tier predictor is not fitted"));
        }
        let proba = self.router.predict_proba(x)?;
        let n = x.n_rows();

        // per-tier log-price predictions, missing tiers served by fallback
        let mut tier_preds: Vec<Vector<f32>> = Vec::with_capacity(self.boundaries.n_tiers());
        for tier in 0..self.boundaries.n_tiers() {
            let expert = self
                .serving_expert(tier)
                .ok_or_else(|| MongkolError::from("no fitted tier expert"))?;
            tier_preds.push(expert.predict(x));
        }

        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let mut soft = 0.0f32;
            let mut best_tier = 0;
            let mut best_p = f32::MIN;
            for tier in 0..self.boundaries.n_tiers() {
                let p = proba.get(i, tier);
                soft += p * tier_preds[tier][i];
                if p > best_p {
                    best_p = p;
                    best_tier = tier;
                }
            }
            let hard = tier_preds[best_tier][i];
            let log_price = self.soft_blend * soft + (1.0 - self.soft_blend) * hard;
            out.push(log_price.exp_m1().max(0.0));
        }
        Ok(Vector::from_vec(out))
    }

    /// Hard tier assignment for each row.
    #[must_use]
    pub fn predict_tier(&self, x: &Matrix<f32>) -> Vec<usize> {
        self.router.predict(x)
    }

    /// Coefficient of determination against true prices.
    #[must_use]
    pub fn score(&self, x: &Matrix<f32>, prices: &[f32]) -> f32 {
        match self.predict(x) {
            Ok(preds) => crate::metrics::r_squared(&preds, &Vector::from_slice(prices)),
            Err(_) => f32::NEG_INFINITY,
        }
    }

    /// Importances of the expert serving a tier.
    #[must_use]
    pub fn expert_importances(&self, tier: usize) -> Option<Vec<f32>> {
        self.serving_expert(tier).and_then(Estimator::feature_importances)
    }
}

//! Market statistics and sample weighting.
//!
//! Both are pure functions of the *training* partition. The frozen
//! [`MarketStatistics`] value is handed to the feature assembler for every
//! later row; it is never refitted for validation or test data, which is
//! what keeps suffix-price features leakage-safe.

use crate::error::{MongkolError, Result};
use crate::phone::PhoneNumber;
use crate::primitives::Vector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Price thresholds and multipliers for progressive tier weighting.
const PROGRESSIVE_THRESHOLDS: [f32; 5] = [10_000.0, 50_000.0, 100_000.0, 500_000.0, 1_000_000.0];
const PROGRESSIVE_WEIGHTS: [f32; 6] = [1.0, 2.0, 4.0, 6.0, 8.0, 10.0];

/// Frozen per-pattern price statistics computed from training rows only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketStatistics {
    pattern_median: BTreeMap<String, f32>,
    pattern_popularity: BTreeMap<String, u32>,
    global_median: f32,
    global_mean: f32,
    n_train_samples: usize,
}

fn median(values: &mut [f32]) -> f32 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

impl MarketStatistics {
    /// Fits statistics from `(phone, price)` training rows.
    ///
    /// Accumulates prices per 2/3/4-digit suffix and per middle block,
    /// keeps only patterns observed at least twice, and stores the median
    /// (not the mean) per pattern to resist outliers.
    ///
    /// # Errors
    ///
    /// Returns [`MongkolError::DataInsufficiency`] for an empty training set.
    pub fn fit(rows: &[(PhoneNumber, f32)]) -> Result<Self> {
        if rows.is_empty() {
            return Err(MongkolError::DataInsufficiency {
                context: "market statistics".to_string(),
                available: 0,
                required: 1,
            });
        }

        let mut pattern_prices: BTreeMap<String, Vec<f32>> = BTreeMap::new();
        for (phone, price) in rows {
            for len in [2usize, 3, 4] {
                pattern_prices
                    .entry(phone.suffix(len).to_string())
                    .or_default()
                    .push(*price);
            }
            pattern_prices
                .entry(phone.middle_block().to_string())
                .or_default()
                .push(*price);
        }

        let mut pattern_median = BTreeMap::new();
        let mut pattern_popularity = BTreeMap::new();
        for (pattern, mut prices) in pattern_prices {
            if prices.len() >= 2 {
                pattern_popularity.insert(pattern.clone(), prices.len() as u32);
                pattern_median.insert(pattern, median(&mut prices));
            }
        }

        let mut all_prices: Vec<f32> = rows.iter().map(|(_, p)| *p).collect();
        let global_mean = all_prices.iter().sum::<f32>() / all_prices.len() as f32;
        let global_median = median(&mut all_prices);

        info!(
            n_rows = rows.len(),
            n_patterns = pattern_median.len(),
            global_median,
            "market statistics fitted"
        );

        Ok(Self {
            pattern_median,
            pattern_popularity,
            global_median,
            global_mean,
            n_train_samples: rows.len(),
        })
    }

    /// Median price for the number's suffix of the given length; the global
    /// median when the pattern was unseen or too rare.
    #[must_use]
    pub fn suffix_price(&self, phone: &PhoneNumber, len: usize) -> f32 {
        self.pattern_median
            .get(phone.suffix(len))
            .copied()
            .unwrap_or(self.global_median)
    }

    /// Combined popularity count across the number's 2/3/4-digit suffixes.
    #[must_use]
    pub fn popularity_score(&self, phone: &PhoneNumber) -> f32 {
        [2usize, 3, 4]
            .iter()
            .map(|&len| {
                self.pattern_popularity
                    .get(phone.suffix(len))
                    .copied()
                    .unwrap_or(0) as f32
            })
            .sum()
    }

    /// Global median training price.
    #[must_use]
    pub fn global_median(&self) -> f32 {
        self.global_median
    }

    /// Global mean training price.
    #[must_use]
    pub fn global_mean(&self) -> f32 {
        self.global_mean
    }

    /// Number of training rows the statistics were computed from.
    #[must_use]
    pub fn n_train_samples(&self) -> usize {
        self.n_train_samples
    }
}

/// Per-row training weights: grow smoothly with log price, boost premium
/// ranges, lightly penalize the very cheap tail, then normalize to mean 1.
///
/// Only ever computed from training-partition prices; non-training rows get
/// an implicit weight of 1.
#[must_use]
pub fn sample_weights(prices: &[f32]) -> Vector<f32> {
    if prices.is_empty() {
        return Vector::from_vec(vec![]);
    }

    let clipped: Vec<f32> = prices.iter().map(|p| p.max(100.0)).collect();
    let logs: Vec<f32> = clipped.iter().map(|p| p.ln_1p()).collect();
    let log_min = logs.iter().copied().fold(f32::INFINITY, f32::min);
    let log_max = logs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let span = log_max - log_min + 1e-9;

    let mut weights: Vec<f32> = clipped
        .iter()
        .zip(logs.iter())
        .map(|(&price, &lg)| {
            let scaled = (lg - log_min) / span;
            let base = 0.6 + 1.7 * scaled.powf(1.25);
            let boost = if price >= 50_000.0 {
                2.0
            } else if price >= 20_000.0 {
                1.2
            } else if price >= 10_000.0 {
                0.8
            } else if price >= 5_000.0 {
                0.4
            } else {
                0.0
            };
            let penalty = if price < 800.0 { 0.25 } else { 0.0 };
            (base + boost + penalty).max(0.3)
        })
        .collect();

    let mean = weights.iter().sum::<f32>() / weights.len() as f32;
    for w in &mut weights {
        *w /= mean;
    }
    Vector::from_vec(weights)
}

/// Progressive weights for tier training: a step function of absolute
/// price that pushes the upper tail harder.
#[must_use]
pub fn progressive_weights(prices: &[f32]) -> Vector<f32> {
    let weights: Vec<f32> = prices
        .iter()
        .map(|&price| {
            for (j, &threshold) in PROGRESSIVE_THRESHOLDS.iter().enumerate() {
                if price <= threshold {
                    return PROGRESSIVE_WEIGHTS[j];
                }
            }
            PROGRESSIVE_WEIGHTS[PROGRESSIVE_WEIGHTS.len() - 1]
        })
        .collect();
    Vector::from_vec(weights)
}

/// Elementwise product of two weight vectors, renormalized to mean 1.
///
/// # Panics
///
/// Panics if lengths differ.
#[must_use]
pub fn combine_weights(a: &Vector<f32>, b: &Vector<f32>) -> Vector<f32> {
    assert_eq!(a.len(), b.len(), "weight vectors must have equal length");
    let mut combined: Vec<f32> = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| x * y)
        .collect();
    let mean = combined.iter().sum::<f32>() / combined.len().max(1) as f32;
    if mean > 0.0 {
        for w in &mut combined {
            *w /= mean;
        }
    }
    Vector::from_vec(combined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone(s: &str) -> PhoneNumber {
        PhoneNumber::parse(s).expect("valid test number")
    }

    fn rows() -> Vec<(PhoneNumber, f32)> {
        vec![
            (phone("0811118888"), 50_000.0),
            (phone("0822228888"), 70_000.0),
            (phone("0833338888"), 60_000.0),
            (phone("0812345678"), 3_000.0),
            (phone("0887654321"), 2_000.0),
        ]
    }

    #[test]
    fn test_fit_empty_fails() {
        assert!(MarketStatistics::fit(&[]).is_err());
    }

    #[test]
    fn test_suffix_median_resists_outliers() {
        let stats = MarketStatistics::fit(&rows()).expect("fit");
        // "8888" seen three times: median of 50k/60k/70k
        assert_eq!(stats.suffix_price(&phone("0899998888"), 4), 60_000.0);
    }

    #[test]
    fn test_unseen_pattern_defaults_to_global_median() {
        let stats = MarketStatistics::fit(&rows()).expect("fit");
        let fallback = stats.suffix_price(&phone("0800000000"), 4);
        assert_eq!(fallback, stats.global_median());
    }

    #[test]
    fn test_singleton_patterns_dropped() {
        let stats = MarketStatistics::fit(&rows()).expect("fit");
        // "5678" appears once, so it must not get its own statistic
        assert_eq!(
            stats.suffix_price(&phone("0800005678"), 4),
            stats.global_median()
        );
    }

    #[test]
    fn test_popularity_score() {
        let stats = MarketStatistics::fit(&rows()).expect("fit");
        assert!(stats.popularity_score(&phone("0899998888")) >= 3.0);
        assert_eq!(stats.popularity_score(&phone("0700001111")), 0.0);
    }

    #[test]
    fn test_statistics_pure_function_of_training_rows() {
        let train = rows();
        let a = MarketStatistics::fit(&train).expect("fit");
        // a disjoint holdout existing elsewhere must not change anything
        let b = MarketStatistics::fit(&train).expect("fit");
        assert_eq!(a.global_median(), b.global_median());
        assert_eq!(
            a.suffix_price(&phone("0899998888"), 4),
            b.suffix_price(&phone("0899998888"), 4)
        );
    }

    #[test]
    fn test_sample_weights_positive_and_mean_one() {
        let prices = [500.0, 2_000.0, 8_000.0, 60_000.0, 150_000.0];
        let w = sample_weights(&prices);
        assert_eq!(w.len(), 5);
        for &x in w.iter() {
            assert!(x > 0.0);
        }
        assert!((w.mean() - 1.0).abs() < 1e-5);
        // expensive rows must outweigh cheap ones
        assert!(w[4] > w[0]);
    }

    #[test]
    fn test_progressive_weight_steps() {
        let w = progressive_weights(&[5_000.0, 30_000.0, 90_000.0, 400_000.0, 2_000_000.0]);
        assert_eq!(w.as_slice(), &[1.0, 2.0, 4.0, 6.0, 10.0]);
    }

    #[test]
    fn test_combine_weights_mean_one() {
        let a = Vector::from_slice(&[1.0, 2.0, 3.0]);
        let b = Vector::from_slice(&[2.0, 2.0, 2.0]);
        let c = combine_weights(&a, &b);
        assert!((c.mean() - 1.0).abs() < 1e-6);
        assert!(c[2] > c[0]);
    }
}

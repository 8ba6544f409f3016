//! Tree-structured Parzen Estimator optimizer.
//!
//! Models p(x|y) instead of p(y|x): observed trials are split into a
//! "good" and a "bad" group at the gamma quantile of the objective, each
//! group gets a kernel density estimate, and new candidates are chosen by
//! the density ratio l(x) / g(x), which is monotone in expected
//! improvement.
//!
//! # References
//!
//! Bergstra et al. (2011). Algorithms for Hyper-Parameter Optimization. `NeurIPS`.

use crate::automl::search::{Rng, SearchSpace, SearchStrategy, Trial, TrialResult, XorShift64};

/// One evaluated point in unit-interval coordinates.
#[derive(Debug, Clone)]
struct Observation {
    coords: Vec<f64>,
    score: f64,
}

/// TPE optimizer.
///
/// Falls back to random sampling until `n_startup_trials` observations are
/// collected, then proposes the best of `n_candidates` random draws ranked
/// by the good/bad density ratio.
#[derive(Debug, Clone)]
pub struct TpeSearch {
    n_trials: usize,
    gamma: f32,
    n_candidates: usize,
    n_startup_trials: usize,
    history: Vec<Observation>,
    suggested: usize,
    seed: u64,
}

impl TpeSearch {
    #[must_use]
    pub fn new(n_trials: usize) -> Self {
        Self {
            n_trials,
            gamma: 0.25,
            n_candidates: 24,
            n_startup_trials: 10,
            history: Vec::new(),
            suggested: 0,
            seed: 42,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Quantile splitting good from bad observations. Clamped to [0.01, 0.5].
    #[must_use]
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma.clamp(0.01, 0.5);
        self
    }

    #[must_use]
    pub fn with_startup_trials(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.n_trials.saturating_sub(self.suggested)
    }

    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.history.len()
    }

    fn should_use_model(&self) -> bool {
        self.history.len() >= self.n_startup_trials
    }

    /// Gaussian KDE density at a point.
    fn kde_density(samples: &[f64], point: f64, bandwidth: f64) -> f64 {
        if samples.is_empty() {
            return 1.0;
        }
        let n = samples.len() as f64;
        let sum: f64 = samples
            .iter()
            .map(|&x| {
                let z = (point - x) / bandwidth;
                (-0.5 * z * z).exp()
            })
            .sum();
        sum / ((2.0 * std::f64::consts::PI).sqrt() * bandwidth * n)
    }

    /// Scott's rule bandwidth: h = std * n^(-1/5).
    fn bandwidth(samples: &[f64]) -> f64 {
        if samples.len() < 2 {
            return 1.0;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n;
        // zero bandwidth would collapse the kernel to a spike
        variance.sqrt().max(0.01) * n.powf(-0.2)
    }

    /// Splits history into good and bad groups at the gamma quantile.
    fn split_observations(&self) -> (Vec<&Observation>, Vec<&Observation>) {
        if self.history.len() < 2 {
            return (self.history.iter().collect(), Vec::new());
        }
        let mut sorted: Vec<&Observation> = self.history.iter().collect();
        sorted.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let n_good = ((self.history.len() as f32) * self.gamma).ceil() as usize;
        let n_good = n_good.clamp(1, sorted.len() - 1);
        (sorted[..n_good].to_vec(), sorted[n_good..].to_vec())
    }

    /// Density ratio l(x) / g(x), the TPE acquisition value.
    fn ei_ratio(candidate: &[f64], good: &[&Observation], bad: &[&Observation]) -> f64 {
        if candidate.is_empty() {
            return 0.0;
        }
        let mut l_density = 1.0;
        let mut g_density = 1.0;
        for (dim, &x) in candidate.iter().enumerate() {
            let good_samples: Vec<f64> = good
                .iter()
                .filter_map(|o| o.coords.get(dim).copied())
                .collect();
            l_density *= Self::kde_density(&good_samples, x, Self::bandwidth(&good_samples));

            let bad_samples: Vec<f64> = bad
                .iter()
                .filter_map(|o| o.coords.get(dim).copied())
                .collect();
            g_density *= Self::kde_density(&bad_samples, x, Self::bandwidth(&bad_samples));
        }
        l_density / (g_density + 1e-10)
    }

    fn sample_coords(n_dims: usize, rng: &mut impl Rng) -> Vec<f64> {
        (0..n_dims).map(|_| rng.gen_f64()).collect()
    }
}

impl SearchStrategy for TpeSearch {
    fn suggest(&mut self, space: &SearchSpace, n: usize) -> Vec<Trial> {
        let n = n.min(self.remaining());
        if n == 0 {
            return Vec::new();
        }
        let mut rng = XorShift64::new(self.seed.wrapping_add(self.suggested as u64));
        let n_dims = space.len();

        let trials: Vec<Trial> = if !self.should_use_model() || n_dims == 0 {
            (0..n).map(|_| space.sample(&mut rng)).collect()
        } else {
            let (good, bad) = self.split_observations();
            (0..n)
                .map(|_| {
                    let mut best = Self::sample_coords(n_dims, &mut rng);
                    let mut best_ei = Self::ei_ratio(&best, &good, &bad);
                    for _ in 1..self.n_candidates {
                        let candidate = Self::sample_coords(n_dims, &mut rng);
                        let ei = Self::ei_ratio(&candidate, &good, &bad);
                        if ei > best_ei {
                            best_ei = ei;
                            best = candidate;
                        }
                    }
                    space.from_unit(&best)
                })
                .collect()
        };

        self.suggested += trials.len();
        trials
    }

    fn tell(&mut self, space: &SearchSpace, result: &TrialResult) {
        self.history.push(Observation {
            coords: space.to_unit(&result.trial),
            score: result.score,
        });
    }
}

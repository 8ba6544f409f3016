//! Search space and baseline random search.
//!
//! # References
//!
//! Bergstra & Bengio (2012). Random Search for Hyper-Parameter Optimization. JMLR.

use std::fmt;

/// Tunable booster hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TuneParam {
    NEstimators,
    MaxDepth,
    LearningRate,
    Subsample,
    Colsample,
    RegAlpha,
    RegLambda,
    MinChildSamples,
    NumLeaves,
}

impl TuneParam {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NEstimators => "n_estimators",
            Self::MaxDepth => "max_depth",
            Self::LearningRate => "learning_rate",
            Self::Subsample => "subsample",
            Self::Colsample => "colsample",
            Self::RegAlpha => "reg_alpha",
            Self::RegLambda => "reg_lambda",
            Self::MinChildSamples => "min_child_samples",
            Self::NumLeaves => "num_leaves",
        }
    }
}

impl fmt::Display for TuneParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A concrete sampled value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Float(f64),
    Int(i64),
}

impl ParamValue {
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Float(v) => *v,
            Self::Int(v) => *v as f64,
        }
    }

    #[must_use]
    pub fn as_usize(&self) -> usize {
        match self {
            Self::Float(v) => v.max(0.0).round() as usize,
            Self::Int(v) => (*v).max(0) as usize,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v:.5}"),
            Self::Int(v) => write!(f, "{v}"),
        }
    }
}

/// Distribution a hyperparameter is drawn from.
#[derive(Debug, Clone, PartialEq)]
pub enum HyperParam {
    /// Continuous in [low, high], optionally sampled on a log scale.
    Continuous { low: f64, high: f64, log_scale: bool },
    /// Integer in [low, high] inclusive.
    Integer { low: i64, high: i64 },
}

impl HyperParam {
    #[must_use]
    pub fn continuous(low: f64, high: f64) -> Self {
        Self::Continuous {
            low,
            high,
            log_scale: false,
        }
    }

    #[must_use]
    pub fn continuous_log(low: f64, high: f64) -> Self {
        Self::Continuous {
            low,
            high,
            log_scale: true,
        }
    }

    #[must_use]
    pub fn integer(low: i64, high: i64) -> Self {
        Self::Integer { low, high }
    }

    /// Draws a value from this distribution.
    pub fn sample(&self, rng: &mut impl Rng) -> ParamValue {
        self.from_unit(rng.gen_f64())
    }

    /// Maps a unit-interval coordinate onto this distribution.
    #[must_use]
    pub fn from_unit(&self, u: f64) -> ParamValue {
        let u = u.clamp(0.0, 1.0);
        match self {
            Self::Continuous {
                low,
                high,
                log_scale,
            } => {
                let value = if *log_scale {
                    let log_low = low.ln();
                    let log_high = high.ln();
                    (log_low + u * (log_high - log_low)).exp()
                } else {
                    low + u * (high - low)
                };
                ParamValue::Float(value)
            }
            Self::Integer { low, high } => {
                let range = (high - low + 1) as f64;
                let v = (*low + (u * range).floor() as i64).clamp(*low, *high);
                ParamValue::Int(v)
            }
        }
    }

    /// Projects a value back to the unit interval, log-aware.
    #[must_use]
    pub fn to_unit(&self, value: &ParamValue) -> f64 {
        let v = value.as_f64();
        let u = match self {
            Self::Continuous {
                low,
                high,
                log_scale,
            } => {
                if *log_scale {
                    let log_low = low.ln();
                    let log_high = high.ln();
                    (v.max(*low).ln() - log_low) / (log_high - log_low).max(f64::EPSILON)
                } else {
                    (v - low) / (high - low).max(f64::EPSILON)
                }
            }
            Self::Integer { low, high } => {
                (v - *low as f64) / ((high - low) as f64).max(f64::EPSILON)
            }
        };
        u.clamp(0.0, 1.0)
    }
}

/// Ordered set of hyperparameter distributions.
///
/// Parameter order is insertion order and stays stable, so optimizers can
/// treat a trial as a fixed-length coordinate vector.
#[derive(Debug, Clone, Default)]
pub struct SearchSpace {
    params: Vec<(TuneParam, HyperParam)>,
}

impl SearchSpace {
    #[must_use]
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    #[must_use]
    pub fn add(mut self, key: TuneParam, param: HyperParam) -> Self {
        self.params.retain(|(k, _)| *k != key);
        self.params.push((key, param));
        self
    }

    #[must_use]
    pub fn get(&self, key: TuneParam) -> Option<&HyperParam> {
        self.params.iter().find(|(k, _)| *k == key).map(|(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(TuneParam, HyperParam)> {
        self.params.iter()
    }

    /// Samples one random trial.
    pub fn sample(&self, rng: &mut impl Rng) -> Trial {
        Trial {
            values: self
                .params
                .iter()
                .map(|(k, p)| (*k, p.sample(rng)))
                .collect(),
        }
    }

    /// Builds a trial from unit-interval coordinates in parameter order.
    #[must_use]
    pub fn from_unit(&self, coords: &[f64]) -> Trial {
        Trial {
            values: self
                .params
                .iter()
                .zip(coords.iter())
                .map(|((k, p), &u)| (*k, p.from_unit(u)))
                .collect(),
        }
    }

    /// Projects a trial onto unit-interval coordinates in parameter order.
    #[must_use]
    pub fn to_unit(&self, trial: &Trial) -> Vec<f64> {
        self.params
            .iter()
            .map(|(k, p)| trial.get(*k).map_or(0.5, |v| p.to_unit(&v)))
            .collect()
    }
}

/// One hyperparameter configuration to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    values: Vec<(TuneParam, ParamValue)>,
}

impl Trial {
    #[must_use]
    pub fn get(&self, key: TuneParam) -> Option<ParamValue> {
        self.values.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
    }

    #[must_use]
    pub fn get_f64(&self, key: TuneParam) -> Option<f64> {
        self.get(key).map(|v| v.as_f64())
    }

    #[must_use]
    pub fn get_usize(&self, key: TuneParam) -> Option<usize> {
        self.get(key).map(|v| v.as_usize())
    }
}

impl fmt::Display for Trial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{}={}", k.name(), v))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Evaluated trial with its objective score (higher is better).
#[derive(Debug, Clone)]
pub struct TrialResult {
    pub trial: Trial,
    pub score: f64,
}

/// Sequential optimizer over a [`SearchSpace`].
pub trait SearchStrategy {
    /// Proposes the next configurations to evaluate.
    fn suggest(&mut self, space: &SearchSpace, n: usize) -> Vec<Trial>;

    /// Feeds back an evaluated result (adaptive strategies learn from it).
    fn tell(&mut self, _space: &SearchSpace, _result: &TrialResult) {}
}

/// Uniform random sampling in [0, 1).
pub trait Rng {
    fn gen_f64(&mut self) -> f64;
}

/// Xorshift64 generator for deterministic trial reproduction.
#[derive(Debug, Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl Rng for XorShift64 {
    fn gen_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Random search baseline.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    n_trials: usize,
    suggested: usize,
    seed: u64,
}

impl RandomSearch {
    #[must_use]
    pub fn new(n_trials: usize) -> Self {
        Self {
            n_trials,
            suggested: 0,
            seed: 42,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.n_trials.saturating_sub(self.suggested)
    }
}

impl SearchStrategy for RandomSearch {
    fn suggest(&mut self, space: &SearchSpace, n: usize) -> Vec<Trial> {
        let n = n.min(self.remaining());
        let mut rng = XorShift64::new(self.seed.wrapping_add(self.suggested as u64));
        let trials: Vec<Trial> = (0..n).map(|_| space.sample(&mut rng)).collect();
        self.suggested += trials.len();
        trials
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_space() -> SearchSpace {
        SearchSpace::new()
            .add(TuneParam::NEstimators, HyperParam::integer(100, 2000))
            .add(
                TuneParam::LearningRate,
                HyperParam::continuous_log(0.001, 0.3),
            )
            .add(TuneParam::Subsample, HyperParam::continuous(0.5, 1.0))
    }

    #[test]
    fn test_sample_respects_bounds() {
        let space = toy_space();
        let mut rng = XorShift64::new(7);
        for _ in 0..200 {
            let trial = space.sample(&mut rng);
            let n = trial.get_usize(TuneParam::NEstimators).expect("n");
            assert!((100..=2000).contains(&n));
            let lr = trial.get_f64(TuneParam::LearningRate).expect("lr");
            assert!((0.001..=0.3).contains(&lr));
            let sub = trial.get_f64(TuneParam::Subsample).expect("sub");
            assert!((0.5..=1.0).contains(&sub));
        }
    }

    #[test]
    fn test_unit_round_trip() {
        let space = toy_space();
        let trial = space.from_unit(&[0.5, 0.5, 0.5]);
        let coords = space.to_unit(&trial);
        for &c in &coords {
            assert!((c - 0.5).abs() < 0.01, "coord drifted: {c}");
        }
    }

    #[test]
    fn test_log_scale_geometric_midpoint() {
        let param = HyperParam::continuous_log(0.001, 0.3);
        let mid = param.from_unit(0.5);
        let expected = (0.001f64 * 0.3).sqrt();
        assert!((mid.as_f64() - expected).abs() / expected < 1e-6);
    }

    #[test]
    fn test_random_search_deterministic_and_bounded() {
        let space = toy_space();
        let mut a = RandomSearch::new(10).with_seed(3);
        let mut b = RandomSearch::new(10).with_seed(3);
        assert_eq!(a.suggest(&space, 4), b.suggest(&space, 4));
        assert_eq!(a.suggest(&space, 100).len(), 6);
        assert_eq!(a.remaining(), 0);
    }

    #[test]
    fn test_add_replaces_existing_key() {
        let space = SearchSpace::new()
            .add(TuneParam::MaxDepth, HyperParam::integer(3, 15))
            .add(TuneParam::MaxDepth, HyperParam::integer(2, 8));
        assert_eq!(space.len(), 1);
        assert_eq!(
            space.get(TuneParam::MaxDepth),
            Some(&HyperParam::integer(2, 8))
        );
    }

    #[test]
    fn test_xorshift_unit_interval() {
        let mut rng = XorShift64::new(0);
        for _ in 0..1000 {
            let v = rng.gen_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }
}

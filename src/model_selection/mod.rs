//! Train/test splitting and cross-validation.
//!
//! Price targets are heavily right-skewed, so the splitters here stratify
//! on quantile bins of the target rather than sampling uniformly: a plain
//! random split of a listing dump can easily leave the test partition with
//! no luxury numbers at all.

use crate::error::{MongkolError, Result};
use crate::primitives::{Matrix, Vector};
use crate::traits::Estimator;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, warn};

/// Scores from each fold of a cross-validation run.
#[derive(Debug, Clone)]
pub struct CrossValidationResult {
    pub scores: Vec<f32>,
}

impl CrossValidationResult {
    #[must_use]
    pub fn mean(&self) -> f32 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.iter().sum::<f32>() / self.scores.len() as f32
    }

    #[must_use]
    pub fn std(&self) -> f32 {
        if self.scores.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .scores
            .iter()
            .map(|&score| (score - mean).powi(2))
            .sum::<f32>()
            / self.scores.len() as f32;
        variance.sqrt()
    }

    #[must_use]
    pub fn min(&self) -> f32 {
        self.scores.iter().copied().fold(f32::INFINITY, f32::min)
    }

    #[must_use]
    pub fn max(&self) -> f32 {
        self.scores
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Assigns each target value to a quantile bin.
///
/// Bin edges come from equally spaced quantiles of the sorted targets.
/// Duplicate edges (long runs of identical prices are common at the cheap
/// end) are collapsed, so fewer than `n_bins` distinct bins may come back;
/// with a constant target everything lands in bin 0.
#[must_use]
pub fn quantile_bins(y: &Vector<f32>, n_bins: usize) -> Vec<usize> {
    let n = y.len();
    if n == 0 || n_bins < 2 {
        return vec![0; n];
    }

    let mut sorted: Vec<f32> = y.as_slice().to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    // interior quantile edges, duplicates collapsed
    let mut edges: Vec<f32> = Vec::with_capacity(n_bins - 1);
    for k in 1..n_bins {
        let pos = (k as f32 / n_bins as f32) * (n - 1) as f32;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        let frac = pos - lo as f32;
        let edge = sorted[lo] * (1.0 - frac) + sorted[hi] * frac;
        if edges.last().map_or(true, |&last| edge > last) {
            edges.push(edge);
        }
    }
    if edges.len() + 1 < n_bins {
        debug!(
            requested = n_bins,
            effective = edges.len() + 1,
            "collapsed duplicate quantile edges"
        );
    }

    y.iter()
        .map(|&v| edges.iter().take_while(|&&e| v > e).count())
        .collect()
}

/// Train/test row indices stratified over quantile bins of the target.
///
/// Each bin contributes `test_size` of its rows to the test partition, so
/// the partitions' bin histograms agree with the full data within rounding.
/// The returned index lists are disjoint and cover every row.
///
/// # Errors
///
/// Fails for `test_size` outside (0, 1), an empty target, or a split that
/// would leave either partition empty.
pub fn stratified_split_indices(
    y: &Vector<f32>,
    test_size: f32,
    n_bins: usize,
    random_state: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0..1.0).contains(&test_size) || test_size == 0.0 {
        return Err(MongkolError::InvalidHyperparameter {
            param: "test_size".to_string(),
            value: test_size.to_string(),
            constraint: "must be in (0, 1)".to_string(),
        });
    }
    let n = y.len();
    if n == 0 {
        return Err(MongkolError::empty_input("target vector"));
    }

    let bins = quantile_bins(y, n_bins);
    let n_effective_bins = bins.iter().copied().max().unwrap_or(0) + 1;
    let mut per_bin: Vec<Vec<usize>> = vec![Vec::new(); n_effective_bins];
    for (i, &b) in bins.iter().enumerate() {
        per_bin[b].push(i);
    }

    let mut rng = StdRng::seed_from_u64(random_state);
    let mut train = Vec::with_capacity(n);
    let mut test = Vec::with_capacity((n as f32 * test_size).ceil() as usize);
    for indices in &mut per_bin {
        indices.shuffle(&mut rng);
        let n_test = (indices.len() as f32 * test_size).round() as usize;
        if n_test == 0 && indices.len() > 1 {
            warn!(
                bin_size = indices.len(),
                "quantile bin too small to contribute test rows"
            );
        }
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    if train.is_empty() || test.is_empty() {
        return Err(MongkolError::DataInsufficiency {
            context: "stratified split".to_string(),
            available: n,
            required: n_effective_bins * 2,
        });
    }
    Ok((train, test))
}

/// Splits feature matrix and target into stratified train/test partitions
/// using ten quantile bins of the target.
///
/// # Errors
///
/// Fails on row-count mismatch or when [`stratified_split_indices`] does.
#[allow(clippy::type_complexity)]
pub fn train_test_split(
    x: &Matrix<f32>,
    y: &Vector<f32>,
    test_size: f32,
    random_state: u64,
) -> Result<(Matrix<f32>, Matrix<f32>, Vector<f32>, Vector<f32>)> {
    if x.shape().0 != y.len() {
        return Err(MongkolError::dimension_mismatch(
            format!("{} rows", x.shape().0),
            format!("{} targets", y.len()),
        ));
    }
    let (train_idx, test_idx) = stratified_split_indices(y, test_size, 10, random_state)?;
    let (x_train, y_train) = extract_samples(x, y, &train_idx)?;
    let (x_test, y_test) = extract_samples(x, y, &test_idx)?;
    Ok((x_train, x_test, y_train, y_test))
}

/// Carves a validation partition out of training rows, stratified on five
/// coarser quantile bins (validation sets are small, so fewer bins keep
/// each one populated).
///
/// # Errors
///
/// Fails when [`stratified_split_indices`] does.
pub fn validation_split_indices(
    y_train: &Vector<f32>,
    validation_size: f32,
    random_state: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    stratified_split_indices(y_train, validation_size, 5, random_state)
}

/// Extracts the rows named by `indices` from both the matrix and target.
pub(crate) fn extract_samples(
    x: &Matrix<f32>,
    y: &Vector<f32>,
    indices: &[usize],
) -> Result<(Matrix<f32>, Vector<f32>)> {
    let n_features = x.shape().1;
    let mut x_data = Vec::with_capacity(indices.len() * n_features);
    let mut y_data = Vec::with_capacity(indices.len());

    for &idx in indices {
        for j in 0..n_features {
            x_data.push(x.get(idx, j));
        }
        y_data.push(y[idx]);
    }

    let x_subset = Matrix::from_vec(indices.len(), n_features, x_data)
        .map_err(|e| MongkolError::ValidationError {
            message: e.to_string(),
        })?;
    Ok((x_subset, Vector::from_vec(y_data)))
}

/// Runs K-fold cross-validation and collects per-fold scores.
///
/// # Errors
///
/// Propagates the first fold-fit failure.
pub fn cross_validate<E>(
    estimator: &E,
    x: &Matrix<f32>,
    y: &Vector<f32>,
    cv: &KFold,
) -> Result<CrossValidationResult>
where
    E: Estimator + Clone,
{
    let n_samples = x.shape().0;
    let splits = cv.split(n_samples);

    let mut scores = Vec::with_capacity(splits.len());
    for (train_idx, test_idx) in splits {
        let (x_train, y_train) = extract_samples(x, y, &train_idx)?;
        let (x_test, y_test) = extract_samples(x, y, &test_idx)?;

        let mut fold_model = estimator.clone();
        fold_model.fit(&x_train, &y_train)?;
        scores.push(fold_model.score(&x_test, &y_test));
    }

    Ok(CrossValidationResult { scores })
}

/// K-fold cross-validation with per-sample weights applied to every
/// training fold.
///
/// # Errors
///
/// Fails on a weight-length mismatch and propagates the first
/// fold-fit failure.
pub fn cross_validate_weighted<E>(
    estimator: &E,
    x: &Matrix<f32>,
    y: &Vector<f32>,
    sample_weight: &Vector<f32>,
    cv: &KFold,
) -> Result<CrossValidationResult>
where
    E: Estimator + Clone,
{
    if sample_weight.len() != y.len() {
        return Err(MongkolError::dimension_mismatch(
            format!("{} targets", y.len()),
            format!("{} weights", sample_weight.len()),
        ));
    }
    let splits = cv.split(x.shape().0);

    let mut scores = Vec::with_capacity(splits.len());
    for (train_idx, test_idx) in splits {
        let (x_train, y_train) = extract_samples(x, y, &train_idx)?;
        let (x_test, y_test) = extract_samples(x, y, &test_idx)?;
        let w_train = Vector::from_vec(train_idx.iter().map(|&i| sample_weight[i]).collect());

        let mut fold_model = estimator.clone();
        fold_model.fit_weighted(&x_train, &y_train, &w_train)?;
        scores.push(fold_model.score(&x_test, &y_test));
    }

    Ok(CrossValidationResult { scores })
}

/// K-Fold cross-validator. Each fold serves once as the held-out set.
#[derive(Debug, Clone)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl KFold {
    #[must_use]
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Sets the shuffle seed; implies shuffling.
    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self.shuffle = true;
        self
    }

    /// Generates `(train_indices, test_indices)` for each fold.
    #[must_use]
    pub fn split(&self, n_samples: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            if let Some(seed) = self.random_state {
                let mut rng = StdRng::seed_from_u64(seed);
                indices.shuffle(&mut rng);
            } else {
                let mut rng = rand::thread_rng();
                indices.shuffle(&mut rng);
            }
        }

        let fold_size = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut result = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for i in 0..self.n_splits {
            let current_fold_size = if i < remainder {
                fold_size + 1
            } else {
                fold_size
            };
            let end = start + current_fold_size;

            let test_indices: Vec<usize> = indices[start..end].to_vec();
            let mut train_indices = Vec::with_capacity(n_samples - current_fold_size);
            train_indices.extend_from_slice(&indices[..start]);
            train_indices.extend_from_slice(&indices[end..]);

            result.push((train_indices, test_indices));
            start = end;
        }
        result
    }
}

/// Stratified K-Fold over integer-valued labels, used for router
/// cross-validation so every fold sees every price tier.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    shuffle: bool,
    random_state: Option<u64>,
}

impl StratifiedKFold {
    #[must_use]
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            random_state: None,
        }
    }

    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    #[must_use]
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self.shuffle = true;
        self
    }

    /// Generates stratified `(train_indices, test_indices)` per fold by
    /// splitting each class separately and combining.
    #[must_use]
    pub fn split(&self, y: &Vector<f32>) -> Vec<(Vec<usize>, Vec<usize>)> {
        use std::collections::BTreeMap;

        let n_samples = y.len();

        // BTreeMap keeps class iteration order deterministic
        let mut class_indices: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (i, &label) in y.as_slice().iter().enumerate() {
            class_indices.entry(label as i32).or_default().push(i);
        }

        if self.shuffle {
            for indices in class_indices.values_mut() {
                if let Some(seed) = self.random_state {
                    let mut rng = StdRng::seed_from_u64(seed);
                    indices.shuffle(&mut rng);
                } else {
                    let mut rng = rand::thread_rng();
                    indices.shuffle(&mut rng);
                }
            }
        }

        let mut fold_indices: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        for indices in class_indices.values() {
            let class_size = indices.len();
            let fold_size = class_size / self.n_splits;
            let remainder = class_size % self.n_splits;

            let mut start = 0;
            for (i, fold) in fold_indices.iter_mut().enumerate() {
                let current_size = if i < remainder {
                    fold_size + 1
                } else {
                    fold_size
                };
                let end = start + current_size;
                fold.extend_from_slice(&indices[start..end]);
                start = end;
            }
        }

        let mut result = Vec::with_capacity(self.n_splits);
        for i in 0..self.n_splits {
            let test_indices = fold_indices[i].clone();
            let mut train_indices = Vec::with_capacity(n_samples - test_indices.len());
            for (j, fold) in fold_indices.iter().enumerate() {
                if i != j {
                    train_indices.extend_from_slice(fold);
                }
            }
            result.push((train_indices, test_indices));
        }
        result
    }
}

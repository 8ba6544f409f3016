//! Feature scaling.
//!
//! Pattern features live on wildly different scales (binary flags next to
//! composites in the thousands) and many are heavy-tailed, so scaling is
//! chosen per column-name group rather than applied uniformly; see
//! [`GroupedPreprocessor`].
//!
//! # Example
//!
//! ```
//! use mongkol::preprocessing::StandardScaler;
//! use mongkol::primitives::Matrix;
//! use mongkol::traits::Transformer;
//!
//! let data = Matrix::from_vec(3, 2, vec![
//!     0.0, 0.0,
//!     1.0, 10.0,
//!     2.0, 20.0,
//! ]).expect("valid shape");
//!
//! let mut scaler = StandardScaler::new();
//! let scaled = scaler.fit_transform(&data).expect("fit_transform");
//! assert!(scaled.get(1, 0).abs() < 1e-5);
//! ```

use crate::error::{MongkolError, Result};
use crate::primitives::Matrix;
use crate::traits::Transformer;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Standardizes features to zero mean and unit variance: z = (x - mean) / std.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Vec<f32>>,
    std: Option<Vec<f32>>,
    with_mean: bool,
    with_std: bool,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mean: None,
            std: None,
            with_mean: true,
            with_std: true,
        }
    }

    /// Sets whether to center the data by subtracting the mean.
    #[must_use]
    pub fn with_mean(mut self, with_mean: bool) -> Self {
        self.with_mean = with_mean;
        self
    }

    /// Sets whether to scale the data by dividing by standard deviation.
    #[must_use]
    pub fn with_std(mut self, with_std: bool) -> Self {
        self.with_std = with_std;
        self
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.mean.is_some()
    }

    /// Transforms data back to the original scale.
    ///
    /// # Errors
    ///
    /// Returns an error if the scaler is unfitted or dimensions mismatch.
    pub fn inverse_transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let mean = self
            .mean
            .as_ref()
            .ok_or_else(|| MongkolError::from("scaler not fitted"))?;
        let std = self
            .std
            .as_ref()
            .ok_or_else(|| MongkolError::from("scaler not fitted"))?;

        let (n_samples, n_features) = x.shape();
        if n_features != mean.len() {
            return Err(MongkolError::dimension_mismatch(
                format!("{} features", mean.len()),
                format!("{n_features} features"),
            ));
        }

        let mut result = vec![0.0; n_samples * n_features];
        for i in 0..n_samples {
            for j in 0..n_features {
                let mut val = x.get(i, j);
                if self.with_std && std[j] > 1e-10 {
                    val *= std[j];
                }
                if self.with_mean {
                    val += mean[j];
                }
                result[i * n_features + j] = val;
            }
        }
        Matrix::from_vec(n_samples, n_features, result).map_err(Into::into)
    }
}

impl Transformer for StandardScaler {
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples == 0 {
            return Err(MongkolError::empty_input("scaler fit"));
        }

        let mut mean = vec![0.0; n_features];
        for (j, mean_j) in mean.iter_mut().enumerate() {
            let mut sum = 0.0;
            for i in 0..n_samples {
                sum += x.get(i, j);
            }
            *mean_j = sum / n_samples as f32;
        }

        // population std, divide by n
        let mut std = vec![0.0; n_features];
        for (j, std_j) in std.iter_mut().enumerate() {
            let mut sum_sq = 0.0;
            for i in 0..n_samples {
                let diff = x.get(i, j) - mean[j];
                sum_sq += diff * diff;
            }
            *std_j = (sum_sq / n_samples as f32).sqrt();
        }

        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let mean = self
            .mean
            .as_ref()
            .ok_or_else(|| MongkolError::from("scaler not fitted"))?;
        let std = self
            .std
            .as_ref()
            .ok_or_else(|| MongkolError::from("scaler not fitted"))?;

        let (n_samples, n_features) = x.shape();
        if n_features != mean.len() {
            return Err(MongkolError::dimension_mismatch(
                format!("{} features", mean.len()),
                format!("{n_features} features"),
            ));
        }

        let mut result = vec![0.0; n_samples * n_features];
        for i in 0..n_samples {
            for j in 0..n_features {
                let mut val = x.get(i, j);
                if self.with_mean {
                    val -= mean[j];
                }
                if self.with_std && std[j] > 1e-10 {
                    val /= std[j];
                }
                result[i * n_features + j] = val;
            }
        }
        Matrix::from_vec(n_samples, n_features, result).map_err(Into::into)
    }
}

fn column_values(x: &Matrix<f32>, j: usize) -> Vec<f32> {
    (0..x.n_rows()).map(|i| x.get(i, j)).collect()
}

fn sorted_median(values: &mut [f32]) -> f32 {
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

fn percentile(sorted: &[f32], q: f32) -> f32 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q * (sorted.len() - 1) as f32;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f32;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

/// Scales by median and interquartile range: z = (x - median) / IQR.
///
/// Outlier-resistant, which matters for features like composite premium
/// scores where a handful of rows sit orders of magnitude above the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RobustScaler {
    center: Option<Vec<f32>>,
    scale: Option<Vec<f32>>,
}

impl RobustScaler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.center.is_some()
    }
}

impl Transformer for RobustScaler {
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples == 0 {
            return Err(MongkolError::empty_input("scaler fit"));
        }

        let mut center = Vec::with_capacity(n_features);
        let mut scale = Vec::with_capacity(n_features);
        for j in 0..n_features {
            let mut values = column_values(x, j);
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let median = if values.len() % 2 == 1 {
                values[values.len() / 2]
            } else {
                (values[values.len() / 2 - 1] + values[values.len() / 2]) / 2.0
            };
            let iqr = percentile(&values, 0.75) - percentile(&values, 0.25);
            center.push(median);
            scale.push(iqr);
        }

        self.center = Some(center);
        self.scale = Some(scale);
        Ok(())
    }

    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let center = self
            .center
            .as_ref()
            .ok_or_else(|| MongkolError::from("scaler not fitted"))?;
        let scale = self
            .scale
            .as_ref()
            .ok_or_else(|| MongkolError::from("scaler not fitted"))?;

        let (n_samples, n_features) = x.shape();
        if n_features != center.len() {
            return Err(MongkolError::dimension_mismatch(
                format!("{} features", center.len()),
                format!("{n_features} features"),
            ));
        }

        let mut result = vec![0.0; n_samples * n_features];
        for i in 0..n_samples {
            for j in 0..n_features {
                let mut val = x.get(i, j) - center[j];
                if scale[j] > 1e-10 {
                    val /= scale[j];
                }
                result[i * n_features + j] = val;
            }
        }
        Matrix::from_vec(n_samples, n_features, result).map_err(Into::into)
    }
}

fn yeo_johnson(x: f32, lambda: f32) -> f32 {
    if x >= 0.0 {
        if lambda.abs() > 1e-6 {
            ((x + 1.0).powf(lambda) - 1.0) / lambda
        } else {
            (x + 1.0).ln()
        }
    } else if (lambda - 2.0).abs() > 1e-6 {
        -(((-x + 1.0).powf(2.0 - lambda)) - 1.0) / (2.0 - lambda)
    } else {
        -(-x + 1.0).ln()
    }
}

fn yeo_johnson_log_likelihood(values: &[f32], lambda: f32) -> f32 {
    let n = values.len() as f32;
    let transformed: Vec<f32> = values.iter().map(|&v| yeo_johnson(v, lambda)).collect();
    let mean = transformed.iter().sum::<f32>() / n;
    let var = transformed
        .iter()
        .map(|t| (t - mean).powi(2))
        .sum::<f32>()
        / n;
    if var <= 0.0 {
        return f32::NEG_INFINITY;
    }
    let jacobian: f32 = values
        .iter()
        .map(|&v| v.signum() * (v.abs() + 1.0).ln())
        .sum();
    -0.5 * n * var.ln() + (lambda - 1.0) * jacobian
}

/// Yeo-Johnson power transform with per-column lambda, followed by
/// standardization of the transformed values.
///
/// Lambda is chosen by maximizing the profile log-likelihood over a grid
/// on [-2, 2]; with 41 grid points the fit is within 0.1 of the optimum,
/// plenty for ratio features whose only job is symmetrizing a skew.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PowerTransformer {
    lambdas: Option<Vec<f32>>,
    mean: Option<Vec<f32>>,
    std: Option<Vec<f32>>,
}

impl PowerTransformer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.lambdas.is_some()
    }

    #[must_use]
    pub fn lambdas(&self) -> Option<&[f32]> {
        self.lambdas.as_deref()
    }

    fn fit_lambda(values: &[f32]) -> f32 {
        let mut best_lambda = 1.0;
        let mut best_llf = f32::NEG_INFINITY;
        for k in 0..=40 {
            let lambda = -2.0 + k as f32 * 0.1;
            let llf = yeo_johnson_log_likelihood(values, lambda);
            if llf > best_llf {
                best_llf = llf;
                best_lambda = lambda;
            }
        }
        best_lambda
    }
}

impl Transformer for PowerTransformer {
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples == 0 {
            return Err(MongkolError::empty_input("transformer fit"));
        }

        let mut lambdas = Vec::with_capacity(n_features);
        let mut mean = Vec::with_capacity(n_features);
        let mut std = Vec::with_capacity(n_features);
        for j in 0..n_features {
            let values = column_values(x, j);
            let lambda = Self::fit_lambda(&values);
            let transformed: Vec<f32> = values.iter().map(|&v| yeo_johnson(v, lambda)).collect();
            let m = transformed.iter().sum::<f32>() / n_samples as f32;
            let s = (transformed.iter().map(|t| (t - m).powi(2)).sum::<f32>()
                / n_samples as f32)
                .sqrt();
            lambdas.push(lambda);
            mean.push(m);
            std.push(s);
        }

        self.lambdas = Some(lambdas);
        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let lambdas = self
            .lambdas
            .as_ref()
            .ok_or_else(|| MongkolError::from("transformer not fitted"))?;
        let mean = self.mean.as_ref().ok_or_else(|| MongkolError::from("transformer not fitted"))?;
        let std = self.std.as_ref().ok_or_else(|| MongkolError::from("transformer not fitted"))?;

        let (n_samples, n_features) = x.shape();
        if n_features != lambdas.len() {
            return Err(MongkolError::dimension_mismatch(
                format!("{} features", lambdas.len()),
                format!("{n_features} features"),
            ));
        }

        let mut result = vec![0.0; n_samples * n_features];
        for i in 0..n_samples {
            for j in 0..n_features {
                let mut val = yeo_johnson(x.get(i, j), lambdas[j]) - mean[j];
                if std[j] > 1e-10 {
                    val /= std[j];
                }
                result[i * n_features + j] = val;
            }
        }
        Matrix::from_vec(n_samples, n_features, result).map_err(Into::into)
    }
}

/// Scaling strategy for one column group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalingGroup {
    /// Left untouched: counts, repeats, binary flags.
    Passthrough,
    /// Median/IQR scaling: power and score columns with outliers.
    Robust,
    /// Yeo-Johnson then standardize: skewed ratios.
    Power,
    /// Plain standardization: everything else.
    Standard,
}

/// Picks the scaling group from a column name.
#[must_use]
pub fn scaling_group_for(name: &str) -> ScalingGroup {
    let lower = name.to_lowercase();
    if lower.starts_with("has_")
        || lower.starts_with("is_")
        || lower.ends_with("_flag")
        || lower.contains("count")
        || lower.contains("repeat")
        || lower.starts_with("num_")
    {
        ScalingGroup::Passthrough
    } else if lower.contains("ratio") || lower.contains("_to_") {
        ScalingGroup::Power
    } else if lower.contains("power")
        || lower.contains("weight")
        || lower.contains("score")
        || lower.contains("index")
    {
        ScalingGroup::Robust
    } else {
        ScalingGroup::Standard
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum ColumnScaler {
    Passthrough,
    Standard { mean: f32, std: f32 },
    Robust { center: f32, iqr: f32 },
    Power { lambda: f32, mean: f32, std: f32 },
}

impl ColumnScaler {
    fn fit(group: ScalingGroup, values: &[f32]) -> Self {
        match group {
            ScalingGroup::Passthrough => Self::Passthrough,
            ScalingGroup::Standard => {
                let n = values.len() as f32;
                let mean = values.iter().sum::<f32>() / n;
                let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n).sqrt();
                Self::Standard { mean, std }
            }
            ScalingGroup::Robust => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let center = percentile(&sorted, 0.5);
                let iqr = percentile(&sorted, 0.75) - percentile(&sorted, 0.25);
                Self::Robust { center, iqr }
            }
            ScalingGroup::Power => {
                let lambda = PowerTransformer::fit_lambda(values);
                let transformed: Vec<f32> =
                    values.iter().map(|&v| yeo_johnson(v, lambda)).collect();
                let n = transformed.len() as f32;
                let mean = transformed.iter().sum::<f32>() / n;
                let std =
                    (transformed.iter().map(|t| (t - mean).powi(2)).sum::<f32>() / n).sqrt();
                Self::Power { lambda, mean, std }
            }
        }
    }

    fn apply(&self, x: f32) -> f32 {
        match *self {
            Self::Passthrough => x,
            Self::Standard { mean, std } => {
                let centered = x - mean;
                if std > 1e-10 {
                    centered / std
                } else {
                    centered
                }
            }
            Self::Robust { center, iqr } => {
                let centered = x - center;
                if iqr > 1e-10 {
                    centered / iqr
                } else {
                    centered
                }
            }
            Self::Power { lambda, mean, std } => {
                let centered = yeo_johnson(x, lambda) - mean;
                if std > 1e-10 {
                    centered / std
                } else {
                    centered
                }
            }
        }
    }
}

/// Group-aware preprocessor: each column gets the scaler its name group
/// calls for, and non-finite values are imputed with the column's training
/// median before scaling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupedPreprocessor {
    scalers: Option<Vec<ColumnScaler>>,
    medians: Option<Vec<f32>>,
    names: Vec<String>,
}

impl GroupedPreprocessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.scalers.is_some()
    }

    /// Column names seen at fit time.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    /// Fits one scaler per column according to its name group.
    ///
    /// # Errors
    ///
    /// Fails for empty input or a name/column count mismatch.
    pub fn fit(&mut self, x: &Matrix<f32>, names: &[String]) -> Result<()> {
        let (n_samples, n_features) = x.shape();
        if n_samples == 0 {
            return Err(MongkolError::empty_input("preprocessor fit"));
        }
        if names.len() != n_features {
            return Err(MongkolError::dimension_mismatch(
                format!("{n_features} columns"),
                format!("{} names", names.len()),
            ));
        }

        let mut scalers = Vec::with_capacity(n_features);
        let mut medians = Vec::with_capacity(n_features);
        let mut group_counts = [0usize; 4];
        for (j, name) in names.iter().enumerate() {
            let raw = column_values(x, j);
            let mut finite: Vec<f32> = raw.iter().copied().filter(|v| v.is_finite()).collect();
            let median = sorted_median(&mut finite);
            let imputed: Vec<f32> = raw
                .iter()
                .map(|&v| if v.is_finite() { v } else { median })
                .collect();

            let group = scaling_group_for(name);
            group_counts[match group {
                ScalingGroup::Passthrough => 0,
                ScalingGroup::Robust => 1,
                ScalingGroup::Power => 2,
                ScalingGroup::Standard => 3,
            }] += 1;
            scalers.push(ColumnScaler::fit(group, &imputed));
            medians.push(median);
        }
        debug!(
            passthrough = group_counts[0],
            robust = group_counts[1],
            power = group_counts[2],
            standard = group_counts[3],
            "fitted grouped preprocessor"
        );

        self.scalers = Some(scalers);
        self.medians = Some(medians);
        self.names = names.to_vec();
        Ok(())
    }

    /// Applies the fitted per-column scalers.
    ///
    /// # Errors
    ///
    /// Fails when unfitted or on a column-count mismatch.
    pub fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        let scalers = self
            .scalers
            .as_ref()
            .ok_or_else(|| MongkolError::from("preprocessor not fitted"))?;
        let medians = self
            .medians
            .as_ref()
            .ok_or_else(|| MongkolError::from("preprocessor not fitted"))?;

        let (n_samples, n_features) = x.shape();
        if n_features != scalers.len() {
            return Err(MongkolError::dimension_mismatch(
                format!("{} features", scalers.len()),
                format!("{n_features} features"),
            ));
        }

        let mut result = vec![0.0; n_samples * n_features];
        for i in 0..n_samples {
            for j in 0..n_features {
                let raw = x.get(i, j);
                let val = if raw.is_finite() { raw } else { medians[j] };
                result[i * n_features + j] = scalers[j].apply(val);
            }
        }
        Matrix::from_vec(n_samples, n_features, result).map_err(Into::into)
    }

    /// Fit and transform in one pass.
    ///
    /// # Errors
    ///
    /// Fails when either [`Self::fit`] or [`Self::transform`] does.
    pub fn fit_transform(&mut self, x: &Matrix<f32>, names: &[String]) -> Result<Matrix<f32>> {
        self.fit(x, names)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: usize, cols: usize, data: Vec<f32>) -> Matrix<f32> {
        Matrix::from_vec(rows, cols, data).expect("valid shape")
    }

    #[test]
    fn test_standard_scaler_zero_mean_unit_std() {
        let x = matrix(4, 1, vec![2.0, 4.0, 6.0, 8.0]);
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).expect("fit_transform");

        let mean: f32 = (0..4).map(|i| scaled.get(i, 0)).sum::<f32>() / 4.0;
        assert!(mean.abs() < 1e-5);
        let var: f32 = (0..4).map(|i| scaled.get(i, 0).powi(2)).sum::<f32>() / 4.0;
        assert!((var - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_standard_scaler_inverse_round_trip() {
        let x = matrix(3, 2, vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0]);
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).expect("fit_transform");
        let restored = scaler.inverse_transform(&scaled).expect("inverse");
        for (a, b) in x.as_slice().iter().zip(restored.as_slice()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_standard_scaler_constant_column() {
        let x = matrix(3, 1, vec![5.0, 5.0, 5.0]);
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).expect("fit_transform");
        for i in 0..3 {
            assert_eq!(scaled.get(i, 0), 0.0);
        }
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let x = matrix(2, 1, vec![1.0, 2.0]);
        assert!(StandardScaler::new().transform(&x).is_err());
        assert!(RobustScaler::new().transform(&x).is_err());
        assert!(PowerTransformer::new().transform(&x).is_err());
    }

    #[test]
    fn test_robust_scaler_outlier_resistance() {
        // identical data apart from one huge outlier
        let clean = matrix(5, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let dirty = matrix(5, 1, vec![1.0, 2.0, 3.0, 4.0, 5000.0]);

        let mut a = RobustScaler::new();
        a.fit(&clean).expect("fit");
        let mut b = RobustScaler::new();
        b.fit(&dirty).expect("fit");

        // median-centered value of x=2 barely moves despite the outlier
        let ta = a.transform(&clean).expect("transform").get(1, 0);
        let tb = b.transform(&dirty).expect("transform").get(1, 0);
        assert!((ta - tb).abs() < 0.5);
    }

    #[test]
    fn test_power_transformer_reduces_skew() {
        let values: Vec<f32> = (0..20).map(|i| (i as f32 / 2.0).exp()).collect();
        let x = matrix(20, 1, values);
        let mut pt = PowerTransformer::new();
        let t = pt.fit_transform(&x).expect("fit_transform");

        // after transform the largest value no longer dominates
        let col: Vec<f32> = (0..20).map(|i| t.get(i, 0)).collect();
        let max = col.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(max < 3.0, "still skewed: max {max}");
    }

    #[test]
    fn test_yeo_johnson_identity_at_lambda_one() {
        for x in [-3.0_f32, -0.5, 0.0, 0.5, 3.0] {
            assert!((yeo_johnson(x, 1.0) - x).abs() < 1e-5);
        }
    }

    #[test]
    fn test_yeo_johnson_log_branch() {
        assert!((yeo_johnson(1.0, 0.0) - 2.0_f32.ln()).abs() < 1e-6);
        assert!((yeo_johnson(-1.0, 2.0) + 2.0_f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn test_scaling_group_heuristics() {
        assert_eq!(scaling_group_for("power_sum"), ScalingGroup::Robust);
        assert_eq!(scaling_group_for("ending_score"), ScalingGroup::Robust);
        assert_eq!(scaling_group_for("unique_digit_count"), ScalingGroup::Passthrough);
        assert_eq!(scaling_group_for("has_forbidden_pair"), ScalingGroup::Passthrough);
        assert_eq!(scaling_group_for("triple_repeat_flag"), ScalingGroup::Passthrough);
        assert_eq!(scaling_group_for("good_to_bad_ratio"), ScalingGroup::Power);
        assert_eq!(scaling_group_for("ending_to_total"), ScalingGroup::Power);
        assert_eq!(scaling_group_for("digit_sum"), ScalingGroup::Standard);
    }

    #[test]
    fn test_grouped_preprocessor_passthrough_unchanged() {
        let x = matrix(3, 2, vec![1.0, 100.0, 2.0, 200.0, 3.0, 300.0]);
        let names = vec!["unique_digit_count".to_string(), "digit_sum".to_string()];
        let mut prep = GroupedPreprocessor::new();
        let t = prep.fit_transform(&x, &names).expect("fit_transform");

        // count column untouched, standard column centered
        assert_eq!(t.get(0, 0), 1.0);
        assert_eq!(t.get(2, 0), 3.0);
        assert!(t.get(1, 1).abs() < 1e-5);
    }

    #[test]
    fn test_grouped_preprocessor_imputes_non_finite() {
        let x = matrix(3, 1, vec![1.0, f32::NAN, 3.0]);
        let names = vec!["digit_sum".to_string()];
        let mut prep = GroupedPreprocessor::new();
        let t = prep.fit_transform(&x, &names).expect("fit_transform");
        for i in 0..3 {
            assert!(t.get(i, 0).is_finite());
        }
    }

    #[test]
    fn test_grouped_preprocessor_name_count_mismatch() {
        let x = matrix(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        let names = vec!["a".to_string()];
        assert!(GroupedPreprocessor::new().fit(&x, &names).is_err());
    }

    #[test]
    fn test_grouped_preprocessor_deterministic() {
        let x = matrix(4, 2, vec![1.0, 5.0, 2.0, 6.0, 3.0, 7.0, 4.0, 8.0]);
        let names = vec!["power_sum".to_string(), "good_to_bad_ratio".to_string()];
        let mut a = GroupedPreprocessor::new();
        let ta = a.fit_transform(&x, &names).expect("fit_transform");
        let mut b = GroupedPreprocessor::new();
        let tb = b.fit_transform(&x, &names).expect("fit_transform");
        assert_eq!(ta.as_slice(), tb.as_slice());
    }
}

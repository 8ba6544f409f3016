//! Core traits for estimators and transformers.
//!
//! These traits define the API contracts shared by the tier regressors,
//! the router classifier, and the preprocessing stack.

use crate::error::Result;
use crate::primitives::{Matrix, Vector};

/// Primary trait for supervised learning estimators.
///
/// Estimators implement fit/predict/score following sklearn conventions.
/// Every boosted-tree family in [`crate::tree`] implements this, which is
/// what lets tier models and ensemble members be swapped freely.
pub trait Estimator {
    /// Fits the model to training data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails (dimension mismatch, empty data,
    /// invalid hyperparameters).
    fn fit(&mut self, x: &Matrix<f32>, y: &Vector<f32>) -> Result<()>;

    /// Fits with per-row sample weights. The default ignores weights and
    /// delegates to [`Estimator::fit`]; weight-aware models override this.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails or weight length mismatches rows.
    fn fit_weighted(
        &mut self,
        x: &Matrix<f32>,
        y: &Vector<f32>,
        _sample_weight: &Vector<f32>,
    ) -> Result<()> {
        self.fit(x, y)
    }

    /// Predicts target values for input data.
    fn predict(&self, x: &Matrix<f32>) -> Vector<f32>;

    /// Computes the score (R² for regression, accuracy for classification).
    fn score(&self, x: &Matrix<f32>, y: &Vector<f32>) -> f32;

    /// Per-feature importance (total split gain), when the model tracks it.
    fn feature_importances(&self) -> Option<Vec<f32>> {
        None
    }
}

/// Trait for unsupervised learning models.
pub trait UnsupervisedEstimator {
    /// The type of labels/clusters produced.
    type Labels;

    /// Fits the model to data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails (empty data, invalid parameters).
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()>;

    /// Predicts cluster assignments for data.
    fn predict(&self, x: &Matrix<f32>) -> Self::Labels;
}

/// Trait for data transformers (scalers, power transforms).
///
/// All statistics are frozen at `fit` time; `transform` must never look at
/// the data it is given beyond applying the frozen parameters.
pub trait Transformer {
    /// Fits the transformer to data.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit(&mut self, x: &Matrix<f32>) -> Result<()>;

    /// Transforms data using fitted parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the transformer is not fitted.
    fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>>;

    /// Fits and transforms in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if fitting fails.
    fn fit_transform(&mut self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MongkolError;

    struct MockTransformer {
        fitted: bool,
        scale: f32,
    }

    impl MockTransformer {
        fn new() -> Self {
            Self {
                fitted: false,
                scale: 1.0,
            }
        }
    }

    impl Transformer for MockTransformer {
        fn fit(&mut self, x: &Matrix<f32>) -> Result<()> {
            if x.n_rows() == 0 {
                return Err(MongkolError::DimensionMismatch {
                    expected: "non-empty matrix".to_string(),
                    actual: "empty matrix (0 rows)".to_string(),
                });
            }
            let mut sum = 0.0;
            for row in 0..x.n_rows() {
                for col in 0..x.n_cols() {
                    sum += x.get(row, col);
                }
            }
            let total = x.n_rows() * x.n_cols();
            self.scale = if total > 0 { sum / total as f32 } else { 1.0 };
            if self.scale == 0.0 {
                self.scale = 1.0;
            }
            self.fitted = true;
            Ok(())
        }

        fn transform(&self, x: &Matrix<f32>) -> Result<Matrix<f32>> {
            if !self.fitted {
                return Err(MongkolError::ValidationError {
                    message: "MockTransformer not fitted".to_string(),
                });
            }
            let mut data = Vec::with_capacity(x.n_rows() * x.n_cols());
            for row in 0..x.n_rows() {
                for col in 0..x.n_cols() {
                    data.push(x.get(row, col) / self.scale);
                }
            }
            Matrix::from_vec(x.n_rows(), x.n_cols(), data).map_err(|e| {
                MongkolError::ValidationError {
                    message: e.to_string(),
                }
            })
        }
    }

    #[test]
    fn test_transformer_fit_transform_default() {
        let mut transformer = MockTransformer::new();
        let x = Matrix::from_vec(2, 2, vec![2.0, 4.0, 6.0, 8.0]).expect("matrix");

        let result = transformer.fit_transform(&x);
        assert!(result.is_ok());

        let transformed = result.expect("should succeed");
        assert_eq!(transformed.n_rows(), 2);
        assert_eq!(transformed.n_cols(), 2);
        assert!(transformer.fitted);
    }

    #[test]
    fn test_transformer_transform_without_fit() {
        let transformer = MockTransformer::new();
        let x = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).expect("matrix");

        let result = transformer.transform(&x);
        assert!(result.is_err());
    }

    #[test]
    fn test_transformer_fit_empty_matrix() {
        let mut transformer = MockTransformer::new();
        let x = Matrix::from_vec(0, 2, vec![]).expect("matrix");

        assert!(transformer.fit(&x).is_err());
    }

    #[test]
    fn test_transformer_scaling_values() {
        let mut transformer = MockTransformer::new();
        // mean of [2, 4, 6, 8] = 5
        let x = Matrix::from_vec(2, 2, vec![2.0, 4.0, 6.0, 8.0]).expect("matrix");

        let result = transformer.fit_transform(&x).expect("fit_transform");
        assert!((result.get(0, 0) - 0.4).abs() < f32::EPSILON);
        assert!((result.get(1, 1) - 1.6).abs() < f32::EPSILON);
    }

    struct MeanEstimator {
        mean: f32,
    }

    impl Estimator for MeanEstimator {
        fn fit(&mut self, _x: &Matrix<f32>, y: &Vector<f32>) -> Result<()> {
            self.mean = y.mean();
            Ok(())
        }

        fn predict(&self, x: &Matrix<f32>) -> Vector<f32> {
            Vector::from_vec(vec![self.mean; x.n_rows()])
        }

        fn score(&self, x: &Matrix<f32>, y: &Vector<f32>) -> f32 {
            crate::metrics::r_squared(&self.predict(x), y)
        }
    }

    #[test]
    fn test_fit_weighted_default_delegates_to_fit() {
        let mut est = MeanEstimator { mean: 0.0 };
        let x = Matrix::from_vec(3, 1, vec![1.0, 2.0, 3.0]).expect("matrix");
        let y = Vector::from_slice(&[2.0, 4.0, 6.0]);
        let w = Vector::from_slice(&[10.0, 1.0, 1.0]);

        est.fit_weighted(&x, &y, &w).expect("fit");
        // default implementation ignores weights
        assert!((est.mean - 4.0).abs() < 1e-6);
        assert!(est.feature_importances().is_none());
    }
}

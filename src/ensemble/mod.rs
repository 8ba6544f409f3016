//! Ensemble strategies over tier regressors.
//!
//! Four flavors share the same member pool: simple mean, median voting,
//! validation-weighted blending, and stacking with a ridge meta-model. The
//! super ensemble blends all three learned flavors with fixed weights. A
//! member that fails to fit is always dropped in isolation, never allowed
//! to take the whole ensemble down.

mod builder;
mod stacking;
mod voting;
mod weighted;

pub use builder::{EnsembleBuilder, EnsembleStrategy, FittedEnsemble, SuperEnsemble};
pub use stacking::StackingEnsemble;
pub use voting::{VoteKind, VotingEnsemble};
pub use weighted::WeightedEnsemble;

#[cfg(test)]
pub(crate) mod tests {
    use crate::error::{MongkolError, Result};
    use crate::primitives::{Matrix, Vector};
    use crate::traits::Estimator;
    use crate::tree::{BoosterParams, GradientBoostingRegressor, GrowthPolicy};

    /// y = 3x0 - x1 with a little curvature, 80 rows.
    pub(crate) fn linear_data() -> (Matrix<f32>, Vector<f32>) {
        let mut values = Vec::new();
        let mut targets = Vec::new();
        for i in 0..80 {
            let a = i as f32 / 8.0;
            let b = (i % 7) as f32;
            values.push(a);
            values.push(b);
            targets.push(3.0 * a - b + (a * 0.3).sin());
        }
        (
            Matrix::from_vec(80, 2, values).expect("matrix"),
            Vector::from_vec(targets),
        )
    }

    pub(crate) fn small_booster(seed: u64) -> GradientBoostingRegressor {
        GradientBoostingRegressor::new(
            BoosterParams {
                n_estimators: 40,
                learning_rate: 0.2,
                random_state: seed,
                ..BoosterParams::default()
            },
            GrowthPolicy::Depthwise { max_depth: 3 },
        )
    }

    /// Predicts a constant no matter the input.
    #[derive(Debug, Clone)]
    pub(crate) struct ToyModel {
        value: f32,
    }

    impl ToyModel {
        pub(crate) fn new(value: f32) -> Self {
            Self { value }
        }
    }

    impl Estimator for ToyModel {
        fn fit(&mut self, _x: &Matrix<f32>, _y: &Vector<f32>) -> Result<()> {
            Ok(())
        }

        fn predict(&self, x: &Matrix<f32>) -> Vector<f32> {
            Vector::from_vec(vec![self.value; x.n_rows()])
        }

        fn score(&self, x: &Matrix<f32>, y: &Vector<f32>) -> f32 {
            crate::metrics::r_squared(&self.predict(x), y)
        }
    }

    /// Constant model that can be configured to refuse fitting.
    #[derive(Debug, Clone)]
    pub(crate) struct FailingModel {
        value: f32,
        broken: bool,
    }

    impl FailingModel {
        pub(crate) fn working(value: f32) -> Self {
            Self {
                value,
                broken: false,
            }
        }

        pub(crate) fn broken() -> Self {
            Self {
                value: 0.0,
                broken: true,
            }
        }
    }

    impl Estimator for FailingModel {
        fn fit(&mut self, _x: &Matrix<f32>, _y: &Vector<f32>) -> Result<()> {
            if self.broken {
                return Err(MongkolError::from("member refuses to fit"));
            }
            Ok(())
        }

        fn predict(&self, x: &Matrix<f32>) -> Vector<f32> {
            Vector::from_vec(vec![self.value; x.n_rows()])
        }

        fn score(&self, x: &Matrix<f32>, y: &Vector<f32>) -> f32 {
            crate::metrics::r_squared(&self.predict(x), y)
        }
    }

    /// Heterogeneous member for selection tests.
    #[derive(Debug, Clone)]
    pub(crate) enum EitherModel {
        Constant(ToyModel),
        Booster(Box<GradientBoostingRegressor>),
    }

    impl Estimator for EitherModel {
        fn fit(&mut self, x: &Matrix<f32>, y: &Vector<f32>) -> Result<()> {
            match self {
                Self::Constant(m) => m.fit(x, y),
                Self::Booster(m) => m.fit(x, y),
            }
        }

        fn predict(&self, x: &Matrix<f32>) -> Vector<f32> {
            match self {
                Self::Constant(m) => m.predict(x),
                Self::Booster(m) => m.predict(x),
            }
        }

        fn score(&self, x: &Matrix<f32>, y: &Vector<f32>) -> f32 {
            match self {
                Self::Constant(m) => m.score(x, y),
                Self::Booster(m) => m.score(x, y),
            }
        }
    }
}

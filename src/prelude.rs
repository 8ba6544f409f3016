//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use mongkol::prelude::*;
//! ```

pub use crate::artifact::{ModelArtifact, PriceQuote};
pub use crate::error::{MongkolError, Result};
pub use crate::features::{FeatureAssembler, FeatureFrame};
pub use crate::market::MarketStatistics;
pub use crate::metrics::{mae, mse, r_squared, rmse, silhouette_score};
pub use crate::model_selection::{cross_validate, train_test_split, KFold};
pub use crate::phone::PhoneNumber;
pub use crate::preprocessing::GroupedPreprocessor;
pub use crate::primitives::{Matrix, Vector};
pub use crate::scoring::ScoringTables;
pub use crate::tier::{TierBoundaries, TierPredictor};
pub use crate::traits::{Estimator, Transformer, UnsupervisedEstimator};
pub use crate::tree::GradientBoostingRegressor;

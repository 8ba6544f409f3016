//! Mongkol: price prediction for Thai mobile phone numbers.
//!
//! Mongkol turns a ten-digit number into a numeric feature vector,
//! routes it to a market tier, and prices it with tier-specialized
//! gradient-boosted experts. Training artifacts serialize to a single
//! versioned file that the quoting interface loads back.
//!
//! # Quick Start
//!
//! ```
//! use mongkol::prelude::*;
//!
//! // Turn raw listings into a feature table.
//! let phones: Vec<PhoneNumber> = ["0888888888", "0812345678"]
//!     .iter()
//!     .map(|raw| PhoneNumber::parse(raw))
//!     .collect::<Result<_>>()
//!     .unwrap();
//!
//! let frame = FeatureAssembler::new().assemble(&phones).unwrap();
//! assert_eq!(frame.n_rows(), 2);
//!
//! // The repeat-heavy number scores higher on digit repetition.
//! let col = frame.names().iter().position(|n| n == "max_consecutive_run").unwrap();
//! let x = frame.to_matrix().unwrap();
//! assert!(x.get(0, col) > x.get(1, col));
//! ```
//!
//! # Modules
//!
//! - [`phone`]: Validated phone number type and parsing
//! - [`features`]: Pattern feature library and feature assembly
//! - [`scoring`]: Cultural scoring tables (lucky sums, pair meanings)
//! - [`market`]: Market statistics estimated from the training partition
//! - [`preprocessing`]: Group-aware feature scaling
//! - [`model_selection`]: Stratified splitting and cross-validation
//! - [`cluster`]: K-Means clustering for tier discovery
//! - [`tree`]: Gradient-boosted tree regressors and classifiers
//! - [`tier`]: Price-tier boundaries, routing, and per-tier experts
//! - [`automl`]: Hyperparameter search (TPE) and device probing
//! - [`ensemble`]: Voting, weighted, stacking, and super ensembles
//! - [`artifact`]: Model persistence and the quoting interface
//! - [`metrics`]: Evaluation metrics
//! - [`primitives`]: Core Vector and Matrix types

pub mod artifact;
pub mod automl;
pub mod cluster;
pub mod ensemble;
pub mod error;
pub mod features;
pub mod market;
pub mod metrics;
pub mod model_selection;
pub mod phone;
pub mod prelude;
pub mod preprocessing;
pub mod primitives;
pub mod scoring;
pub mod tier;
pub mod traits;
pub mod tree;

pub use error::{MongkolError, Result};
pub use primitives::{Matrix, Vector};
pub use traits::{Estimator, Transformer, UnsupervisedEstimator};

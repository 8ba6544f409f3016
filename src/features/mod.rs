//! Digit-pattern feature engineering.
//!
//! [`patterns`] holds the pure per-number scoring functions; [`assembler`]
//! runs the whole library over a batch of numbers and produces the ordered
//! feature matrix consumed by training and inference.

pub mod assembler;
pub mod patterns;

pub use assembler::{FeatureAssembler, FeatureFrame};

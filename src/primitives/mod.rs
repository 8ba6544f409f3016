//! Numeric primitives (Vector, Matrix).
//!
//! Dense row-major storage; the foundation for feature frames,
//! scalers, and the tree models.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;

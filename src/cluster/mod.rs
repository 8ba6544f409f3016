//! Clustering.
//!
//! K-Means over log-prices is how tier boundaries get discovered; see the
//! tier module for the boundary derivation.

mod kmeans;

pub use kmeans::KMeans;

//! Price tier boundaries.

use crate::cluster::KMeans;
use crate::error::{MongkolError, Result};
use crate::metrics::silhouette_score;
use crate::primitives::Matrix;
use crate::traits::UnsupervisedEstimator;
use serde::{Deserialize, Serialize};
use tracing::info;

const MIN_TIERS: usize = 2;
const MAX_TIERS: usize = 5;

/// Monotonic price thresholds separating market tiers.
///
/// Edges always start at 0 and end at infinity, so every non-negative
/// price lands in exactly one tier. Interior edges come from clustering
/// log-prices: the threshold between two adjacent clusters is the price at
/// the midpoint of their centers in log space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierBoundaries {
    edges: Vec<f32>,
}

impl TierBoundaries {
    /// Builds boundaries from explicit edges.
    ///
    /// # Errors
    ///
    /// Fails unless edges start at 0, end at infinity, are strictly
    /// increasing, and describe at least one tier.
    pub fn from_edges(edges: Vec<f32>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(MongkolError::ValidationError {
                message: "boundaries need at least two edges".to_string(),
            });
        }
        if edges[0] != 0.0 {
            return Err(MongkolError::ValidationError {
                message: "boundaries must start at 0".to_string(),
            });
        }
        if *edges.last().unwrap_or(&0.0) != f32::INFINITY {
            return Err(MongkolError::ValidationError {
                message: "boundaries must end at infinity".to_string(),
            });
        }
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(MongkolError::ValidationError {
                message: "boundary edges must be strictly increasing".to_string(),
            });
        }
        Ok(Self { edges })
    }

    /// Discovers boundaries by clustering log-prices, choosing the tier
    /// count in 2..=5 with the best silhouette score.
    ///
    /// # Errors
    ///
    /// Fails when there are too few distinct prices to form two tiers.
    pub fn discover(prices: &[f32], random_state: u64) -> Result<Self> {
        let log_prices: Vec<f32> = prices.iter().map(|p| p.max(0.0).ln_1p()).collect();
        let mut distinct = log_prices.clone();
        distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        distinct.dedup();
        if distinct.len() < MIN_TIERS {
            return Err(MongkolError::DataInsufficiency {
                context: "tier discovery".to_string(),
                available: distinct.len(),
                required: MIN_TIERS,
            });
        }

        let data = Matrix::from_vec(log_prices.len(), 1, log_prices.clone())
            .map_err(|e| MongkolError::ValidationError {
                message: e.to_string(),
            })?;

        let k_max = MAX_TIERS.min(distinct.len());
        let mut best: Option<(f32, KMeans)> = None;
        for k in MIN_TIERS..=k_max {
            let mut kmeans = KMeans::new(k).with_random_state(random_state);
            if kmeans.fit(&data).is_err() {
                continue;
            }
            let labels = kmeans.labels().unwrap_or(&[]).to_vec();
            let score = silhouette_score(&data, &labels);
            if best.as_ref().map_or(true, |(s, _)| score > *s) {
                best = Some((score, kmeans));
            }
        }
        let (score, kmeans) = best.ok_or_else(|| MongkolError::DataInsufficiency {
            context: "tier discovery".to_string(),
            available: distinct.len(),
            required: MIN_TIERS,
        })?;

        let centroids = kmeans
            .centroids()
            .ok_or_else(|| MongkolError::from("k-means produced no centroids"))?;
        let mut centers: Vec<f32> = (0..centroids.n_rows()).map(|c| centroids.get(c, 0)).collect();
        centers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut edges = Vec::with_capacity(centers.len() + 1);
        edges.push(0.0);
        for pair in centers.windows(2) {
            let midpoint = (pair[0] + pair[1]) / 2.0;
            let edge = midpoint.exp_m1();
            // guard against centers collapsing onto the same edge
            if edges.last().map_or(true, |&last| edge > last) {
                edges.push(edge);
            }
        }
        edges.push(f32::INFINITY);

        info!(
            n_tiers = edges.len() - 1,
            silhouette = score,
            "discovered tier boundaries"
        );
        Self::from_edges(edges)
    }

    #[must_use]
    pub fn n_tiers(&self) -> usize {
        self.edges.len() - 1
    }

    /// Interior edges plus the 0/infinity sentinels.
    #[must_use]
    pub fn edges(&self) -> &[f32] {
        &self.edges
    }

    /// Tier index for a price. Negative prices clamp to the first tier.
    #[must_use]
    pub fn tier_of(&self, price: f32) -> usize {
        let clamped = price.max(0.0);
        // edges[i] <= price < edges[i+1]
        self.edges[1..self.edges.len() - 1]
            .iter()
            .take_while(|&&edge| clamped >= edge)
            .count()
    }

    /// Tier indices for a batch of prices.
    #[must_use]
    pub fn assign(&self, prices: &[f32]) -> Vec<usize> {
        prices.iter().map(|&p| self.tier_of(p)).collect()
    }

    /// Human-readable tier name.
    #[must_use]
    pub fn label(&self, tier: usize) -> &'static str {
        const NAMES_2: [&str; 2] = ["standard", "luxury"];
        const NAMES_3: [&str; 3] = ["standard", "premium", "luxury"];
        const NAMES_4: [&str; 4] = ["budget", "standard", "premium", "luxury"];
        const NAMES_5: [&str; 5] = ["budget", "standard", "premium", "luxury", "ultra"];
        match self.n_tiers() {
            2 => NAMES_2.get(tier).copied().unwrap_or("unknown"),
            3 => NAMES_3.get(tier).copied().unwrap_or("unknown"),
            4 => NAMES_4.get(tier).copied().unwrap_or("unknown"),
            _ => NAMES_5.get(tier).copied().unwrap_or("unknown"),
        }
    }
}

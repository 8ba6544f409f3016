//! Price tier discovery, routing, and tier-specific regression.
//!
//! The phone market is heavily stratified: the bulk trades for hundreds of
//! baht while collectible numbers fetch millions. One global regressor
//! underfits both ends, so prices are first segmented into tiers by
//! clustering log-prices, a classifier routes each number to its tier, and
//! a dedicated expert regressor prices each segment.

mod boundaries;
mod predictor;
mod router;

pub use boundaries::TierBoundaries;
pub use predictor::{default_expert_configs, TierExpertConfig, TierPredictor};
pub use router::TierRouter;

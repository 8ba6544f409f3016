//! Hyperparameter optimization.
//!
//! Each booster family gets its own search space; a TPE optimizer walks it
//! guided by cross-validated R², and a device probe settles the training
//! backend once per session before any trial runs.

pub mod device;
pub mod search;
pub mod tpe;
pub mod tuner;

pub use device::{Device, DeviceProbe, ProbeState, PROBE_MAX_ROWS};
pub use search::{
    HyperParam, ParamValue, RandomSearch, Rng, SearchSpace, SearchStrategy, Trial, TrialResult,
    TuneParam, XorShift64,
};
pub use tpe::TpeSearch;
pub use tuner::{apply_trial, search_space_for, HyperparameterOptimizer, TunedBooster};

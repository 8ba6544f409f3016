//! Training device selection with probe-then-fallback.
//!
//! Accelerated training backends fail in ways that only show up at fit
//! time, so the requested device is never trusted directly: a tiny probe
//! fit runs first, and anything slower than the latency budget (or
//! erroring outright) demotes the session to the CPU path for good.

use crate::error::Result;
use std::time::Duration;
use tracing::{info, warn};

/// Training backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Device {
    Cpu,
    Gpu,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Gpu => write!(f, "gpu"),
        }
    }
}

/// Probe lifecycle. Once a terminal state is reached the answer is cached
/// for the rest of the tuning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Untested,
    Probing,
    GpuConfirmed,
    CpuFallback,
}

/// Rows the probe fit is allowed to see.
pub const PROBE_MAX_ROWS: usize = 100;

const DEFAULT_LATENCY_BUDGET: Duration = Duration::from_secs(30);

/// Decides which device a tuning session trains on.
#[derive(Debug, Clone)]
pub struct DeviceProbe {
    requested: Device,
    state: ProbeState,
    latency_budget: Duration,
}

impl DeviceProbe {
    #[must_use]
    pub fn new(requested: Device) -> Self {
        Self {
            requested,
            state: ProbeState::Untested,
            latency_budget: DEFAULT_LATENCY_BUDGET,
        }
    }

    #[must_use]
    pub fn with_latency_budget(mut self, budget: Duration) -> Self {
        self.latency_budget = budget;
        self
    }

    #[must_use]
    pub fn state(&self) -> ProbeState {
        self.state
    }

    /// Device decided so far, if the probe has concluded.
    #[must_use]
    pub fn device(&self) -> Option<Device> {
        match self.state {
            ProbeState::GpuConfirmed => Some(Device::Gpu),
            ProbeState::CpuFallback => Some(Device::Cpu),
            ProbeState::Untested | ProbeState::Probing => None,
        }
    }

    /// Resolves the device, running `probe_fit` once if needed.
    ///
    /// `probe_fit` performs a small training run on at most
    /// [`PROBE_MAX_ROWS`] rows and returns its wall time. A probe that
    /// errors or blows the latency budget demotes the session to CPU.
    pub fn resolve<F>(&mut self, probe_fit: F) -> Device
    where
        F: FnOnce() -> Result<Duration>,
    {
        if let Some(device) = self.device() {
            return device;
        }
        if self.requested == Device::Cpu {
            self.state = ProbeState::CpuFallback;
            return Device::Cpu;
        }

        self.state = ProbeState::Probing;
        match probe_fit() {
            Ok(elapsed) if elapsed <= self.latency_budget => {
                info!(elapsed_ms = elapsed.as_millis() as u64, "gpu probe passed");
                self.state = ProbeState::GpuConfirmed;
                Device::Gpu
            }
            Ok(elapsed) => {
                warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = self.latency_budget.as_millis() as u64,
                    "gpu probe too slow, falling back to cpu"
                );
                self.state = ProbeState::CpuFallback;
                Device::Cpu
            }
            Err(err) => {
                warn!(error = %err, "gpu probe failed, falling back to cpu");
                self.state = ProbeState::CpuFallback;
                Device::Cpu
            }
        }
    }
}

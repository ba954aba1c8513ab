//! Simulated hardware latencies.
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Blocking delays paid by the timed device commands.
///
/// The defaults model the relay firmware; tests that do not care about
/// timing use [`TimingConfig::instant`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Turn-on latency paid by `activate` before the transition.
    pub activation_delay_ms: u64,
    /// Latency of `reset`.
    pub reset_delay_ms: u64,
    /// Time to detect an injected fault.
    pub fault_detection_delay_ms: u64,
}

impl TimingConfig {
    pub fn instant() -> Self {
        Self {
            activation_delay_ms: 0,
            reset_delay_ms: 0,
            fault_detection_delay_ms: 0,
        }
    }

    pub fn activation_delay(&self) -> Duration {
        Duration::from_millis(self.activation_delay_ms)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }

    pub fn fault_detection_delay(&self) -> Duration {
        Duration::from_millis(self.fault_detection_delay_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            activation_delay_ms: 150,
            reset_delay_ms: 100,
            fault_detection_delay_ms: 50,
        }
    }
}

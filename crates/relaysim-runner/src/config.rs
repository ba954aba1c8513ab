use relaysim_model::device::DEFAULT_FAULT_TYPE;
use serde::{Deserialize, Serialize};

/// Scenario execution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Fault type used by `inject_fault` commands that name none.
    pub default_fault_type: String,
    /// Return the device to IDLE after each scenario of a batch.
    pub reset_between_scenarios: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_fault_type: DEFAULT_FAULT_TYPE.to_string(),
            reset_between_scenarios: true,
        }
    }
}

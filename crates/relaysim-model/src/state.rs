use std::fmt;

use serde::{Deserialize, Serialize};

/// Operating state of the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceState {
    Idle,
    Active,
    Fault,
}

impl DeviceState {
    pub const ALL: [DeviceState; 3] = [DeviceState::Idle, DeviceState::Active, DeviceState::Fault];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Idle => "IDLE",
            DeviceState::Active => "ACTIVE",
            DeviceState::Fault => "FAULT",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition tokens that authorize a transition.
pub mod conditions {
    pub const ACTIVATION_REQUESTED: &str = "activation_requested";
    pub const RESET_REQUESTED: &str = "reset_requested";
    pub const FAULT_INJECTED: &str = "fault_injected";
    pub const RESET_AFTER_FAULT: &str = "reset_after_fault";
}

/// (from, to) -> required condition. Nothing else is a legal transition.
pub const TRANSITIONS: [(DeviceState, DeviceState, &str); 5] = [
    (DeviceState::Idle, DeviceState::Active, conditions::ACTIVATION_REQUESTED),
    (DeviceState::Active, DeviceState::Idle, conditions::RESET_REQUESTED),
    (DeviceState::Idle, DeviceState::Fault, conditions::FAULT_INJECTED),
    (DeviceState::Active, DeviceState::Fault, conditions::FAULT_INJECTED),
    (DeviceState::Fault, DeviceState::Idle, conditions::RESET_AFTER_FAULT),
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransitionError {
    #[error("Cannot transition from {from} to {to} with condition '{condition}'")]
    InvalidTransition {
        from: DeviceState,
        to: DeviceState,
        condition: String,
    },
}

/// Gated state machine: a transition happens only when the supplied
/// condition matches the table entry for (current, target).
#[derive(Debug, Clone)]
pub struct StateMachine {
    current: DeviceState,
    fault_active: bool,
}

impl StateMachine {
    pub fn new(initial: DeviceState) -> Self {
        Self {
            current: initial,
            fault_active: false,
        }
    }

    pub fn current_state(&self) -> DeviceState {
        self.current
    }

    pub fn fault_active(&self) -> bool {
        self.fault_active
    }

    /// Required condition for a (from, to) pair, if the pair is in the table.
    pub fn required_condition(from: DeviceState, to: DeviceState) -> Option<&'static str> {
        TRANSITIONS
            .iter()
            .find(|(f, t, _)| *f == from && *t == to)
            .map(|(_, _, c)| *c)
    }

    pub fn can_transition(&self, target: DeviceState, condition: Option<&str>) -> bool {
        if self.current == target {
            return true;
        }
        match (Self::required_condition(self.current, target), condition) {
            (Some(required), Some(given)) => required == given,
            _ => false,
        }
    }

    /// Move to `target` under `condition`. A self-transition is a no-op
    /// that succeeds regardless of the condition.
    pub fn transition(
        &mut self,
        target: DeviceState,
        condition: &str,
    ) -> Result<DeviceState, TransitionError> {
        if self.current == target {
            return Ok(self.current);
        }
        if !self.can_transition(target, Some(condition)) {
            return Err(TransitionError::InvalidTransition {
                from: self.current,
                to: target,
                condition: condition.to_string(),
            });
        }

        let previous = self.current;
        self.current = target;

        if condition == conditions::FAULT_INJECTED {
            self.fault_active = true;
        } else if condition == conditions::RESET_AFTER_FAULT && previous == DeviceState::Fault {
            self.fault_active = false;
        }

        Ok(self.current)
    }

    pub fn activate(&mut self) -> Result<DeviceState, TransitionError> {
        self.transition(DeviceState::Active, conditions::ACTIVATION_REQUESTED)
    }

    /// Return to IDLE. Leaving FAULT uses `reset_after_fault` so the fault
    /// flag is cleared; any other state uses `reset_requested`.
    pub fn reset(&mut self) -> Result<DeviceState, TransitionError> {
        let condition = if self.current == DeviceState::Fault {
            conditions::RESET_AFTER_FAULT
        } else {
            conditions::RESET_REQUESTED
        };
        self.transition(DeviceState::Idle, condition)
    }

    pub fn inject_fault(&mut self) -> Result<DeviceState, TransitionError> {
        self.transition(DeviceState::Fault, conditions::FAULT_INJECTED)
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new(DeviceState::Idle)
    }
}

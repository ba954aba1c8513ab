use std::collections::BTreeMap;
use std::thread;

use relaysim_ir::Scalar;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::TimingConfig;
use crate::log::{EventLog, LogEntry, LogLevel};
use crate::register::{RegisterBank, RegisterError, RegisterId, RegisterValue};
use crate::state::{DeviceState, StateMachine, TransitionError};

/// status_word bit 0: device active.
pub const STATUS_ACTIVE: i64 = 0x0001;
/// status_word bit 7: fault latched.
pub const STATUS_FAULT: i64 = 0x0080;

pub const DEFAULT_FAULT_TYPE: &str = "overcurrent";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Cannot activate from state {state}. Must be in IDLE state.")]
    NotIdle { state: DeviceState },

    #[error("{0}")]
    Transition(#[from] TransitionError),
}

/// Read-only status snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub state: DeviceState,
    pub registers: BTreeMap<String, RegisterValue>,
    pub fault_active: bool,
    pub fault_type: Option<String>,
    pub log_count: usize,
}

/// Register effects applied by a known fault type.
#[derive(Debug, Clone, Copy, PartialEq)]
enum FaultEffect {
    Overcurrent,
    Overvoltage,
    Temperature,
}

impl FaultEffect {
    fn from_fault_type(fault_type: &str) -> Option<Self> {
        match fault_type {
            "overcurrent" => Some(FaultEffect::Overcurrent),
            "overvoltage" => Some(FaultEffect::Overvoltage),
            "temperature" => Some(FaultEffect::Temperature),
            _ => None,
        }
    }

    fn apply(&self, registers: &mut RegisterBank) {
        match self {
            FaultEffect::Overcurrent => registers.set_float(RegisterId::Current, 999.9),
            FaultEffect::Overvoltage => registers.set_float(RegisterId::Voltage, 500.0),
            FaultEffect::Temperature => registers.set_float(RegisterId::Temperature, 95.0),
        }
    }
}

/// Simulated firmware-controlled protection relay.
///
/// Owns its registers, state machine and event log. Commands block the
/// calling thread for their configured latency; one simulator must only be
/// driven by one scenario at a time.
#[derive(Debug)]
pub struct DeviceSimulator {
    machine: StateMachine,
    registers: RegisterBank,
    log: EventLog,
    timing: TimingConfig,
    fault_type: Option<String>,
}

impl DeviceSimulator {
    pub fn new() -> Self {
        Self::with_timing(TimingConfig::default())
    }

    pub fn with_timing(timing: TimingConfig) -> Self {
        let mut device = Self {
            machine: StateMachine::new(DeviceState::Idle),
            registers: RegisterBank::new(),
            log: EventLog::new(),
            timing,
            fault_type: None,
        };
        device.log.append(
            LogLevel::Info,
            "Device simulator initialized",
            json!({ "state": device.state() }),
        );
        device
    }

    pub fn state(&self) -> DeviceState {
        self.machine.current_state()
    }

    pub fn fault_active(&self) -> bool {
        self.machine.fault_active()
    }

    pub fn fault_type(&self) -> Option<&str> {
        self.fault_type.as_deref()
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub fn registers(&self) -> BTreeMap<String, RegisterValue> {
        self.registers.snapshot()
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.log.entries().to_vec()
    }

    pub fn log_count(&self) -> usize {
        self.log.len()
    }

    pub fn get_register(&self, name: &str) -> Result<RegisterValue, RegisterError> {
        self.registers.get(name)
    }

    pub fn write_register(
        &mut self,
        name: &str,
        value: impl Into<Scalar>,
    ) -> Result<(), RegisterError> {
        let (old, new) = self.registers.write(name, &value.into())?;
        self.log.append(
            LogLevel::Debug,
            format!("Register write: {name}"),
            json!({ "old_value": old, "new_value": new }),
        );
        Ok(())
    }

    /// IDLE -> ACTIVE after the activation delay.
    pub fn activate(&mut self) -> Result<(), CommandError> {
        let state = self.state();
        if state != DeviceState::Idle {
            return Err(CommandError::NotIdle { state });
        }

        self.log.append(
            LogLevel::Info,
            "Activation command received",
            json!({ "current_state": state }),
        );

        thread::sleep(self.timing.activation_delay());

        let previous = self.state();
        if let Err(e) = self.machine.activate() {
            self.log
                .append(LogLevel::Error, format!("Activation failed: {e}"), json!(null));
            return Err(e.into());
        }
        self.registers
            .update_int(RegisterId::StatusWord, |w| w | STATUS_ACTIVE);

        self.log.append(
            LogLevel::Info,
            "Device activated",
            json!({ "previous_state": previous, "new_state": self.state() }),
        );
        Ok(())
    }

    /// Return to IDLE from any state and clear the trip condition.
    /// The fault bit of status_word stays latched.
    pub fn reset(&mut self) -> Result<(), CommandError> {
        self.log.append(
            LogLevel::Info,
            "Reset command received",
            json!({ "current_state": self.state() }),
        );

        thread::sleep(self.timing.reset_delay());

        let previous = self.state();
        if let Err(e) = self.machine.reset() {
            self.log
                .append(LogLevel::Error, format!("Reset failed: {e}"), json!(null));
            return Err(e.into());
        }

        self.fault_type = None;
        self.registers.set_bool(RegisterId::TripFlag, false);
        self.registers
            .update_int(RegisterId::StatusWord, |w| w & !STATUS_ACTIVE);

        self.log.append(
            LogLevel::Info,
            "Device reset complete",
            json!({ "previous_state": previous, "new_state": self.state() }),
        );
        Ok(())
    }

    /// Force the device into FAULT. Trip side effects are applied even when
    /// the device is already faulted.
    pub fn inject_fault(&mut self, fault_type: &str) -> Result<(), CommandError> {
        self.log.append(
            LogLevel::Warning,
            format!("Fault injection: {fault_type}"),
            json!({ "current_state": self.state() }),
        );

        thread::sleep(self.timing.fault_detection_delay());

        let previous = self.state();
        if let Err(e) = self.machine.inject_fault() {
            self.log.append(
                LogLevel::Error,
                format!("Fault injection failed: {e}"),
                json!(null),
            );
            return Err(e.into());
        }

        self.fault_type = Some(fault_type.to_string());
        self.registers.set_bool(RegisterId::TripFlag, true);
        self.registers
            .update_int(RegisterId::TripCount, |n| n.saturating_add(1));
        self.registers
            .update_int(RegisterId::StatusWord, |w| w | STATUS_FAULT);
        if let Some(effect) = FaultEffect::from_fault_type(fault_type) {
            effect.apply(&mut self.registers);
        }

        self.log.append(
            LogLevel::Error,
            format!("Fault condition detected: {fault_type}"),
            json!({
                "previous_state": previous,
                "new_state": self.state(),
                "fault_type": fault_type,
            }),
        );
        Ok(())
    }

    pub fn get_status(&self) -> DeviceStatus {
        DeviceStatus {
            state: self.state(),
            registers: self.registers(),
            fault_active: self.fault_active(),
            fault_type: self.fault_type.clone(),
            log_count: self.log_count(),
        }
    }

    /// Drop all entries, leaving a single "Logs cleared" marker.
    pub fn clear_logs(&mut self) {
        self.log.clear();
        self.log.append(LogLevel::Info, "Logs cleared", json!(null));
    }
}

impl Default for DeviceSimulator {
    fn default() -> Self {
        Self::new()
    }
}

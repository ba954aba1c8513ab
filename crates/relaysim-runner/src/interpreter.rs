use std::thread;
use std::time::{Duration, Instant};

use relaysim_ir::{AssertStep, Scalar, Step};
use relaysim_model::{CommandError, DeviceSimulator, RegisterError};
use tracing::{debug, warn};

use crate::assertion;
use crate::config::RunnerConfig;
use crate::result::{StepResult, StepStatus};

/// Name of the read-only virtual register backed by the state machine.
pub const STATE_REGISTER: &str = "state";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StepError {
    #[error("Cannot write to 'state' register (read-only)")]
    ReadOnlyState,

    #[error("Unknown command action: {action}")]
    UnknownAction { action: String },

    #[error("{0}")]
    Register(#[from] RegisterError),

    #[error("{0}")]
    Command(#[from] CommandError),

    #[error("Cannot apply {operator} to {register}: {actual} and {operand} are not comparable")]
    Incomparable {
        register: String,
        operator: &'static str,
        actual: &'static str,
        operand: &'static str,
    },
}

/// Three-way result of executing one step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Pass,
    /// The assertion did not hold.
    Fail(String),
    /// The step could not be carried out.
    Error(String),
}

impl StepOutcome {
    pub fn status(&self) -> StepStatus {
        match self {
            StepOutcome::Pass => StepStatus::Pass,
            StepOutcome::Fail(_) => StepStatus::Fail,
            StepOutcome::Error(_) => StepStatus::Error,
        }
    }
}

/// Executes steps one at a time against a borrowed device.
pub struct StepInterpreter<'a> {
    device: &'a mut DeviceSimulator,
    config: &'a RunnerConfig,
}

impl<'a> StepInterpreter<'a> {
    pub fn new(device: &'a mut DeviceSimulator, config: &'a RunnerConfig) -> Self {
        Self { device, config }
    }

    /// Run `step` and record it as the `step_number`-th result.
    pub fn execute(&mut self, step_number: usize, step: &Step) -> StepResult {
        let started = Instant::now();
        let outcome = self.run_step(step);
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        let status = outcome.status();
        let message = match outcome {
            StepOutcome::Pass => format!("{} step completed", capitalize(step.kind())),
            StepOutcome::Fail(reason) => reason,
            StepOutcome::Error(reason) => format!("Error: {reason}"),
        };

        match status {
            StepStatus::Pass => {
                debug!(step_number, step_type = step.kind(), duration_ms, "step passed")
            }
            _ => warn!(
                step_number,
                step_type = step.kind(),
                %status,
                %message,
                "step did not pass"
            ),
        }

        StepResult {
            step_number,
            step_type: step.kind().to_string(),
            status,
            message,
            details: step.to_details(),
            duration_ms,
        }
    }

    /// Run `step` without timing or recording it.
    pub fn run_step(&mut self, step: &Step) -> StepOutcome {
        match self.apply(step) {
            Ok(outcome) => outcome,
            Err(e) => StepOutcome::Error(e.to_string()),
        }
    }

    fn apply(&mut self, step: &Step) -> Result<StepOutcome, StepError> {
        match step {
            Step::Write { register, value } => {
                if register == STATE_REGISTER {
                    return Err(StepError::ReadOnlyState);
                }
                self.device.write_register(register, value.clone())?;
                Ok(StepOutcome::Pass)
            }
            Step::Command { action, fault_type } => {
                match action.as_str() {
                    "activate" => self.device.activate()?,
                    "reset" => self.device.reset()?,
                    "inject_fault" => {
                        let fault_type = fault_type
                            .as_deref()
                            .unwrap_or(self.config.default_fault_type.as_str());
                        self.device.inject_fault(fault_type)?
                    }
                    other => {
                        return Err(StepError::UnknownAction {
                            action: other.to_string(),
                        })
                    }
                }
                Ok(StepOutcome::Pass)
            }
            Step::Wait { ms } => {
                thread::sleep(Duration::from_millis(*ms));
                Ok(StepOutcome::Pass)
            }
            Step::Assert(assert) => self.check(assert),
        }
    }

    fn check(&self, assert: &AssertStep) -> Result<StepOutcome, StepError> {
        let actual = self.read(&assert.register)?;
        let Some(condition) = assert.condition() else {
            // no operator: nothing to check
            return Ok(StepOutcome::Pass);
        };

        if assertion::evaluate(&assert.register, &actual, &condition)? {
            debug!(register = %assert.register, operator = condition.name(), "assertion passed");
            Ok(StepOutcome::Pass)
        } else {
            Ok(StepOutcome::Fail(format!(
                "Assertion failed: {} = {}, expected {}",
                assert.register,
                actual,
                assertion::expectation(&condition)
            )))
        }
    }

    fn read(&self, register: &str) -> Result<Scalar, StepError> {
        if register == STATE_REGISTER {
            return Ok(Scalar::from(self.device.state().as_str()));
        }
        Ok(self.device.get_register(register)?.into())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

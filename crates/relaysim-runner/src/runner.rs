use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use relaysim_ir::Scenario;
use relaysim_model::{DeviceSimulator, DeviceState};
use tracing::{error, info, info_span, warn};

use crate::config::RunnerConfig;
use crate::interpreter::StepInterpreter;
use crate::result::{ResultError, RunStatus, ScenarioResult};

/// Drives scenarios against one owned device.
pub struct TestRunner {
    device: DeviceSimulator,
    config: RunnerConfig,
}

impl TestRunner {
    pub fn new(device: DeviceSimulator) -> Self {
        Self::with_config(device, RunnerConfig::default())
    }

    pub fn with_config(device: DeviceSimulator, config: RunnerConfig) -> Self {
        Self { device, config }
    }

    pub fn device(&self) -> &DeviceSimulator {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut DeviceSimulator {
        &mut self.device
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn into_device(self) -> DeviceSimulator {
        self.device
    }

    /// Execute every step of `scenario` in order, stopping at the first
    /// step that does not pass.
    ///
    /// The returned result is always finalized: `passed` when every step
    /// passed, `failed` at the first fail/error step, `error` if execution
    /// itself broke down.
    pub fn run_scenario(&mut self, scenario: &Scenario) -> ScenarioResult {
        let mut result = ScenarioResult::new(&scenario.name, &scenario.description);
        let span = info_span!("scenario", run_id = %result.run_id(), name = %scenario.name);
        let _guard = span.enter();
        info!(steps = scenario.steps.len(), "starting scenario");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            execute_steps(&mut self.device, &self.config, scenario, &mut result)
        }));

        let (status, message) = classify(outcome);

        if let Err(e) = result.finalize(status, message) {
            error!(error = %e, "could not finalize scenario result");
        }
        result
    }

    /// Run `scenarios` in order on the shared device. The device is reset
    /// to IDLE after each one; a failing reset is only logged.
    pub fn run_batch(&mut self, scenarios: &[Scenario]) -> Vec<ScenarioResult> {
        let mut results = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            results.push(self.run_scenario(scenario));

            if self.config.reset_between_scenarios && self.device.state() != DeviceState::Idle {
                if let Err(e) = self.device.reset() {
                    warn!(error = %e, "failed to reset device between scenarios");
                }
            }
        }
        results
    }
}

/// `Ok(None)` when every step passed, `Ok(Some(message))` at the first
/// step that did not.
fn execute_steps(
    device: &mut DeviceSimulator,
    config: &RunnerConfig,
    scenario: &Scenario,
    result: &mut ScenarioResult,
) -> Result<Option<String>, ResultError> {
    let mut interpreter = StepInterpreter::new(device, config);
    for (index, step) in scenario.steps.iter().enumerate() {
        let step_result = interpreter.execute(index + 1, step);
        let failure = (!step_result.passed()).then(|| step_result.message.clone());
        result.add_step_result(step_result)?;

        if let Some(message) = failure {
            error!(step_number = index + 1, %message, "scenario failed");
            return Ok(Some(message));
        }
    }
    Ok(None)
}

/// Final status and message for a scenario, given how step execution ended.
fn classify(
    outcome: thread::Result<Result<Option<String>, ResultError>>,
) -> (RunStatus, Option<String>) {
    match outcome {
        Ok(Ok(None)) => {
            info!("scenario passed");
            (RunStatus::Passed, None)
        }
        Ok(Ok(Some(message))) => (RunStatus::Failed, Some(message)),
        Ok(Err(e)) => {
            error!(error = %e, "scenario aborted");
            (RunStatus::Error, Some(format!("Unexpected error: {e}")))
        }
        Err(payload) => {
            let detail = panic_detail(payload.as_ref());
            error!(%detail, "scenario aborted");
            (RunStatus::Error, Some(format!("Unexpected error: {detail}")))
        }
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during scenario execution".to_string()
    }
}

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Outcome class of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Step completed and any assertion held.
    Pass,
    /// Assertion mismatch.
    Fail,
    /// Malformed step or simulator defect.
    Error,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pass => "pass",
            StepStatus::Fail => "fail",
            StepStatus::Error => "error",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a scenario run: `Running` until finalized, then terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Passed,
    Failed,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Passed => "passed",
            RunStatus::Failed => "failed",
            RunStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResultError {
    #[error("Scenario run '{run_id}' is already finalized as {status}")]
    AlreadyFinalized { run_id: String, status: RunStatus },

    #[error("Cannot finalize a run with non-terminal status '{status}'")]
    NonTerminalStatus { status: RunStatus },
}

/// Result of one executed step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// 1-based position in the scenario.
    pub step_number: usize,
    pub step_type: String,
    pub status: StepStatus,
    pub message: String,
    /// The originating step, echoed verbatim.
    pub details: serde_json::Value,
    pub duration_ms: f64,
}

impl StepResult {
    pub fn passed(&self) -> bool {
        self.status == StepStatus::Pass
    }

    pub fn snapshot(&self) -> StepReport {
        StepReport {
            step_number: self.step_number,
            step_type: self.step_type.clone(),
            status: self.status,
            message: self.message.clone(),
            details: self.details.clone(),
            duration_ms: round_to(self.duration_ms, 2),
        }
    }
}

/// Result of one scenario run.
///
/// Step results can only be appended while the run is `Running`, and
/// `finalize` moves it to a terminal status exactly once.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    run_id: String,
    scenario_name: String,
    description: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    step_results: Vec<StepResult>,
    overall_status: RunStatus,
    error_message: Option<String>,
}

impl ScenarioResult {
    pub fn new(scenario_name: impl Into<String>, description: impl Into<String>) -> Self {
        let scenario_name = scenario_name.into();
        let start_time = Utc::now();
        Self {
            run_id: generate_run_id(&scenario_name, start_time),
            scenario_name,
            description: description.into(),
            start_time,
            end_time: None,
            step_results: Vec::new(),
            overall_status: RunStatus::Running,
            error_message: None,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn scenario_name(&self) -> &str {
        &self.scenario_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn step_results(&self) -> &[StepResult] {
        &self.step_results
    }

    pub fn overall_status(&self) -> RunStatus {
        self.overall_status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_finalized(&self) -> bool {
        self.overall_status.is_terminal()
    }

    pub fn add_step_result(&mut self, result: StepResult) -> Result<(), ResultError> {
        self.ensure_running()?;
        self.step_results.push(result);
        Ok(())
    }

    pub fn finalize(
        &mut self,
        status: RunStatus,
        error_message: Option<String>,
    ) -> Result<(), ResultError> {
        self.ensure_running()?;
        if !status.is_terminal() {
            return Err(ResultError::NonTerminalStatus { status });
        }
        self.end_time = Some(Utc::now());
        self.overall_status = status;
        self.error_message = error_message;
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), ResultError> {
        if self.is_finalized() {
            return Err(ResultError::AlreadyFinalized {
                run_id: self.run_id.clone(),
                status: self.overall_status,
            });
        }
        Ok(())
    }

    /// Elapsed seconds; measured against now while still running.
    pub fn duration_seconds(&self) -> f64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time)
            .num_microseconds()
            .map(|us| us as f64 / 1_000_000.0)
            .unwrap_or(0.0)
    }

    pub fn total_steps(&self) -> usize {
        self.step_results.len()
    }

    pub fn passed_steps(&self) -> usize {
        self.step_results.iter().filter(|r| r.passed()).count()
    }

    /// Steps with status fail or error.
    pub fn failed_steps(&self) -> usize {
        self.step_results.iter().filter(|r| !r.passed()).count()
    }

    pub fn snapshot(&self) -> ScenarioReport {
        ScenarioReport {
            run_id: self.run_id.clone(),
            scenario_name: self.scenario_name.clone(),
            description: self.description.clone(),
            start_time: epoch_seconds(self.start_time),
            start_datetime: local_iso(self.start_time),
            end_time: self.end_time.map(epoch_seconds),
            end_datetime: self.end_time.map(local_iso),
            duration_seconds: round_to(self.duration_seconds(), 3),
            overall_status: self.overall_status,
            error_message: self.error_message.clone(),
            total_steps: self.total_steps(),
            passed_steps: self.passed_steps(),
            failed_steps: self.failed_steps(),
            step_results: self.step_results.iter().map(StepResult::snapshot).collect(),
        }
    }
}

/// Serializable view of a [`StepResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step_number: usize,
    pub step_type: String,
    pub status: StepStatus,
    pub message: String,
    pub details: serde_json::Value,
    pub duration_ms: f64,
}

/// Serializable view of a [`ScenarioResult`], consumed by report and API
/// layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub run_id: String,
    pub scenario_name: String,
    pub description: String,
    pub start_time: f64,
    pub start_datetime: String,
    pub end_time: Option<f64>,
    pub end_datetime: Option<String>,
    pub duration_seconds: f64,
    pub overall_status: RunStatus,
    pub error_message: Option<String>,
    pub total_steps: usize,
    pub passed_steps: usize,
    pub failed_steps: usize,
    pub step_results: Vec<StepReport>,
}

fn generate_run_id(scenario_name: &str, at: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}",
        scenario_name.replace(char::is_whitespace, "_"),
        at.with_timezone(&Local).format("%Y%m%d_%H%M%S"),
        &suffix[..8]
    )
}

fn epoch_seconds(t: DateTime<Utc>) -> f64 {
    t.timestamp_micros() as f64 / 1_000_000.0
}

fn local_iso(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).to_rfc3339()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

//! JSON and plain-text reports for finished scenario runs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use relaysim_runner::{RunStatus, ScenarioResult, StepStatus};
use serde_json::Value;
use tracing::info;

pub const REPORT_VERSION: &str = "1.0";

const RULE_WIDTH: usize = 70;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to write report {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// The result snapshot plus report metadata.
pub fn json_report(result: &ScenarioResult) -> Result<Value, ReportError> {
    let mut report = serde_json::to_value(result.snapshot())?;
    if let Value::Object(map) = &mut report {
        map.insert(
            "report_generated_at".to_string(),
            Value::String(Local::now().to_rfc3339()),
        );
        map.insert(
            "report_version".to_string(),
            Value::String(REPORT_VERSION.to_string()),
        );
    }
    Ok(report)
}

/// Write `<scenario>_<timestamp>.json` into `dir` and return its path.
pub fn write_json_report(dir: &Path, result: &ScenarioResult) -> Result<PathBuf, ReportError> {
    let report = json_report(result)?;
    let path = dir.join(report_file_name(result, "json"));
    write_file(&path, &serde_json::to_string_pretty(&report)?)?;
    info!(path = %path.display(), "JSON report generated");
    Ok(path)
}

/// Write the text summary as `<scenario>_<timestamp>.txt`.
pub fn write_text_report(dir: &Path, result: &ScenarioResult) -> Result<PathBuf, ReportError> {
    let path = dir.join(report_file_name(result, "txt"));
    write_file(&path, &text_summary(result))?;
    info!(path = %path.display(), "text report generated");
    Ok(path)
}

pub fn text_summary(result: &ScenarioResult) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut lines = vec![heavy.clone(), format!("SCENARIO: {}", result.scenario_name())];
    if !result.description().is_empty() {
        lines.push(format!("Description: {}", result.description()));
    }
    lines.push(heavy.clone());
    lines.push(String::new());

    lines.push(format!("Status: {}", status_label(result.overall_status())));
    lines.push(format!("Duration: {:.3}s", result.duration_seconds()));
    let started: DateTime<Local> = result.start_time().into();
    lines.push(format!("Started: {}", started.format("%Y-%m-%d %H:%M:%S")));

    lines.push(String::new());
    lines.push(format!(
        "Steps: {}/{} passed",
        result.passed_steps(),
        result.total_steps()
    ));
    if result.failed_steps() > 0 {
        lines.push(format!("Failed: {}", result.failed_steps()));
    }
    if let Some(message) = result.error_message() {
        lines.push(String::new());
        lines.push(format!("Error: {message}"));
    }

    lines.push(String::new());
    lines.push(light.clone());
    lines.push("STEP DETAILS:".to_string());
    lines.push(light);
    for step in result.step_results() {
        let icon = if step.status == StepStatus::Pass { "✓" } else { "✗" };
        lines.push(format!(
            "  [{icon}] Step {}: {} ({:.1}ms)",
            step.step_number, step.step_type, step.duration_ms
        ));
        if step.status != StepStatus::Pass && !step.message.is_empty() {
            lines.push(format!("      Message: {}", step.message));
        }
    }

    lines.push(String::new());
    lines.push(heavy);
    lines.join("\n")
}

pub fn batch_summary(results: &[ScenarioResult]) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let count = |status: RunStatus| {
        results
            .iter()
            .filter(|r| r.overall_status() == status)
            .count()
    };

    let mut lines = vec![
        heavy.clone(),
        "BATCH TEST SUMMARY".to_string(),
        heavy.clone(),
        String::new(),
        format!("Total scenarios: {}", results.len()),
        format!("Passed: {}", count(RunStatus::Passed)),
        format!("Failed: {}", count(RunStatus::Failed)),
        format!("Errors: {}", count(RunStatus::Error)),
        String::new(),
        "-".repeat(RULE_WIDTH),
    ];
    for result in results {
        let symbol = match result.overall_status() {
            RunStatus::Passed => "✓",
            RunStatus::Failed => "✗",
            RunStatus::Error => "⚠",
            RunStatus::Running => "?",
        };
        lines.push(format!(
            "  [{symbol}] {} ({:.3}s, {}/{} steps)",
            result.scenario_name(),
            result.duration_seconds(),
            result.passed_steps(),
            result.total_steps()
        ));
    }
    lines.push(String::new());
    lines.push(heavy);
    lines.join("\n")
}

fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Passed => "✓ PASSED",
        RunStatus::Failed => "✗ FAILED",
        RunStatus::Error => "⚠ ERROR",
        RunStatus::Running => "⋯ RUNNING",
    }
}

fn report_file_name(result: &ScenarioResult, extension: &str) -> String {
    let name: String = result
        .scenario_name()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!(
        "{name}_{}.{extension}",
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

fn write_file(path: &Path, contents: &str) -> Result<(), ReportError> {
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, contents).map_err(io_err)
}

//! Harness configuration.
//!
//! Loaded from an optional TOML file; every field falls back to its
//! default when absent. CLI flags override individual values afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use relaysim_loader::ScenarioCatalog;
use relaysim_model::{DeviceSimulator, TimingConfig};
use relaysim_runner::{RunnerConfig, TestRunner};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory searched by scenario name.
    pub scenarios_dir: PathBuf,
    /// Output directory for saved reports.
    pub reports_dir: PathBuf,
    pub timing: TimingConfig,
    pub runner: RunnerConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            scenarios_dir: PathBuf::from("config/scenarios"),
            reports_dir: PathBuf::from("reports"),
            timing: TimingConfig::default(),
            runner: RunnerConfig::default(),
        }
    }
}

impl HarnessConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn catalog(&self) -> ScenarioCatalog {
        ScenarioCatalog::new(&self.scenarios_dir)
    }

    /// A fresh simulator with the configured timing.
    pub fn device(&self) -> DeviceSimulator {
        DeviceSimulator::with_timing(self.timing.clone())
    }

    /// A runner around a fresh simulator.
    pub fn runner(&self) -> TestRunner {
        TestRunner::with_config(self.device(), self.runner.clone())
    }
}

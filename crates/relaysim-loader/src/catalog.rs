use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use relaysim_ir::{parse_scenario, Format, ParseError, Scenario};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::validate::{validate_scenario, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Invalid scenario name '{name}': must be a file name inside the scenarios directory")]
    InvalidName { name: String },

    #[error("Scenario file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Invalid scenario {}: {}", .path.display(), join_errors(.errors))]
    Invalid {
        path: PathBuf,
        errors: Vec<ValidationError>,
    },
}

fn is_bare_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Listing entry for one scenario file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioInfo {
    pub name: String,
    pub description: String,
    pub filename: String,
}

/// A directory of scenario documents, addressed by name.
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    dir: PathBuf,
}

impl ScenarioCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve `name` as given, then with each supported extension.
    ///
    /// `name` must be a bare file name; separators, `..` and absolute paths
    /// are rejected so lookups stay inside the catalogue directory.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, LoadError> {
        if !is_bare_name(name) {
            return Err(LoadError::InvalidName {
                name: name.to_string(),
            });
        }
        let exact = self.dir.join(name);
        if exact.is_file() {
            return Ok(exact);
        }
        Format::EXTENSIONS
            .iter()
            .map(|ext| self.dir.join(format!("{name}.{ext}")))
            .find(|p| p.is_file())
            .ok_or(LoadError::NotFound { path: exact })
    }

    pub fn load(&self, name: &str) -> Result<Scenario, LoadError> {
        let path = self.resolve(name)?;
        load_file(&path)
    }

    /// Every valid scenario in the directory, sorted by filename. Files that
    /// fail to load are logged and skipped.
    pub fn list(&self) -> Vec<ScenarioInfo> {
        if !self.dir.is_dir() {
            warn!(dir = %self.dir.display(), "scenarios directory does not exist");
            return Vec::new();
        }
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!(dir = %self.dir.display(), error = %e, "cannot read scenarios directory");
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && Format::from_path(p).is_ok())
            .collect();
        paths.sort();

        paths
            .into_iter()
            .filter_map(|path| match load_file(&path) {
                Ok(scenario) => Some(ScenarioInfo {
                    name: scenario.name,
                    description: scenario.description,
                    filename: file_name(&path),
                }),
                Err(e) => {
                    error!(error = %e, "failed to load scenario");
                    None
                }
            })
            .collect()
    }

    /// True when `path` loads and validates.
    pub fn validate_file(&self, path: impl AsRef<Path>) -> bool {
        match load_file(path.as_ref()) {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, "validation failed");
                false
            }
        }
    }
}

/// Read, parse and validate one scenario document.
pub fn load_file(path: &Path) -> Result<Scenario, LoadError> {
    if !path.is_file() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }
    debug!(path = %path.display(), "loading scenario");

    let parse_err = |source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let format = Format::from_path(path).map_err(parse_err)?;
    let source = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed");
    let scenario = parse_scenario(&source, format, stem).map_err(parse_err)?;

    validate_scenario(&scenario).map_err(|errors| LoadError::Invalid {
        path: path.to_path_buf(),
        errors,
    })?;

    info!(name = %scenario.name, steps = scenario.steps.len(), "loaded scenario");
    Ok(scenario)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

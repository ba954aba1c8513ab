use std::path::Path;

use serde::Deserialize;

use crate::types::{Scenario, Step};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported scenario format: '{extension}' (expected .json or .toml)")]
    UnsupportedFormat { extension: String },
}

/// On-disk encoding of a scenario document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    pub const EXTENSIONS: [&'static str; 2] = ["json", "toml"];

    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            "json" => Ok(Format::Json),
            "toml" => Ok(Format::Toml),
            _ => Err(ParseError::UnsupportedFormat { extension }),
        }
    }
}

/// Full document form. The legacy form is a bare JSON array of steps.
#[derive(Deserialize)]
struct ScenarioDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    steps: Vec<Step>,
}

impl ScenarioDocument {
    fn from_steps(steps: Vec<Step>) -> Self {
        Self {
            name: None,
            description: String::new(),
            steps,
        }
    }

    fn into_scenario(self, fallback_name: &str) -> Scenario {
        Scenario {
            name: self.name.unwrap_or_else(|| fallback_name.to_string()),
            description: self.description,
            steps: self.steps,
        }
    }
}

/// Parse a scenario document. `fallback_name` names scenarios that do not
/// carry a `name` field (usually the file stem).
pub fn parse_scenario(
    source: &str,
    format: Format,
    fallback_name: &str,
) -> Result<Scenario, ParseError> {
    let document = match format {
        Format::Json => {
            let value: serde_json::Value = serde_json::from_str(source)?;
            if value.is_array() {
                ScenarioDocument::from_steps(serde_json::from_value(value)?)
            } else {
                serde_json::from_value(value)?
            }
        }
        Format::Toml => toml::from_str(source)?,
    };
    Ok(document.into_scenario(fallback_name))
}

pub fn parse_scenario_json(json: &str) -> Result<Scenario, ParseError> {
    parse_scenario(json, Format::Json, "unnamed")
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named, ordered list of steps executed as one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            steps,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// ── Scalars ──────────────────────────────────────────────────────────

/// A scalar literal as it appears in a scenario document.
///
/// Variant order matters for untagged deserialization: integers are tried
/// before floats so `120` stays an `Int` and `120.0` becomes a `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// Short type name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::String(_) => "str",
        }
    }

    /// Numeric view of the scalar. Booleans are not numbers here.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::Float(_))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(true) => f.write_str("True"),
            Scalar::Bool(false) => f.write_str("False"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => write_float(f, *x),
            Scalar::String(s) => write!(f, "{s}"),
        }
    }
}

/// Shortest round-trip form with a trailing ".0" on whole values and a signed,
/// two-digit exponent (`1e+20`, `1.5e-07`).
fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    let repr = format!("{x:?}");
    match repr.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            write!(f, "{mantissa}e{sign}{digits:0>2}")
        }
        None => f.write_str(&repr),
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::String(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::String(v)
    }
}

// ── Steps ────────────────────────────────────────────────────────────

/// One unit of scenario execution, discriminated by the `step` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Write {
        register: String,
        value: Scalar,
    },
    Command {
        action: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fault_type: Option<String>,
    },
    Wait {
        ms: u64,
    },
    Assert(AssertStep),
}

impl Step {
    pub fn write(register: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Step::Write {
            register: register.into(),
            value: value.into(),
        }
    }

    pub fn command(action: impl Into<String>) -> Self {
        Step::Command {
            action: action.into(),
            fault_type: None,
        }
    }

    pub fn inject_fault(fault_type: impl Into<String>) -> Self {
        Step::Command {
            action: "inject_fault".to_string(),
            fault_type: Some(fault_type.into()),
        }
    }

    pub fn wait(ms: u64) -> Self {
        Step::Wait { ms }
    }

    /// The discriminator value (`write`, `command`, `wait`, `assert`).
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Write { .. } => "write",
            Step::Command { .. } => "command",
            Step::Wait { .. } => "wait",
            Step::Assert(_) => "assert",
        }
    }

    /// The step re-serialized from its typed form, for result details.
    /// Keys the step type does not know are not carried over.
    pub fn to_details(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl From<AssertStep> for Step {
    fn from(a: AssertStep) -> Self {
        Step::Assert(a)
    }
}

/// Inclusive bounds for an `in_range` assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Scalar,
    pub max: Scalar,
}

/// Assertion against a register (or the virtual `state` register).
///
/// Operators are separate optional fields, mirroring the document format.
/// Well-formed documents set exactly one of them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssertStep {
    pub register: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_equals: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greater_than: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub less_than: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greater_or_equal: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub less_or_equal: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_range: Option<Bounds>,
}

/// The operator of an assertion, resolved from the optional fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(Scalar),
    NotEquals(Scalar),
    GreaterThan(Scalar),
    LessThan(Scalar),
    GreaterOrEqual(Scalar),
    LessOrEqual(Scalar),
    Contains(Scalar),
    InRange { min: Scalar, max: Scalar },
}

impl Condition {
    /// Field name of this operator in the document format.
    pub fn name(&self) -> &'static str {
        match self {
            Condition::Equals(_) => "equals",
            Condition::NotEquals(_) => "not_equals",
            Condition::GreaterThan(_) => "greater_than",
            Condition::LessThan(_) => "less_than",
            Condition::GreaterOrEqual(_) => "greater_or_equal",
            Condition::LessOrEqual(_) => "less_or_equal",
            Condition::Contains(_) => "contains",
            Condition::InRange { .. } => "in_range",
        }
    }
}

impl AssertStep {
    pub fn on(register: impl Into<String>) -> Self {
        Self {
            register: register.into(),
            ..Default::default()
        }
    }

    pub fn equals(mut self, v: impl Into<Scalar>) -> Self {
        self.equals = Some(v.into());
        self
    }

    pub fn not_equals(mut self, v: impl Into<Scalar>) -> Self {
        self.not_equals = Some(v.into());
        self
    }

    pub fn greater_than(mut self, v: impl Into<Scalar>) -> Self {
        self.greater_than = Some(v.into());
        self
    }

    pub fn less_than(mut self, v: impl Into<Scalar>) -> Self {
        self.less_than = Some(v.into());
        self
    }

    pub fn greater_or_equal(mut self, v: impl Into<Scalar>) -> Self {
        self.greater_or_equal = Some(v.into());
        self
    }

    pub fn less_or_equal(mut self, v: impl Into<Scalar>) -> Self {
        self.less_or_equal = Some(v.into());
        self
    }

    pub fn contains(mut self, v: impl Into<Scalar>) -> Self {
        self.contains = Some(v.into());
        self
    }

    pub fn in_range(mut self, min: impl Into<Scalar>, max: impl Into<Scalar>) -> Self {
        self.in_range = Some(Bounds {
            min: min.into(),
            max: max.into(),
        });
        self
    }

    /// The operator to evaluate. When several are set, the first in
    /// declaration order wins; `None` when no operator field is present.
    pub fn condition(&self) -> Option<Condition> {
        if let Some(v) = &self.equals {
            return Some(Condition::Equals(v.clone()));
        }
        if let Some(v) = &self.not_equals {
            return Some(Condition::NotEquals(v.clone()));
        }
        if let Some(v) = &self.greater_than {
            return Some(Condition::GreaterThan(v.clone()));
        }
        if let Some(v) = &self.less_than {
            return Some(Condition::LessThan(v.clone()));
        }
        if let Some(v) = &self.greater_or_equal {
            return Some(Condition::GreaterOrEqual(v.clone()));
        }
        if let Some(v) = &self.less_or_equal {
            return Some(Condition::LessOrEqual(v.clone()));
        }
        if let Some(v) = &self.contains {
            return Some(Condition::Contains(v.clone()));
        }
        self.in_range.as_ref().map(|r| Condition::InRange {
            min: r.min.clone(),
            max: r.max.clone(),
        })
    }
}

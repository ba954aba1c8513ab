use std::collections::BTreeMap;
use std::fmt;

use relaysim_ir::Scalar;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegisterError {
    #[error("Register '{name}' does not exist")]
    Unknown { name: String },

    #[error("Invalid value type for register '{name}'. Expected {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: RegisterType,
        actual: String,
    },
}

/// Declared type of a register, fixed when the directory is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterType {
    Float,
    Int,
    Bool,
}

impl fmt::Display for RegisterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegisterType::Float => "float",
            RegisterType::Int => "int",
            RegisterType::Bool => "bool",
        })
    }
}

/// A register value tagged with its runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegisterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl RegisterValue {
    pub fn register_type(&self) -> RegisterType {
        match self {
            RegisterValue::Float(_) => RegisterType::Float,
            RegisterValue::Int(_) => RegisterType::Int,
            RegisterValue::Bool(_) => RegisterType::Bool,
        }
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Scalar::from(*self), f)
    }
}

impl From<RegisterValue> for Scalar {
    fn from(v: RegisterValue) -> Self {
        match v {
            RegisterValue::Float(x) => Scalar::Float(x),
            RegisterValue::Int(i) => Scalar::Int(i),
            RegisterValue::Bool(b) => Scalar::Bool(b),
        }
    }
}

/// The fixed register directory of the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegisterId {
    Voltage,
    Current,
    Frequency,
    TripFlag,
    TripCount,
    Temperature,
    StatusWord,
}

impl RegisterId {
    pub const ALL: [RegisterId; 7] = [
        RegisterId::Voltage,
        RegisterId::Current,
        RegisterId::Frequency,
        RegisterId::TripFlag,
        RegisterId::TripCount,
        RegisterId::Temperature,
        RegisterId::StatusWord,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RegisterId::Voltage => "voltage",
            RegisterId::Current => "current",
            RegisterId::Frequency => "frequency",
            RegisterId::TripFlag => "trip_flag",
            RegisterId::TripCount => "trip_count",
            RegisterId::Temperature => "temperature",
            RegisterId::StatusWord => "status_word",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.name() == name)
    }

    pub fn declared_type(&self) -> RegisterType {
        self.default_value().register_type()
    }

    /// Power-on value.
    pub fn default_value(&self) -> RegisterValue {
        match self {
            RegisterId::Voltage => RegisterValue::Float(0.0),
            RegisterId::Current => RegisterValue::Float(0.0),
            RegisterId::Frequency => RegisterValue::Float(60.0),
            RegisterId::TripFlag => RegisterValue::Bool(false),
            RegisterId::TripCount => RegisterValue::Int(0),
            RegisterId::Temperature => RegisterValue::Float(25.0),
            RegisterId::StatusWord => RegisterValue::Int(0x0000),
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Typed register storage. The name set is the `RegisterId` enum, so it
/// can neither grow nor shrink, and every slot always holds a value of its
/// declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterBank {
    values: [RegisterValue; 7],
}

impl RegisterBank {
    pub fn new() -> Self {
        Self {
            values: RegisterId::ALL.map(|id| id.default_value()),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        RegisterId::ALL.iter().map(|id| id.name())
    }

    fn resolve(name: &str) -> Result<RegisterId, RegisterError> {
        RegisterId::from_name(name).ok_or_else(|| RegisterError::Unknown {
            name: name.to_string(),
        })
    }

    pub fn get(&self, name: &str) -> Result<RegisterValue, RegisterError> {
        Ok(self.read(Self::resolve(name)?))
    }

    pub fn read(&self, id: RegisterId) -> RegisterValue {
        self.values[id.index()]
    }

    /// Coerce `value` to the register's declared type and store it.
    /// Returns the (old, new) pair on success; nothing changes on failure.
    pub fn write(
        &mut self,
        name: &str,
        value: &Scalar,
    ) -> Result<(RegisterValue, RegisterValue), RegisterError> {
        let id = Self::resolve(name)?;
        let coerced =
            coerce(id.declared_type(), value).ok_or_else(|| RegisterError::TypeMismatch {
                name: name.to_string(),
                expected: id.declared_type(),
                actual: value.kind().to_string(),
            })?;
        let old = std::mem::replace(&mut self.values[id.index()], coerced);
        Ok((old, coerced))
    }

    pub(crate) fn set_float(&mut self, id: RegisterId, value: f64) {
        debug_assert_eq!(id.declared_type(), RegisterType::Float);
        self.values[id.index()] = RegisterValue::Float(value);
    }

    pub(crate) fn set_bool(&mut self, id: RegisterId, value: bool) {
        debug_assert_eq!(id.declared_type(), RegisterType::Bool);
        self.values[id.index()] = RegisterValue::Bool(value);
    }

    pub(crate) fn int(&self, id: RegisterId) -> i64 {
        match self.read(id) {
            RegisterValue::Int(i) => i,
            other => unreachable!("register {} holds {other:?}", id.name()),
        }
    }

    pub(crate) fn update_int(&mut self, id: RegisterId, f: impl FnOnce(i64) -> i64) {
        let next = f(self.int(id));
        self.values[id.index()] = RegisterValue::Int(next);
    }

    /// Immutable copy of every register, keyed by name.
    pub fn snapshot(&self) -> BTreeMap<String, RegisterValue> {
        RegisterId::ALL
            .iter()
            .map(|id| (id.name().to_string(), self.read(*id)))
            .collect()
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a document scalar to the declared register type.
///
/// float <- int, numeric string; int <- integral float, decimal or `0x` hex
/// string; bool <- "true"/"false" (any case), 0 or 1.
pub fn coerce(declared: RegisterType, value: &Scalar) -> Option<RegisterValue> {
    match (declared, value) {
        (RegisterType::Float, Scalar::Float(x)) => Some(RegisterValue::Float(*x)),
        (RegisterType::Float, Scalar::Int(i)) => Some(RegisterValue::Float(*i as f64)),
        (RegisterType::Float, Scalar::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|x| x.is_finite())
            .map(RegisterValue::Float),

        (RegisterType::Int, Scalar::Int(i)) => Some(RegisterValue::Int(*i)),
        (RegisterType::Int, Scalar::Float(x))
            if x.is_finite() && x.fract() == 0.0 && x.abs() < i64::MAX as f64 =>
        {
            Some(RegisterValue::Int(*x as i64))
        }
        (RegisterType::Int, Scalar::String(s)) => parse_int(s.trim()).map(RegisterValue::Int),

        (RegisterType::Bool, Scalar::Bool(b)) => Some(RegisterValue::Bool(*b)),
        (RegisterType::Bool, Scalar::Int(0)) => Some(RegisterValue::Bool(false)),
        (RegisterType::Bool, Scalar::Int(1)) => Some(RegisterValue::Bool(true)),
        (RegisterType::Bool, Scalar::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(RegisterValue::Bool(true)),
            "false" => Some(RegisterValue::Bool(false)),
            _ => None,
        },

        _ => None,
    }
}

fn parse_int(s: &str) -> Option<i64> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => s.parse::<i64>().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_scalar_form() {
        assert_eq!(RegisterValue::Bool(false).to_string(), "False");
        assert_eq!(RegisterValue::Float(60.0).to_string(), "60.0");
        assert_eq!(RegisterValue::Float(1e20).to_string(), "1e+20");
        assert_eq!(RegisterValue::Int(129).to_string(), "129");
    }

    #[test]
    fn coerce_numeric_string_to_float() {
        assert_eq!(
            coerce(RegisterType::Float, &Scalar::from("  230.5 ")),
            Some(RegisterValue::Float(230.5))
        );
        assert_eq!(coerce(RegisterType::Float, &Scalar::from("hot")), None);
        assert_eq!(coerce(RegisterType::Float, &Scalar::from("nan")), None);
    }

    #[test]
    fn coerce_int_accepts_hex_and_integral_float() {
        assert_eq!(
            coerce(RegisterType::Int, &Scalar::from("0x0081")),
            Some(RegisterValue::Int(0x81))
        );
        assert_eq!(
            coerce(RegisterType::Int, &Scalar::Float(4.0)),
            Some(RegisterValue::Int(4))
        );
        assert_eq!(coerce(RegisterType::Int, &Scalar::Float(4.5)), None);
        assert_eq!(coerce(RegisterType::Int, &Scalar::Bool(true)), None);
    }

    #[test]
    fn coerce_bool_is_strict() {
        assert_eq!(
            coerce(RegisterType::Bool, &Scalar::from("TRUE")),
            Some(RegisterValue::Bool(true))
        );
        assert_eq!(
            coerce(RegisterType::Bool, &Scalar::Int(0)),
            Some(RegisterValue::Bool(false))
        );
        assert_eq!(coerce(RegisterType::Bool, &Scalar::Int(2)), None);
        assert_eq!(coerce(RegisterType::Bool, &Scalar::Float(1.0)), None);
    }

    #[test]
    fn declared_types_match_defaults() {
        assert_eq!(RegisterId::Voltage.declared_type(), RegisterType::Float);
        assert_eq!(RegisterId::TripFlag.declared_type(), RegisterType::Bool);
        assert_eq!(RegisterId::StatusWord.declared_type(), RegisterType::Int);
    }
}

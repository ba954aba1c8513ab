//! Assertion evaluation over scalar values.
//!
//! Numeric values compare by value regardless of int/float kind, and a bool
//! equals the integer 0 or 1. Ordering operators also accept two strings;
//! any other pairing is incomparable.
use std::cmp::Ordering;

use relaysim_ir::{Condition, Scalar};

use crate::interpreter::StepError;

/// Check `condition` against `actual`.
///
/// `Ok(true)` when the assertion holds, `Ok(false)` on a mismatch, and
/// `Err` when the operands cannot be compared at all.
pub fn evaluate(register: &str, actual: &Scalar, condition: &Condition) -> Result<bool, StepError> {
    let order = |operand: &Scalar| {
        compare(actual, operand).ok_or_else(|| StepError::Incomparable {
            register: register.to_string(),
            operator: condition.name(),
            actual: actual.kind(),
            operand: operand.kind(),
        })
    };

    let holds = match condition {
        Condition::Equals(v) => scalar_eq(actual, v),
        Condition::NotEquals(v) => !scalar_eq(actual, v),
        Condition::GreaterThan(v) => order(v)? == Ordering::Greater,
        Condition::LessThan(v) => order(v)? == Ordering::Less,
        Condition::GreaterOrEqual(v) => order(v)? != Ordering::Less,
        Condition::LessOrEqual(v) => order(v)? != Ordering::Greater,
        Condition::Contains(v) => actual.to_string().contains(&v.to_string()),
        Condition::InRange { min, max } => {
            order(min)? != Ordering::Less && order(max)? != Ordering::Greater
        }
    };
    Ok(holds)
}

/// Human-readable form of what the assertion expected.
pub fn expectation(condition: &Condition) -> String {
    match condition {
        Condition::Equals(v) => v.to_string(),
        Condition::NotEquals(v) => format!("not {v}"),
        Condition::GreaterThan(v) => format!("> {v}"),
        Condition::LessThan(v) => format!("< {v}"),
        Condition::GreaterOrEqual(v) => format!(">= {v}"),
        Condition::LessOrEqual(v) => format!("<= {v}"),
        Condition::Contains(v) => format!("to contain '{v}'"),
        Condition::InRange { min, max } => format!("in range [{min}, {max}]"),
    }
}

pub fn scalar_eq(a: &Scalar, b: &Scalar) -> bool {
    match (equality_view(a), equality_view(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn equality_view(s: &Scalar) -> Option<f64> {
    match s {
        Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        other => other.as_f64(),
    }
}

/// `None` when the pair has no ordering (mixed kinds, bools, NaN).
pub fn compare(a: &Scalar, b: &Scalar) -> Option<Ordering> {
    match (a, b) {
        (Scalar::String(x), Scalar::String(y)) => Some(x.cmp(y)),
        _ => {
            let (x, y) = (a.as_f64()?, b.as_f64()?);
            x.partial_cmp(&y)
        }
    }
}

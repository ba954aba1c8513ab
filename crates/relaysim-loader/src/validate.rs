use std::cmp::Ordering;

use relaysim_ir::{Scalar, Scenario, Step};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Step {index} ({step}) has an empty register name")]
    EmptyRegister { index: usize, step: &'static str },

    #[error("Step {index} (command) has an empty action")]
    EmptyAction { index: usize },

    #[error("Step {index} (assert on '{register}') must have at least one assertion operator")]
    MissingAssertOperator { index: usize, register: String },

    #[error("Step {index} (assert on '{register}') has in_range min ({min}) > max ({max})")]
    InvalidRange {
        index: usize,
        register: String,
        min: Scalar,
        max: Scalar,
    },
}

impl ValidationError {
    /// 0-based position of the offending step.
    pub fn index(&self) -> usize {
        match self {
            ValidationError::EmptyRegister { index, .. }
            | ValidationError::EmptyAction { index }
            | ValidationError::MissingAssertOperator { index, .. }
            | ValidationError::InvalidRange { index, .. } => *index,
        }
    }
}

/// Structural checks the step types cannot express. Collects every
/// problem instead of stopping at the first.
pub fn validate_scenario(scenario: &Scenario) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    for (index, step) in scenario.steps.iter().enumerate() {
        validate_step(index, step, &mut errors);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_step(index: usize, step: &Step, errors: &mut Vec<ValidationError>) {
    match step {
        Step::Write { register, .. } if register.is_empty() => {
            errors.push(ValidationError::EmptyRegister {
                index,
                step: step.kind(),
            });
        }
        Step::Command { action, .. } if action.is_empty() => {
            errors.push(ValidationError::EmptyAction { index });
        }
        Step::Assert(assert) => {
            if assert.register.is_empty() {
                errors.push(ValidationError::EmptyRegister {
                    index,
                    step: step.kind(),
                });
            }
            if assert.condition().is_none() {
                errors.push(ValidationError::MissingAssertOperator {
                    index,
                    register: assert.register.clone(),
                });
            }
            if let Some(range) = &assert.in_range {
                if numeric_order(&range.min, &range.max) == Some(Ordering::Greater) {
                    errors.push(ValidationError::InvalidRange {
                        index,
                        register: assert.register.clone(),
                        min: range.min.clone(),
                        max: range.max.clone(),
                    });
                }
            }
        }
        _ => {}
    }
}

fn numeric_order(a: &Scalar, b: &Scalar) -> Option<Ordering> {
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

pub mod parse;
pub mod types;

pub use parse::{parse_scenario, parse_scenario_json, Format, ParseError};
pub use types::{AssertStep, Bounds, Condition, Scalar, Scenario, Step};

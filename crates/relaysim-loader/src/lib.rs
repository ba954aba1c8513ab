pub mod catalog;
pub mod validate;

pub use catalog::{load_file, LoadError, ScenarioCatalog, ScenarioInfo};
pub use validate::{validate_scenario, ValidationError};

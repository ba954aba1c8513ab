pub mod assertion;
pub mod config;
pub mod interpreter;
pub mod result;
pub mod runner;

pub use config::RunnerConfig;
pub use interpreter::{StepError, StepInterpreter, StepOutcome};
pub use result::{RunStatus, ScenarioReport, ScenarioResult, StepReport, StepResult, StepStatus};
pub use runner::TestRunner;

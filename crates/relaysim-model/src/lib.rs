pub mod config;
pub mod device;
pub mod log;
pub mod register;
pub mod state;

pub use config::TimingConfig;
pub use device::{CommandError, DeviceSimulator, DeviceStatus};
pub use register::{RegisterBank, RegisterError, RegisterId, RegisterType, RegisterValue};
pub use state::{DeviceState, StateMachine, TransitionError};

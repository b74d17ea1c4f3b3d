mod config_error;
mod failure;
mod harness_error;

pub use config_error::ConfigError;
pub use failure::{Failure, FailureKind};
pub use harness_error::HarnessError;


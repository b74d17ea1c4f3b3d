use tokio::runtime::Handle;

use super::{Executor, Job};
use crate::errors::ConfigError;

/// Runs each job as a task on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is running inside.
    pub fn current() -> Result<Self, ConfigError> {
        Ok(Self::new(Handle::try_current()?))
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, job: Job) {
        self.handle.spawn(async move { job() });
    }
}

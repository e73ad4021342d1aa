// ABOUTME: Error types raised by capability executors and dependency graph analysis
// ABOUTME: Capability errors are clonable so the original cause survives into run results

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a capability while executing a step.
///
/// The engine treats every variant the same way (the step is marked
/// `execution-failed`); the variant is kept intact for diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CapabilityError {
    #[error("Capability failed: {0}")]
    Failed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Command exited with code {exit_code:?}: {stderr}")]
    CommandFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(String),
}

impl CapabilityError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl From<std::io::Error> for CapabilityError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<anyhow::Error> for CapabilityError {
    fn from(error: anyhow::Error) -> Self {
        Self::Failed(format!("{:#}", error))
    }
}

pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DependencyError {
    #[error("Circular dependency detected: {cycles:?}")]
    CircularDependency { cycles: Vec<Vec<String>> },

    #[error("Step '{step_id}' depends on unknown step '{missing}'")]
    DanglingDependency { step_id: String, missing: String },
}

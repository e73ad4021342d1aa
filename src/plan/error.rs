// ABOUTME: Error types for plan construction and plan document loading
// ABOUTME: Malformed plans report every structural violation at once

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error(
        "Malformed plan ({} violation(s)): {}",
        .violations.len(),
        join_violations(.violations)
    )]
    Malformed { violations: Vec<PlanViolation> },

    #[error("Failed to read plan file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanViolation {
    #[error("step at position {index} has an empty id")]
    EmptyId { index: usize },

    #[error("step '{step}' has an empty capability")]
    EmptyCapability { step: String },

    #[error("duplicate step id '{id}' at positions {first} and {duplicate}")]
    DuplicateId {
        id: String,
        first: usize,
        duplicate: usize,
    },
}

fn join_violations(violations: &[PlanViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl PlanError {
    /// The structural violations, empty for IO and decoding errors.
    pub fn violations(&self) -> &[PlanViolation] {
        match self {
            PlanError::Malformed { violations } => violations,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, PlanError>;

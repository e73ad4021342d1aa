// ABOUTME: Run result aggregate: per-step results, completed set and unresolved steps
// ABOUTME: Every step that did not complete is tagged with the reason it never finished

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::error::CapabilityError;
use crate::plan::Step;

/// Why a step did not complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum UnresolvedReason {
    DanglingDependency {
        missing: Vec<String>,
    },
    UnknownCapability {
        capability: String,
    },
    ExecutionFailed {
        error: CapabilityError,
    },
    UnsatisfiableDependencyCycle {
        blocked_on: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cycle: Option<Vec<String>>,
    },
    IterationLimitExceeded {
        limit: usize,
        blocked_on: Vec<String>,
    },
}

impl UnresolvedReason {
    pub fn code(&self) -> &'static str {
        match self {
            UnresolvedReason::DanglingDependency { .. } => "dangling-dependency",
            UnresolvedReason::UnknownCapability { .. } => "unknown-capability",
            UnresolvedReason::ExecutionFailed { .. } => "execution-failed",
            UnresolvedReason::UnsatisfiableDependencyCycle { .. } => {
                "unsatisfiable-dependency-cycle"
            }
            UnresolvedReason::IterationLimitExceeded { .. } => "iteration-limit-exceeded",
        }
    }

    pub fn is_execution_failure(&self) -> bool {
        matches!(self, UnresolvedReason::ExecutionFailed { .. })
    }
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnresolvedReason::DanglingDependency { missing } => {
                write!(f, "{}: missing {}", self.code(), missing.join(", "))
            }
            UnresolvedReason::UnknownCapability { capability } => {
                write!(f, "{}: '{}'", self.code(), capability)
            }
            UnresolvedReason::ExecutionFailed { error } => write!(f, "{}: {}", self.code(), error),
            UnresolvedReason::UnsatisfiableDependencyCycle { blocked_on, cycle } => {
                write!(f, "{}: blocked on {}", self.code(), blocked_on.join(", "))?;
                if let Some(cycle) = cycle {
                    write!(f, " (cycle: {})", cycle.join(" <-> "))?;
                }
                Ok(())
            }
            UnresolvedReason::IterationLimitExceeded { limit, .. } => {
                write!(f, "{}: limit {}", self.code(), limit)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedStep {
    pub step_id: String,
    pub step_name: String,
    pub capability: String,
    #[serde(flatten)]
    pub reason: UnresolvedReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    PartialSuccess,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_steps: usize,
    pub completed_steps: usize,
    pub unresolved_steps: usize,
    pub failed_steps: usize,
    pub blocked_steps: usize,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    pub status: RunStatus,
    pub results: IndexMap<String, Value>,
    pub completed: IndexSet<String>,
    pub unresolved: Vec<UnresolvedStep>,
    /// Steps in the order their capabilities were invoked.
    pub execution_order: Vec<String>,
    pub iterations: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub summary: RunSummary,
}

impl RunResult {
    pub fn new(plan_name: Option<String>, total_steps: usize) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            plan_name,
            status: RunStatus::Running,
            results: IndexMap::new(),
            completed: IndexSet::new(),
            unresolved: Vec::new(),
            execution_order: Vec::new(),
            iterations: 0,
            start_time: Utc::now(),
            end_time: None,
            duration: None,
            summary: RunSummary {
                total_steps,
                ..RunSummary::default()
            },
        }
    }

    pub fn record_invocation(&mut self, step_id: &str) {
        self.execution_order.push(step_id.to_string());
    }

    pub fn record_success(&mut self, step_id: &str, value: Value) {
        self.results.insert(step_id.to_string(), value);
        self.completed.insert(step_id.to_string());
    }

    pub fn record_unresolved(&mut self, step: &Step, reason: UnresolvedReason) {
        self.unresolved.push(UnresolvedStep {
            step_id: step.id.clone(),
            step_name: step.display_name().to_string(),
            capability: step.capability.clone(),
            reason,
        });
    }

    pub fn mark_completed(&mut self) {
        let now = Utc::now();
        self.end_time = Some(now);
        self.duration = Some((now - self.start_time).to_std().unwrap_or(Duration::ZERO));
        self.update_summary();
        self.update_status();
    }

    pub fn is_completed(&self, step_id: &str) -> bool {
        self.completed.contains(step_id)
    }

    pub fn result(&self, step_id: &str) -> Option<&Value> {
        self.results.get(step_id)
    }

    pub fn unresolved_step(&self, step_id: &str) -> Option<&UnresolvedStep> {
        self.unresolved.iter().find(|u| u.step_id == step_id)
    }

    pub fn reason_for(&self, step_id: &str) -> Option<&UnresolvedReason> {
        self.unresolved_step(step_id).map(|u| &u.reason)
    }

    /// Unresolved step ids carrying the given reason code, in resolution order.
    pub fn unresolved_with(&self, code: &str) -> Vec<&str> {
        self.unresolved
            .iter()
            .filter(|u| u.reason.code() == code)
            .map(|u| u.step_id.as_str())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn has_unresolved(&self) -> bool {
        !self.unresolved.is_empty()
    }

    fn update_status(&mut self) {
        self.status = match (self.completed.is_empty(), self.unresolved.is_empty()) {
            (_, true) => RunStatus::Success,
            (true, false) => RunStatus::Failed,
            (false, false) => RunStatus::PartialSuccess,
        };
    }

    fn update_summary(&mut self) {
        let completed = self.completed.len();
        let unresolved = self.unresolved.len();
        let failed = self
            .unresolved
            .iter()
            .filter(|u| u.reason.is_execution_failure())
            .count();
        let total = self.summary.total_steps.max(completed + unresolved);

        let success_rate = if total > 0 {
            (completed as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        self.summary = RunSummary {
            total_steps: total,
            completed_steps: completed,
            unresolved_steps: unresolved,
            failed_steps: failed,
            blocked_steps: unresolved - failed,
            success_rate,
        };
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Success => write!(f, "success"),
            RunStatus::PartialSuccess => write!(f, "partial_success"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

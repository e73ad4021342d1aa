// ABOUTME: Static plan analysis ahead of execution: dangling edges, cycles, unknown capabilities
// ABOUTME: Predicts the parallel batch layering for plans that can run to completion

use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

use super::definition::Plan;
use crate::engine::dependency::DependencyGraph;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisIssue {
    #[error("Step '{step}' depends on unknown step '{dependency}'")]
    DanglingDependency { step: String, dependency: String },

    #[error("Circular dependency between steps: {}", .steps.join(", "))]
    CircularDependency { steps: Vec<String> },

    #[error("Step '{step}' uses unregistered capability '{capability}'")]
    UnknownCapability { step: String, capability: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub errors: Vec<AnalysisIssue>,
    pub warnings: Vec<String>,
    /// Predicted execution batches; only present when nothing blocks the plan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batches: Option<Vec<Vec<String>>>,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PlanAnalyzer {
    capabilities: Option<HashSet<String>>,
}

impl PlanAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also report steps whose capability is not among `names`.
    pub fn with_capabilities<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn analyze(&self, plan: &Plan) -> AnalysisReport {
        let mut report = AnalysisReport::new();
        let graph = DependencyGraph::from_plan(plan);
        let mut blocked: HashSet<String> = HashSet::new();

        for edge in graph.dangling_edges() {
            blocked.insert(edge.step_id.clone());
            report.errors.push(AnalysisIssue::DanglingDependency {
                step: edge.step_id.clone(),
                dependency: edge.missing.clone(),
            });
        }

        for cycle in graph.cycles() {
            blocked.extend(cycle.iter().cloned());
            report
                .errors
                .push(AnalysisIssue::CircularDependency { steps: cycle });
        }

        if let Some(ref known) = self.capabilities {
            for step in plan.steps() {
                if !known.contains(&step.capability) {
                    blocked.insert(step.id.clone());
                    report.errors.push(AnalysisIssue::UnknownCapability {
                        step: step.id.clone(),
                        capability: step.capability.clone(),
                    });
                }
            }
        }

        self.check_doomed_steps(plan, &blocked, &mut report);

        if !plan.is_empty() && graph.get_root_steps().is_empty() {
            report
                .warnings
                .push("No root steps found - every step has dependencies".to_string());
        }

        report.is_valid = report.errors.is_empty();
        if report.is_valid {
            report.batches = graph.create_execution_plan().ok().map(|p| p.batches);
        }
        report
    }

    /// Warn about steps that are fine on their own but sit downstream of a
    /// step that can never complete.
    fn check_doomed_steps(&self, plan: &Plan, blocked: &HashSet<String>, report: &mut AnalysisReport) {
        let mut doomed: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = plan
            .step_ids()
            .filter(|id| blocked.contains(*id))
            .collect();

        while let Some(current) = queue.pop_front() {
            for dependent in plan.dependents_of(current) {
                let id = dependent.id.as_str();
                if blocked.contains(id) || !doomed.insert(id) {
                    continue;
                }
                report.warnings.push(format!(
                    "Step '{}' will never run: upstream step '{}' cannot complete",
                    id, current
                ));
                queue.push_back(id);
            }
        }
    }
}

impl Default for AnalysisReport {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            batches: None,
            is_valid: true,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

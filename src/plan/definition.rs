// ABOUTME: Plan construction with structural validation (ids, capabilities, uniqueness)
// ABOUTME: Satisfiability is left to the engine; only shape is checked here

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::document::PlanDocument;
use super::error::{PlanError, PlanViolation, Result};
use super::step::Step;

/// An unordered collection of steps, kept in input order. Input order is the
/// engine's scan order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    steps: Vec<Step>,
}

impl Plan {
    /// Build a plan, failing with every structural violation found.
    pub fn new(steps: Vec<Step>) -> Result<Self> {
        let violations = Self::check_structure(&steps);
        if !violations.is_empty() {
            return Err(PlanError::Malformed { violations });
        }

        let steps = steps.into_iter().map(normalize_step).collect();

        Ok(Self {
            name: None,
            description: None,
            steps,
        })
    }

    pub fn from_document(document: PlanDocument) -> Result<Self> {
        let mut plan = Self::new(document.steps)?;
        plan.name = document.name.filter(|n| !n.trim().is_empty());
        plan.description = document.description;
        Ok(plan)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn check_structure(steps: &[Step]) -> Vec<PlanViolation> {
        let mut violations = Vec::new();
        let mut first_seen: HashMap<&str, usize> = HashMap::new();

        for (index, step) in steps.iter().enumerate() {
            let id = step.id.trim();
            if id.is_empty() {
                violations.push(PlanViolation::EmptyId { index });
            }

            if step.capability.trim().is_empty() {
                violations.push(PlanViolation::EmptyCapability {
                    step: if id.is_empty() {
                        format!("#{}", index)
                    } else {
                        step.id.clone()
                    },
                });
            }

            if id.is_empty() {
                continue;
            }
            if let Some(&first) = first_seen.get(step.id.as_str()) {
                violations.push(PlanViolation::DuplicateId {
                    id: step.id.clone(),
                    first,
                    duplicate: index,
                });
            } else {
                first_seen.insert(step.id.as_str(), index);
            }
        }

        violations
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed plan")
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.steps.iter().any(|s| s.id == id)
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.id.as_str())
    }

    /// Steps that list `id` among their dependencies.
    pub fn dependents_of(&self, id: &str) -> Vec<&Step> {
        self.steps
            .iter()
            .filter(|s| s.dependencies.iter().any(|d| d == id))
            .collect()
    }

    pub fn to_document(&self) -> PlanDocument {
        PlanDocument {
            name: self.name.clone(),
            description: self.description.clone(),
            steps: self.steps.clone(),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Fill in the display name and collapse repeated dependency entries.
fn normalize_step(mut step: Step) -> Step {
    if step.name.trim().is_empty() {
        step.name = step.id.clone();
    }
    let mut seen = HashSet::new();
    step.dependencies.retain(|dep| seen.insert(dep.clone()));
    step
}

// ABOUTME: Step definition: one unit of plan work bound to a named capability
// ABOUTME: Accepts the `agent` and `depends_on` spellings used by plan producers

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Unique within a plan. Decodes to empty when missing so plan
    /// construction can report it alongside other violations.
    #[serde(default)]
    pub id: String,
    /// Label for logs and output; defaults to the id.
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "agent")]
    pub capability: String,
    /// Input handed to the capability.
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "depends_on")]
    pub dependencies: Vec<String>,
}

impl Step {
    pub fn new(id: impl Into<String>, capability: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            capability: capability.into(),
            description: String::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }
}

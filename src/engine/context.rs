// ABOUTME: Caller-owned execution context handed unchanged to every capability invocation
// ABOUTME: Carries an opaque JSON payload plus string variables and metadata

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Read-only value shared by all capability invocations of one run.
///
/// The engine only borrows the context and passes it through; it never
/// inspects or mutates any of its fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: Value) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    pub fn merge_variables(&mut self, variables: HashMap<String, String>) {
        self.variables.extend(variables);
    }

    pub fn variable(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    /// Variables whose key starts with `prefix`, with the prefix stripped.
    pub fn variables_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.variables.iter().filter_map(move |(key, value)| {
            key.strip_prefix(prefix)
                .filter(|stripped| !stripped.is_empty())
                .map(|stripped| (stripped, value.as_str()))
        })
    }

    pub fn add_metadata(&mut self, key: String, value: String) {
        self.metadata.insert(key, value);
    }

    pub fn get_metadata(&self, key: &str) -> Option<&String> {
        self.metadata.get(key)
    }
}

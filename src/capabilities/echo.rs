// ABOUTME: Built-in `echo` capability returning the step description and context variables
// ABOUTME: Useful for dry runs of a plan's dependency structure

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::engine::error::{CapabilityError, CapabilityResult};
use crate::engine::{Capability, ExecutionContext};

#[derive(Debug, Clone, Copy, Default)]
pub struct EchoCapability;

#[async_trait]
impl Capability for EchoCapability {
    async fn execute(
        &self,
        description: &str,
        context: &ExecutionContext,
    ) -> CapabilityResult<Value> {
        if description.trim().is_empty() {
            return Err(CapabilityError::invalid_input("nothing to echo"));
        }

        // Sorted so output is stable between runs.
        let variables: BTreeMap<&String, &String> = context.variables.iter().collect();
        Ok(json!({
            "description": description,
            "variables": variables,
        }))
    }
}

// ABOUTME: Capability trait and the caller-owned registry mapping names to executors
// ABOUTME: Re-registration replaces the executor (last write wins) and logs a warning

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::context::ExecutionContext;
use super::error::CapabilityResult;

/// An executor of step work: takes the step description and the run context
/// and produces a JSON result or fails.
#[async_trait]
pub trait Capability: Send + Sync {
    async fn execute(&self, description: &str, context: &ExecutionContext)
        -> CapabilityResult<Value>;
}

/// Adapts an async closure into a [`Capability`].
pub struct FnCapability<F> {
    func: F,
}

impl<F> FnCapability<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> Capability for FnCapability<F>
where
    F: Fn(String, ExecutionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CapabilityResult<Value>> + Send + 'static,
{
    async fn execute(
        &self,
        description: &str,
        context: &ExecutionContext,
    ) -> CapabilityResult<Value> {
        (self.func)(description.to_string(), context.clone()).await
    }
}

#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C>(&mut self, name: impl Into<String>, capability: C)
    where
        C: Capability + 'static,
    {
        self.register_arc(name, Arc::new(capability));
    }

    pub fn register_arc(&mut self, name: impl Into<String>, capability: Arc<dyn Capability>) {
        let name = name.into();
        if self.capabilities.insert(name.clone(), capability).is_some() {
            warn!("Capability '{}' already registered, replacing it", name);
        } else {
            debug!("Capability registered: {}", name);
        }
    }

    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(String, ExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CapabilityResult<Value>> + Send + 'static,
    {
        self.register(name, FnCapability::new(func));
    }

    /// Look up an executor. Absence is a normal outcome, not an error.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.capabilities.get(name).cloned()
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.capabilities.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.capabilities.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.names())
            .finish()
    }
}

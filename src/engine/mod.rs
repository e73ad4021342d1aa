// ABOUTME: Execution engine module: registry, context, fixed-point scheduler and run results
// ABOUTME: Also hosts the static dependency graph used for validation and stall diagnostics

pub mod context;
pub mod dependency;
pub mod error;
pub mod executor;
pub mod registry;
pub mod result;

pub use context::ExecutionContext;
pub use dependency::{DanglingEdge, DependencyGraph, ExecutionPlan};
pub use error::{CapabilityError, CapabilityResult, DependencyError};
pub use executor::{EngineConfig, WorkflowEngine};
pub use registry::{Capability, CapabilityRegistry, FnCapability};
pub use result::{RunResult, RunStatus, RunSummary, UnresolvedReason, UnresolvedStep};

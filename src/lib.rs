// ABOUTME: Main library module for the capflow execution engine
// ABOUTME: Exports all core modules and provides the public API

pub mod capabilities;
pub mod cli;
pub mod engine;
pub mod output;
pub mod plan;

// Re-export commonly used types
pub use cli::{App, Args, Config};
pub use engine::{
    Capability, CapabilityError, CapabilityRegistry, EngineConfig, ExecutionContext, RunResult,
    RunStatus, UnresolvedReason, WorkflowEngine,
};
pub use output::{OutputFormat, OutputHandler};
pub use plan::{Plan, PlanAnalyzer, PlanError, PlanParser, Step};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

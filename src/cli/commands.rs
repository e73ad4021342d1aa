// ABOUTME: Command implementations for the capflow CLI
// ABOUTME: Handles execution of the run, validate and capabilities commands

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

use super::config::{check_engine, Config};
use crate::capabilities::{self, BUILTIN};
use crate::engine::{EngineConfig, ExecutionContext, WorkflowEngine};
use crate::output::{OutputDestination, OutputFormat, OutputHandler, OutputOptions};
use crate::plan::{Plan, PlanAnalyzer, PlanParser};

/// Per-invocation settings of `capflow run`; unset fields fall back to config.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub context_file: Option<PathBuf>,
    pub max_iterations: Option<usize>,
    pub parallel: bool,
    pub max_concurrent: Option<usize>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub no_results: bool,
    pub truncate: Option<usize>,
}

impl RunOptions {
    fn engine_config(&self, config: &Config) -> Result<EngineConfig> {
        let mut engine = config.engine.clone();
        if let Some(max_iterations) = self.max_iterations {
            engine.max_iterations = max_iterations;
        }
        if self.parallel {
            engine.parallel = true;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            engine.max_concurrent = max_concurrent;
        }
        check_engine(&engine)?;
        Ok(engine)
    }

    fn output_options(&self) -> OutputOptions {
        let mut options = OutputOptions {
            include_results: !self.no_results,
            ..OutputOptions::default()
        };
        if let Some(max) = self.truncate {
            options = options.truncate_at(max);
        }
        options
    }
}

/// Execute a plan command
pub async fn run_plan(plan_path: PathBuf, options: RunOptions, config: &Config) -> Result<()> {
    info!("Starting plan execution: {}", plan_path.display());
    let engine_config = options.engine_config(config)?;

    let plan = load_plan(&plan_path).await?;
    info!("Loaded plan: {} ({} steps)", plan.display_name(), plan.len());

    let mut context = match options.context_file {
        Some(ref path) => ExecutionContext::with_data(load_context_data(path).await?),
        None => ExecutionContext::new(),
    };
    context.merge_variables(config.variables.clone());
    context.add_metadata(
        "plan_file".to_string(),
        plan_path.display().to_string(),
    );

    let registry = capabilities::builtin_registry();
    let engine = WorkflowEngine::with_config(engine_config);
    let result = engine.run(&plan, &registry, &context).await;

    let destination = match options.output {
        Some(ref path) => OutputDestination::file(path),
        None => OutputDestination::Stdout,
    };
    OutputHandler::new()
        .with_options(options.output_options())
        .output_run_result(&result, options.format, &destination)
        .await
        .context("Failed to write run result")?;

    // Unresolved steps make the process exit non-zero.
    if result.has_unresolved() {
        anyhow::bail!(
            "{} of {} step(s) did not complete (status: {})",
            result.summary.unresolved_steps,
            result.summary.total_steps,
            result.status
        );
    }

    info!("Plan execution completed");
    Ok(())
}

/// Validate a plan file
pub async fn validate_plan(plan_path: PathBuf, format: OutputFormat) -> Result<()> {
    info!("Validating plan: {}", plan_path.display());

    let plan = load_plan(&plan_path).await?;
    let report = PlanAnalyzer::new()
        .with_capabilities(BUILTIN.iter().copied())
        .analyze(&plan);

    let rendered = OutputHandler::new().format_analysis(&plan, &report, format)?;
    print!("{}", rendered);
    if !rendered.ends_with('\n') {
        println!();
    }

    if !report.is_valid {
        anyhow::bail!(
            "Plan validation failed with {} error(s)",
            report.errors.len()
        );
    }

    info!("Plan validation completed successfully");
    Ok(())
}

/// List the built-in capabilities
pub fn list_capabilities() -> Result<()> {
    let registry = capabilities::builtin_registry();
    for name in registry.names() {
        println!("{}", name);
    }
    Ok(())
}

async fn load_plan(path: &Path) -> Result<Plan> {
    PlanParser::new()
        .parse_file(path)
        .await
        .with_context(|| format!("Failed to load plan {}", path.display()))
}

async fn load_context_data(path: &Path) -> Result<Value> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read context file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Context file {} is not valid JSON", path.display()))
}

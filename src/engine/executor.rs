// ABOUTME: Fixed-point workflow engine: rescans pending steps and runs those whose dependencies completed
// ABOUTME: Step failures stay local; stalls and iteration-cap exhaustion end the run with diagnostics

use futures::future::join_all;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use super::context::ExecutionContext;
use super::dependency::DependencyGraph;
use super::error::CapabilityResult;
use super::registry::{Capability, CapabilityRegistry};
use super::result::{RunResult, UnresolvedReason};
use crate::plan::{Plan, Step};

pub const DEFAULT_MAX_ITERATIONS: usize = 10;
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on full scans of the pending steps.
    pub max_iterations: usize,
    /// Dispatch every step ready at the start of a scan concurrently.
    pub parallel: bool,
    /// Permits for concurrent capability calls in parallel mode. Values are
    /// clamped to `1..=Semaphore::MAX_PERMITS`, so `0` behaves as `1`.
    pub max_concurrent: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            parallel: false,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// What a single scan decided about one pending step.
enum Readiness {
    Dangling(Vec<String>),
    Waiting,
    UnknownCapability,
    Ready(Arc<dyn Capability>),
}

/// Drives a plan to completion or to a terminal stalled state.
///
/// The engine holds no state across runs; everything a run produces lands in
/// the returned [`RunResult`].
#[derive(Debug, Clone, Default)]
pub struct WorkflowEngine {
    config: EngineConfig,
}

impl WorkflowEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn permits(&self) -> usize {
        self.config.max_concurrent.clamp(1, Semaphore::MAX_PERMITS)
    }

    /// Run every step of `plan` whose dependencies can be satisfied.
    ///
    /// Never fails: per-step problems end up in [`RunResult::unresolved`].
    #[instrument(skip_all, fields(plan = %plan.display_name(), steps = plan.len()))]
    pub async fn run(
        &self,
        plan: &Plan,
        registry: &CapabilityRegistry,
        context: &ExecutionContext,
    ) -> RunResult {
        let start_time = Instant::now();
        let mut result = RunResult::new(plan.name().map(str::to_string), plan.len());

        info!(
            "Starting plan execution: {} (run_id: {}, {} steps, parallel: {})",
            plan.display_name(),
            result.run_id,
            plan.len(),
            self.config.parallel
        );

        let known: HashSet<&str> = plan.step_ids().collect();
        let mut pending: Vec<&Step> = plan.steps().iter().collect();

        while !pending.is_empty() && result.iterations < self.config.max_iterations {
            result.iterations += 1;
            debug!(
                "Iteration {}: {} step(s) pending",
                result.iterations,
                pending.len()
            );

            let (remaining, progress) = if self.config.parallel {
                self.scan_parallel(pending, &known, registry, context, &mut result)
                    .await
            } else {
                self.scan_sequential(pending, &known, registry, context, &mut result)
                    .await
            };
            pending = remaining;

            if !progress {
                Self::mark_stalled(&pending, &mut result);
                pending.clear();
                break;
            }
        }

        if !pending.is_empty() {
            warn!(
                "Iteration limit of {} reached with {} step(s) pending",
                self.config.max_iterations,
                pending.len()
            );
            for step in pending {
                let reason = UnresolvedReason::IterationLimitExceeded {
                    limit: self.config.max_iterations,
                    blocked_on: Self::blocked_on(step, &result.completed),
                };
                result.record_unresolved(step, reason);
            }
        }

        result.mark_completed();

        info!(
            "Plan execution finished in {:?} after {} iteration(s) with status: {} ({} completed, {} unresolved)",
            start_time.elapsed(),
            result.iterations,
            result.status,
            result.completed.len(),
            result.unresolved.len()
        );

        result
    }

    /// One scan, readiness judged against the live completed set.
    async fn scan_sequential<'p>(
        &self,
        pending: Vec<&'p Step>,
        known: &HashSet<&str>,
        registry: &CapabilityRegistry,
        context: &ExecutionContext,
        result: &mut RunResult,
    ) -> (Vec<&'p Step>, bool) {
        let mut remaining = Vec::new();
        let mut progress = false;

        for step in pending {
            match Self::classify(step, known, &result.completed, registry) {
                Readiness::Waiting => remaining.push(step),
                Readiness::Ready(capability) => {
                    Self::log_start(step);
                    result.record_invocation(&step.id);
                    let outcome = capability.execute(&step.description, context).await;
                    Self::record_outcome(step, outcome, result);
                    progress = true;
                }
                readiness => {
                    Self::record_unrunnable(step, readiness, result);
                    progress = true;
                }
            }
        }

        (remaining, progress)
    }

    /// One scan with every ready step dispatched concurrently. Readiness is
    /// judged against the completed set as it stood when the scan began and
    /// outcomes are merged in input order.
    async fn scan_parallel<'p>(
        &self,
        pending: Vec<&'p Step>,
        known: &HashSet<&str>,
        registry: &CapabilityRegistry,
        context: &ExecutionContext,
        result: &mut RunResult,
    ) -> (Vec<&'p Step>, bool) {
        let decisions: Vec<(&Step, Readiness)> = pending
            .into_iter()
            .map(|step| {
                let readiness = Self::classify(step, known, &result.completed, registry);
                (step, readiness)
            })
            .collect();

        let semaphore = Semaphore::new(self.permits());
        let semaphore = &semaphore;
        let mut invocations = Vec::new();
        for (step, readiness) in &decisions {
            if let Readiness::Ready(capability) = readiness {
                let step: &'p Step = *step;
                Self::log_start(step);
                result.record_invocation(&step.id);
                let capability = Arc::clone(capability);
                invocations.push(async move {
                    // The semaphore is never closed, so acquisition only waits.
                    let _permit = semaphore.acquire().await;
                    capability.execute(&step.description, context).await
                });
            }
        }

        if !invocations.is_empty() {
            debug!("Dispatching {} ready step(s) concurrently", invocations.len());
        }
        let mut outcomes = join_all(invocations).await.into_iter();

        let mut remaining = Vec::new();
        let mut progress = false;
        for (step, readiness) in decisions {
            match readiness {
                Readiness::Waiting => remaining.push(step),
                Readiness::Ready(_) => {
                    if let Some(outcome) = outcomes.next() {
                        Self::record_outcome(step, outcome, result);
                    }
                    progress = true;
                }
                readiness => {
                    Self::record_unrunnable(step, readiness, result);
                    progress = true;
                }
            }
        }

        (remaining, progress)
    }

    fn classify(
        step: &Step,
        known: &HashSet<&str>,
        completed: &IndexSet<String>,
        registry: &CapabilityRegistry,
    ) -> Readiness {
        let missing: Vec<String> = step
            .dependencies
            .iter()
            .filter(|dep| !completed.contains(dep.as_str()) && !known.contains(dep.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Readiness::Dangling(missing);
        }

        if !step
            .dependencies
            .iter()
            .all(|dep| completed.contains(dep.as_str()))
        {
            debug!("Step {} waiting on dependencies", step.id);
            return Readiness::Waiting;
        }

        match registry.resolve(&step.capability) {
            Some(capability) => Readiness::Ready(capability),
            None => Readiness::UnknownCapability,
        }
    }

    fn log_start(step: &Step) {
        info!(
            "Starting step: {} ({}) with capability {}",
            step.id,
            step.display_name(),
            step.capability
        );
    }

    fn record_outcome(step: &Step, outcome: CapabilityResult<Value>, result: &mut RunResult) {
        match outcome {
            Ok(value) => {
                info!("Step {} completed", step.id);
                result.record_success(&step.id, value);
            }
            Err(err) => {
                error!("Step {} failed: {}", step.id, err);
                result.record_unresolved(step, UnresolvedReason::ExecutionFailed { error: err });
            }
        }
    }

    fn record_unrunnable(step: &Step, readiness: Readiness, result: &mut RunResult) {
        let reason = match readiness {
            Readiness::Dangling(missing) => {
                warn!(
                    "Step {} depends on unknown step(s): {}",
                    step.id,
                    missing.join(", ")
                );
                UnresolvedReason::DanglingDependency { missing }
            }
            Readiness::UnknownCapability => {
                warn!(
                    "Step {} names unregistered capability '{}'",
                    step.id, step.capability
                );
                UnresolvedReason::UnknownCapability {
                    capability: step.capability.clone(),
                }
            }
            Readiness::Waiting | Readiness::Ready(_) => return,
        };
        result.record_unresolved(step, reason);
    }

    /// A scan resolved nothing: every pending step is unsatisfiable. Steps on
    /// a true cycle among the stalled set carry its members.
    fn mark_stalled(pending: &[&Step], result: &mut RunResult) {
        let cycles = DependencyGraph::from_steps(pending.iter().copied()).cycles();
        warn!(
            "No progress possible; {} step(s) stalled, {} dependency cycle(s) among them",
            pending.len(),
            cycles.len()
        );

        for step in pending {
            let cycle = cycles
                .iter()
                .find(|members| members.iter().any(|id| id == &step.id))
                .cloned();
            let reason = UnresolvedReason::UnsatisfiableDependencyCycle {
                blocked_on: Self::blocked_on(step, &result.completed),
                cycle,
            };
            result.record_unresolved(step, reason);
        }
    }

    fn blocked_on(step: &Step, completed: &IndexSet<String>) -> Vec<String> {
        step.dependencies
            .iter()
            .filter(|dep| !completed.contains(dep.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::CapabilityError;
    use serde_json::json;

    fn registry() -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        registry.register_fn("ok", |description, _context| async move {
            Ok(json!({ "handled": description }))
        });
        registry.register_fn("boom", |_description, _context| async move {
            Err(CapabilityError::failed("boom"))
        });
        registry
    }

    #[tokio::test]
    async fn test_chain_in_order_finishes_in_one_scan() {
        let plan = Plan::new(vec![
            Step::new("a", "ok"),
            Step::new("b", "ok").depends_on(["a"]),
            Step::new("c", "ok").depends_on(["b"]),
        ])
        .unwrap();

        let run = WorkflowEngine::new()
            .run(&plan, &registry(), &ExecutionContext::new())
            .await;

        assert!(run.is_success());
        assert_eq!(run.iterations, 1);
        assert_eq!(run.execution_order, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_empty_plan_succeeds_without_scanning() {
        let plan = Plan::new(Vec::new()).unwrap();
        let run = WorkflowEngine::new()
            .run(&plan, &registry(), &ExecutionContext::new())
            .await;

        assert!(run.is_success());
        assert_eq!(run.iterations, 0);
        assert!(run.completed.is_empty());
    }

    #[tokio::test]
    async fn test_stall_takes_precedence_on_last_iteration() {
        let plan = Plan::new(vec![
            Step::new("a", "ok").depends_on(["b"]),
            Step::new("b", "ok").depends_on(["a"]),
        ])
        .unwrap();

        let engine = WorkflowEngine::with_config(EngineConfig {
            max_iterations: 1,
            ..EngineConfig::default()
        });
        let run = engine.run(&plan, &registry(), &ExecutionContext::new()).await;

        assert_eq!(run.iterations, 1);
        assert_eq!(
            run.unresolved_with("unsatisfiable-dependency-cycle"),
            vec!["a", "b"]
        );
        assert_eq!(
            run.reason_for("a"),
            Some(&UnresolvedReason::UnsatisfiableDependencyCycle {
                blocked_on: vec!["b".to_string()],
                cycle: Some(vec!["a".to_string(), "b".to_string()]),
            })
        );
    }

    #[tokio::test]
    async fn test_zero_iteration_cap_leaves_everything_pending() {
        let plan = Plan::new(vec![Step::new("a", "ok")]).unwrap();
        let engine = WorkflowEngine::with_config(EngineConfig {
            max_iterations: 0,
            ..EngineConfig::default()
        });
        let run = engine.run(&plan, &registry(), &ExecutionContext::new()).await;

        assert_eq!(run.iterations, 0);
        assert_eq!(run.unresolved_with("iteration-limit-exceeded"), vec!["a"]);
        assert!(run.execution_order.is_empty());
    }

    #[tokio::test]
    async fn test_parallel_scan_merges_in_input_order() {
        let plan = Plan::new(vec![
            Step::new("x", "boom"),
            Step::new("y", "ghostwriter"),
            Step::new("z", "ok"),
            Step::new("w", "ok").depends_on(["z"]),
        ])
        .unwrap();

        let engine = WorkflowEngine::with_config(EngineConfig {
            parallel: true,
            max_concurrent: 2,
            ..EngineConfig::default()
        });
        let run = engine.run(&plan, &registry(), &ExecutionContext::new()).await;

        assert_eq!(run.iterations, 2);
        assert_eq!(run.execution_order, vec!["x", "z", "w"]);
        let unresolved: Vec<&str> = run.unresolved.iter().map(|u| u.step_id.as_str()).collect();
        assert_eq!(unresolved, vec!["x", "y"]);
        assert_eq!(run.completed.iter().collect::<Vec<_>>(), vec!["z", "w"]);
    }

    #[test]
    fn test_engine_config_defaults() {
        let config: EngineConfig = serde_yaml::from_str("parallel: true").unwrap();
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert!(config.parallel);
    }
}

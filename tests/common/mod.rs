// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Plan builders, temp environments and instrumented capabilities

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::fs;

use capflow::engine::{
    Capability, CapabilityError, CapabilityRegistry, CapabilityResult, ExecutionContext,
};
use capflow::plan::{Plan, Step};

pub struct TestPlanBuilder {
    name: String,
    description: String,
    steps: Vec<Step>,
}

impl TestPlanBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: format!("Test plan: {}", name),
            steps: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn add_step(mut self, id: &str, capability: &str, description: &str) -> Self {
        self.steps
            .push(Step::new(id, capability).with_description(description));
        self
    }

    pub fn add_dependent_step(
        mut self,
        id: &str,
        capability: &str,
        description: &str,
        depends_on: Vec<&str>,
    ) -> Self {
        self.steps.push(
            Step::new(id, capability)
                .with_description(description)
                .depends_on(depends_on),
        );
        self
    }

    pub fn build(&self) -> Plan {
        Plan::new(self.steps.clone())
            .expect("test plan should be well formed")
            .with_name(self.name.clone())
            .with_description(self.description.clone())
    }

    pub fn generate_yaml(&self) -> String {
        let mut yaml = format!(
            "name: {}\ndescription: \"{}\"\n\nsteps:\n",
            self.name, self.description
        );

        for step in &self.steps {
            yaml.push_str(&format!("  - id: {}\n", step.id));
            yaml.push_str(&format!("    capability: {}\n", step.capability));
            yaml.push_str(&format!(
                "    description: {}\n",
                serde_json::to_string(&step.description).unwrap()
            ));
            if !step.dependencies.is_empty() {
                yaml.push_str("    dependencies:\n");
                for dep in &step.dependencies {
                    yaml.push_str(&format!("      - {}\n", dep));
                }
            }
        }

        yaml
    }

    pub async fn write_to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        fs::write(path, self.generate_yaml()).await?;
        Ok(())
    }
}

pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn plan_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}.yaml", name))
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}_output.json", name))
    }

    pub async fn create_plan_file(&self, name: &str, builder: &TestPlanBuilder) -> PathBuf {
        let plan_file = self.plan_file(name);
        builder
            .write_to_file(&plan_file)
            .await
            .expect("Failed to write plan file");
        plan_file
    }

    pub async fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, contents)
            .await
            .expect("Failed to write test file");
        path
    }
}

/// Shared, ordered record of what instrumented capabilities saw.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: String) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

/// Succeeds with a tagged payload and logs every description it receives.
pub struct RecordingCapability {
    name: String,
    log: EventLog,
}

impl RecordingCapability {
    pub fn new(name: &str, log: &EventLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
        }
    }
}

#[async_trait]
impl Capability for RecordingCapability {
    async fn execute(&self, description: &str, context: &ExecutionContext) -> CapabilityResult<Value> {
        self.log.push(format!("{}:{}", self.name, description));
        Ok(json!({
            "capability": self.name,
            "description": description,
            "context": context.data,
        }))
    }
}

/// Always fails with the given message.
pub struct FailingCapability {
    message: String,
    log: EventLog,
}

impl FailingCapability {
    pub fn new(message: &str, log: &EventLog) -> Self {
        Self {
            message: message.to_string(),
            log: log.clone(),
        }
    }
}

#[async_trait]
impl Capability for FailingCapability {
    async fn execute(&self, description: &str, _context: &ExecutionContext) -> CapabilityResult<Value> {
        self.log.push(format!("fail:{}", description));
        Err(CapabilityError::failed(self.message.clone()))
    }
}

/// Sleeps briefly, logging start/end events and the peak number of
/// overlapping invocations.
pub struct ProbeCapability {
    log: EventLog,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    delay: Duration,
}

impl ProbeCapability {
    pub fn new(log: &EventLog, delay: Duration) -> Self {
        Self {
            log: log.clone(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            delay,
        }
    }

    pub fn peak_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.peak)
    }
}

#[async_trait]
impl Capability for ProbeCapability {
    async fn execute(&self, description: &str, _context: &ExecutionContext) -> CapabilityResult<Value> {
        self.log.push(format!("start:{}", description));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.log.push(format!("end:{}", description));
        Ok(json!(description))
    }
}

/// Registry with the three capabilities of the campaign scenario.
pub fn scenario_registry(log: &EventLog) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register("monitor", RecordingCapability::new("monitor", log));
    registry.register("rednote", RecordingCapability::new("rednote", log));
    registry.register("product", RecordingCapability::new("product", log));
    registry
}

pub async fn read_json_output(
    file_path: &Path,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file_path).await?;
    let json: serde_json::Value = serde_json::from_str(&content)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_builder() {
        let builder = TestPlanBuilder::new("test_plan")
            .with_description("Test plan description")
            .add_step("s1", "monitor", "watch \"quoted\" text")
            .add_dependent_step("s2", "rednote", "write", vec!["s1"]);

        let yaml = builder.generate_yaml();
        assert!(yaml.contains("name: test_plan"));
        assert!(yaml.contains("- id: s1"));
        assert!(yaml.contains("dependencies:"));

        let plan = builder.build();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.name(), Some("test_plan"));
    }

    #[test]
    fn test_environment_setup() {
        let env = TestEnvironment::new();
        assert!(env.path().exists());
        assert!(env.plan_file("demo").to_string_lossy().ends_with("demo.yaml"));
    }
}

// ABOUTME: Built-in `command` capability running the step description as a shell script
// ABOUTME: Working directory, extra environment and timeout come from context variables

use async_trait::async_trait;
use serde_json::{json, Value};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info};

use crate::engine::error::{CapabilityError, CapabilityResult};
use crate::engine::{Capability, ExecutionContext};

pub const CWD_VARIABLE: &str = "command.cwd";
pub const ENV_PREFIX: &str = "command.env.";
pub const TIMEOUT_VARIABLE: &str = "command.timeout_seconds";

/// Runs `sh -c <description>` and reports its exit code and captured output.
///
/// ```yaml
/// - id: list
///   capability: command
///   description: ls -1 | wc -l
/// ```
///
/// A non-zero exit is a failure carrying the exit code and stderr.
#[derive(Debug, Clone)]
pub struct CommandCapability {
    shell: String,
}

impl Default for CommandCapability {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl CommandCapability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    fn build_command(&self, script: &str, context: &ExecutionContext) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(script);

        for (key, value) in context.variables_with_prefix(ENV_PREFIX) {
            cmd.env(key, value);
        }

        if let Some(cwd) = context.variable(CWD_VARIABLE) {
            cmd.current_dir(cwd);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }

    fn timeout_from(context: &ExecutionContext) -> CapabilityResult<Option<Duration>> {
        match context.variable(TIMEOUT_VARIABLE) {
            None => Ok(None),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) | Err(_) => Err(CapabilityError::invalid_input(format!(
                    "{} must be a positive number of seconds, got '{}'",
                    TIMEOUT_VARIABLE, raw
                ))),
                Ok(secs) => Ok(Some(Duration::from_secs(secs))),
            },
        }
    }
}

#[async_trait]
impl Capability for CommandCapability {
    async fn execute(
        &self,
        description: &str,
        context: &ExecutionContext,
    ) -> CapabilityResult<Value> {
        let script = description.trim();
        if script.is_empty() {
            return Err(CapabilityError::invalid_input("no command to run"));
        }

        let limit = Self::timeout_from(context)?;
        info!("Running command with {}: {}", self.shell, script);

        let mut cmd = self.build_command(script, context);
        let child = cmd.output();
        let output = match limit {
            Some(limit) => match timeout(limit, child).await {
                Ok(output) => output?,
                Err(_) => {
                    let message = format!("Command timed out after {:?}", limit);
                    error!("{}", message);
                    return Err(CapabilityError::failed(message));
                }
            },
            None => child.await?,
        };

        let exit_code = output.status.code();
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        debug!("Command completed with exit code: {:?}", exit_code);

        if !output.status.success() {
            return Err(CapabilityError::CommandFailed { exit_code, stderr });
        }

        Ok(json!({
            "exit_code": exit_code,
            "stdout": stdout,
            "stderr": stderr,
        }))
    }
}

// ABOUTME: Configuration management for the capflow application
// ABOUTME: Handles loading and merging configuration from files and environment variables

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::engine::EngineConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Merged into every run's context variables.
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

const CONFIG_FILE_NAMES: &[&str] = &[
    "capflow.yaml",
    "capflow.yml",
    ".capflow.yaml",
    ".capflow.yml",
];

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path.or_else(Self::find_config_file) {
            Some(config_path) if config_path.exists() => Self::from_file(&config_path)?,
            _ => Config::default(),
        };

        config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine would otherwise adjust silently.
    pub fn validate(&self) -> Result<()> {
        check_engine(&self.engine)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
            .or_else(|| {
                dirs::home_dir()
                    .map(|home| home.join(".capflow").join("config.yaml"))
                    .filter(|path| path.exists())
            })
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) -> Result<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("CAPFLOW_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("CAPFLOW_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(max) = lookup("CAPFLOW_MAX_ITERATIONS") {
            self.engine.max_iterations = max
                .parse()
                .with_context(|| format!("Invalid CAPFLOW_MAX_ITERATIONS '{}'", max))?;
        }
        if let Some(parallel) = lookup("CAPFLOW_PARALLEL") {
            self.engine.parallel = parse_bool(&parallel)
                .with_context(|| format!("Invalid CAPFLOW_PARALLEL '{}'", parallel))?;
        }
        if let Some(max) = lookup("CAPFLOW_MAX_CONCURRENT") {
            self.engine.max_concurrent = max
                .parse()
                .with_context(|| format!("Invalid CAPFLOW_MAX_CONCURRENT '{}'", max))?;
        }

        Ok(())
    }

    /// Merge additional variables; later values win.
    pub fn merge_variables(&mut self, vars: HashMap<String, String>) {
        self.variables.extend(vars);
    }
}

pub(crate) fn check_engine(engine: &EngineConfig) -> Result<()> {
    if engine.max_concurrent == 0 {
        anyhow::bail!("engine.max_concurrent must be at least 1");
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got '{}'", other),
    }
}

// ABOUTME: Configuration types for output handling
// ABOUTME: Output format, presentation options and where formatted results go

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Yaml,
    #[default]
    Text,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputOptions {
    #[serde(default)]
    pub include_timestamps: bool,
    #[serde(default = "default_true")]
    pub include_duration: bool,
    /// Include each completed step's result value.
    #[serde(default = "default_true")]
    pub include_results: bool,
    /// Truncate rendered step results in text output.
    #[serde(default)]
    pub max_output_length: Option<usize>,
    #[serde(default)]
    pub pretty_print: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputDestination {
    #[default]
    Stdout,
    File { path: PathBuf, create_dirs: bool },
}

fn default_true() -> bool {
    true
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            include_timestamps: false,
            include_duration: true,
            include_results: true,
            max_output_length: None,
            pretty_print: false,
        }
    }
}

impl OutputOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_all(mut self) -> Self {
        self.include_timestamps = true;
        self.include_duration = true;
        self.include_results = true;
        self
    }

    pub fn minimal(mut self) -> Self {
        self.include_timestamps = false;
        self.include_duration = false;
        self.include_results = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.pretty_print = true;
        self
    }

    pub fn truncate_at(mut self, max: usize) -> Self {
        self.max_output_length = Some(max);
        self
    }
}

impl OutputDestination {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            create_dirs: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_options_builder() {
        let options = OutputOptions::new().include_all().pretty().truncate_at(40);
        assert!(options.include_timestamps);
        assert!(options.pretty_print);
        assert_eq!(options.max_output_length, Some(40));

        let minimal = OutputOptions::new().minimal();
        assert!(!minimal.include_results);
        assert!(!minimal.include_duration);
    }

    #[test]
    fn test_output_format_names() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
        assert_eq!(OutputFormat::Yaml.to_string(), "yaml");
        assert_eq!(
            OutputFormat::from_str("JSON", true),
            Ok(OutputFormat::Json)
        );
        let parsed: OutputFormat = serde_yaml::from_str("json").unwrap();
        assert_eq!(parsed, OutputFormat::Json);
    }

    #[test]
    fn test_file_destination() {
        assert_eq!(
            OutputDestination::file("out/run.json"),
            OutputDestination::File {
                path: PathBuf::from("out/run.json"),
                create_dirs: true
            }
        );
    }
}

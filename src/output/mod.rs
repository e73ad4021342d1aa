// ABOUTME: Output handler module for run result and analysis formatting
// ABOUTME: Handles JSON/YAML/text formatting and delivery to stdout or a file

pub mod config;
pub mod error;
pub mod formatter;
pub mod writer;

use std::collections::HashMap;

pub use self::config::{OutputDestination, OutputFormat, OutputOptions};
pub use self::error::{OutputError, Result};
pub use self::formatter::{JsonFormatter, OutputFormatter, TextFormatter, YamlFormatter};
pub use self::writer::{writer_for, FileWriter, OutputWriter, StdoutWriter};

use crate::engine::RunResult;
use crate::plan::{AnalysisReport, Plan};

pub struct OutputHandler {
    formatters: HashMap<OutputFormat, Box<dyn OutputFormatter>>,
    options: OutputOptions,
}

impl OutputHandler {
    pub fn new() -> Self {
        let mut handler = Self {
            formatters: HashMap::new(),
            options: OutputOptions::default(),
        };

        handler.register_formatter(OutputFormat::Json, Box::new(JsonFormatter::new_pretty()));
        handler.register_formatter(OutputFormat::Yaml, Box::new(YamlFormatter::new()));
        handler.register_formatter(OutputFormat::Text, Box::new(TextFormatter::new()));

        handler
    }

    pub fn with_options(mut self, options: OutputOptions) -> Self {
        self.options = options;
        self
    }

    pub fn register_formatter(&mut self, format: OutputFormat, formatter: Box<dyn OutputFormatter>) {
        self.formatters.insert(format, formatter);
    }

    fn formatter(&self, format: OutputFormat) -> Result<&dyn OutputFormatter> {
        self.formatters
            .get(&format)
            .map(|f| f.as_ref())
            .ok_or_else(|| OutputError::FormatError {
                message: format!("no formatter registered for {}", format),
            })
    }

    pub fn format_run_result(&self, result: &RunResult, format: OutputFormat) -> Result<String> {
        self.formatter(format)?
            .format_run_result(result, &self.options)
    }

    pub fn format_analysis(
        &self,
        plan: &Plan,
        report: &AnalysisReport,
        format: OutputFormat,
    ) -> Result<String> {
        self.formatter(format)?
            .format_analysis(plan, report, &self.options)
    }

    pub async fn output_run_result(
        &self,
        result: &RunResult,
        format: OutputFormat,
        destination: &OutputDestination,
    ) -> Result<()> {
        let formatted = self.format_run_result(result, format)?;
        writer_for(destination).write(&formatted).await
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a run result with default options.
pub fn format_run_result(result: &RunResult, format: OutputFormat) -> Result<String> {
    OutputHandler::new().format_run_result(result, format)
}

// ABOUTME: Output formatters for different result formats (JSON, YAML, text)
// ABOUTME: Renders run results and plan analysis reports for people and machines

use serde_json::{self, Value as JsonValue};

use super::config::OutputOptions;
use super::error::{OutputError, Result};
use crate::engine::{RunResult, RunStatus};
use crate::plan::{AnalysisReport, Plan};

pub trait OutputFormatter: Send + Sync {
    fn format_run_result(&self, result: &RunResult, options: &OutputOptions) -> Result<String>;

    fn format_analysis(
        &self,
        plan: &Plan,
        report: &AnalysisReport,
        options: &OutputOptions,
    ) -> Result<String>;
}

pub struct JsonFormatter {
    pretty: bool,
}

pub struct YamlFormatter;

pub struct TextFormatter;

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    pub fn new_pretty() -> Self {
        Self { pretty: true }
    }

    fn render(&self, value: &JsonValue, options: &OutputOptions) -> Result<String> {
        if self.pretty || options.pretty_print {
            serde_json::to_string_pretty(value).map_err(OutputError::SerializationError)
        } else {
            serde_json::to_string(value).map_err(OutputError::SerializationError)
        }
    }

    fn prepare_run_output(&self, result: &RunResult, options: &OutputOptions) -> Result<JsonValue> {
        let mut output = serde_json::Map::new();

        if let Some(ref plan_name) = result.plan_name {
            output.insert("plan".to_string(), JsonValue::String(plan_name.clone()));
        }
        output.insert(
            "run_id".to_string(),
            JsonValue::String(result.run_id.clone()),
        );
        output.insert(
            "status".to_string(),
            JsonValue::String(result.status.to_string()),
        );
        output.insert(
            "iterations".to_string(),
            JsonValue::Number((result.iterations as u64).into()),
        );

        if options.include_timestamps {
            output.insert(
                "start_time".to_string(),
                JsonValue::String(result.start_time.to_rfc3339()),
            );
            if let Some(end_time) = result.end_time {
                output.insert(
                    "end_time".to_string(),
                    JsonValue::String(end_time.to_rfc3339()),
                );
            }
        }

        if options.include_duration {
            if let Some(seconds) = result
                .duration
                .and_then(|d| serde_json::Number::from_f64(d.as_secs_f64()))
            {
                output.insert("duration_seconds".to_string(), JsonValue::Number(seconds));
            }
        }

        output.insert(
            "summary".to_string(),
            serde_json::to_value(&result.summary)?,
        );
        output.insert(
            "completed".to_string(),
            serde_json::to_value(&result.completed)?,
        );
        output.insert(
            "execution_order".to_string(),
            serde_json::to_value(&result.execution_order)?,
        );

        if options.include_results {
            output.insert(
                "results".to_string(),
                serde_json::to_value(&result.results)?,
            );
        }

        output.insert(
            "unresolved".to_string(),
            serde_json::to_value(&result.unresolved)?,
        );

        Ok(JsonValue::Object(output))
    }

    fn prepare_analysis_output(&self, plan: &Plan, report: &AnalysisReport) -> Result<JsonValue> {
        let mut output = serde_json::Map::new();
        if let Some(name) = plan.name() {
            output.insert("plan".to_string(), JsonValue::String(name.to_string()));
        }
        output.insert(
            "steps".to_string(),
            JsonValue::Number((plan.len() as u64).into()),
        );
        if let JsonValue::Object(fields) = serde_json::to_value(report)? {
            output.extend(fields);
        }
        Ok(JsonValue::Object(output))
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_run_result(&self, result: &RunResult, options: &OutputOptions) -> Result<String> {
        let value = self.prepare_run_output(result, options)?;
        self.render(&value, options)
    }

    fn format_analysis(
        &self,
        plan: &Plan,
        report: &AnalysisReport,
        options: &OutputOptions,
    ) -> Result<String> {
        let value = self.prepare_analysis_output(plan, report)?;
        self.render(&value, options)
    }
}

impl Default for YamlFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl YamlFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl OutputFormatter for YamlFormatter {
    fn format_run_result(&self, result: &RunResult, options: &OutputOptions) -> Result<String> {
        let value = JsonFormatter::new().prepare_run_output(result, options)?;
        serde_yaml::to_string(&value).map_err(OutputError::YamlSerializationError)
    }

    fn format_analysis(
        &self,
        plan: &Plan,
        report: &AnalysisReport,
        _options: &OutputOptions,
    ) -> Result<String> {
        let value = JsonFormatter::new().prepare_analysis_output(plan, report)?;
        serde_yaml::to_string(&value).map_err(OutputError::YamlSerializationError)
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self
    }

    fn render_value(value: &JsonValue, options: &OutputOptions) -> String {
        let text = match value {
            JsonValue::String(s) => s.trim_end().to_string(),
            other => other.to_string(),
        };
        match options.max_output_length {
            Some(max) if text.chars().count() > max => {
                format!("{}... [truncated]", text.chars().take(max).collect::<String>())
            }
            _ => text,
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format_run_result(&self, result: &RunResult, options: &OutputOptions) -> Result<String> {
        let mut output = String::new();

        output.push_str(&format!(
            "Plan: {} ({})\n",
            result.plan_name.as_deref().unwrap_or("unnamed plan"),
            result.run_id
        ));
        output.push_str(&format!("Status: {}\n", result.status));
        output.push_str(&format!("Iterations: {}\n", result.iterations));

        if options.include_timestamps {
            output.push_str(&format!(
                "Started: {}\n",
                result.start_time.format("%Y-%m-%d %H:%M:%S UTC")
            ));
            if let Some(end_time) = result.end_time {
                output.push_str(&format!(
                    "Completed: {}\n",
                    end_time.format("%Y-%m-%d %H:%M:%S UTC")
                ));
            }
        }

        if options.include_duration {
            if let Some(duration) = result.duration {
                output.push_str(&format!("Duration: {:.2}s\n", duration.as_secs_f64()));
            }
        }

        output.push_str("\nSummary:\n");
        output.push_str(&format!("  Total steps: {}\n", result.summary.total_steps));
        output.push_str(&format!("  Completed: {}\n", result.summary.completed_steps));
        output.push_str(&format!(
            "  Unresolved: {} ({} failed, {} blocked)\n",
            result.summary.unresolved_steps,
            result.summary.failed_steps,
            result.summary.blocked_steps
        ));
        output.push_str(&format!(
            "  Success rate: {:.1}%\n",
            result.summary.success_rate
        ));

        if !result.completed.is_empty() || !result.unresolved.is_empty() {
            output.push_str("\nSteps:\n");
        }

        for step_id in &result.completed {
            output.push_str(&format!("  ✓ {}\n", step_id));
            if options.include_results {
                if let Some(value) = result.result(step_id) {
                    let rendered = Self::render_value(value, options);
                    if !rendered.is_empty() {
                        output.push_str(&format!(
                            "      Result: {}\n",
                            rendered.replace('\n', "\n      ")
                        ));
                    }
                }
            }
        }

        for unresolved in &result.unresolved {
            let icon = if unresolved.reason.is_execution_failure() {
                "✗"
            } else {
                "⊘"
            };
            output.push_str(&format!(
                "  {} {} ({})\n",
                icon, unresolved.step_id, unresolved.capability
            ));
            output.push_str(&format!("      {}\n", unresolved.reason));
        }

        if result.status == RunStatus::Success && result.completed.is_empty() {
            output.push_str("\nNothing to run.\n");
        }

        Ok(output)
    }

    fn format_analysis(
        &self,
        plan: &Plan,
        report: &AnalysisReport,
        _options: &OutputOptions,
    ) -> Result<String> {
        let mut output = String::new();

        if report.is_valid {
            output.push_str(&format!("✓ Plan '{}' is valid\n", plan.display_name()));
        } else {
            output.push_str(&format!(
                "✗ Plan '{}' has {} error(s)\n",
                plan.display_name(),
                report.errors.len()
            ));
        }
        output.push_str(&format!("  Steps: {}\n", plan.len()));

        if report.has_errors() {
            output.push_str("\nErrors:\n");
            for error in &report.errors {
                output.push_str(&format!("  - {}\n", error));
            }
        }

        if report.has_warnings() {
            output.push_str("\nWarnings:\n");
            for warning in &report.warnings {
                output.push_str(&format!("  - {}\n", warning));
            }
        }

        if let Some(ref batches) = report.batches {
            output.push_str("\nExecution batches:\n");
            for (index, batch) in batches.iter().enumerate() {
                output.push_str(&format!("  {}: {}\n", index + 1, batch.join(", ")));
            }
        }

        Ok(output)
    }
}

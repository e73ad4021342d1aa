// ABOUTME: Command line argument definitions and parsing using Clap
// ABOUTME: Defines the main CLI structure and subcommands for capflow

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "capflow")]
#[command(about = "Run dependency-aware plans across named capabilities")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Disable colored output")]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a plan file with the built-in capabilities
    Run {
        #[arg(help = "Path to plan file (YAML or JSON)")]
        plan: PathBuf,

        #[arg(
            short = 'V',
            long = "var",
            help = "Context variables passed to every step (key=value)"
        )]
        vars: Vec<String>,

        #[arg(long, help = "JSON file used as the context payload")]
        context: Option<PathBuf>,

        #[arg(long, help = "Maximum number of scans over pending steps")]
        max_iterations: Option<usize>,

        #[arg(long, help = "Run ready steps of each scan concurrently")]
        parallel: bool,

        #[arg(long, help = "Maximum number of concurrent steps in parallel mode")]
        max_concurrent: Option<usize>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, help = "Result format")]
        format: OutputFormat,

        #[arg(short, long, help = "Write the result to this file instead of stdout")]
        output: Option<PathBuf>,

        #[arg(long, help = "Leave step result values out of the output")]
        no_results: bool,

        #[arg(long, value_name = "CHARS", help = "Truncate step results in text output")]
        truncate: Option<usize>,
    },

    /// Check a plan's structure and dependencies without running it
    Validate {
        #[arg(help = "Path to plan file (YAML or JSON)")]
        plan: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, help = "Report format")]
        format: OutputFormat,
    },

    /// List the built-in capabilities
    Capabilities,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parse variables from key=value format
    pub fn parse_variables(vars: &[String]) -> anyhow::Result<HashMap<String, String>> {
        let mut variables = HashMap::new();

        for var in vars {
            match var.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    variables.insert(key.trim().to_string(), value.to_string());
                }
                _ => {
                    return Err(anyhow::anyhow!(
                        "Invalid variable format '{}'. Expected 'key=value'",
                        var
                    ));
                }
            }
        }

        Ok(variables)
    }
}

// ABOUTME: Main application orchestration for the capflow CLI
// ABOUTME: Coordinates between CLI arguments, configuration, and command execution

use anyhow::Result;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use super::commands::{self, RunOptions};
use super::{Args, Commands, Config};

pub struct App {
    config: Config,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Initialize logging based on configuration. Logs go to stderr so
    /// formatted results on stdout stay machine readable.
    pub fn init_logging(&self, verbose: bool, no_color: bool) -> Result<()> {
        let log_level: &str = if verbose {
            "debug"
        } else {
            &self.config.logging.level
        };

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let initialized = match self.config.logging.format.as_str() {
            "compact" => tracing_subscriber::fmt()
                .compact()
                .with_env_filter(env_filter)
                .with_ansi(!no_color)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init(),
            _ => tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_ansi(!no_color)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init(),
        };
        initialized.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

        debug!("Logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Run the application with parsed arguments
    pub async fn run(&mut self, args: Args) -> Result<()> {
        self.init_logging(args.verbose, args.no_color)?;

        info!("Starting capflow v{}", crate::VERSION);
        debug!("Configuration loaded from: {:?}", args.config);

        // Command line variables win over configured ones
        if let Commands::Run { ref vars, .. } = args.command {
            let variables = Args::parse_variables(vars)?;
            self.config.merge_variables(variables);
        }

        match args.command {
            Commands::Run {
                plan,
                vars: _,
                context,
                max_iterations,
                parallel,
                max_concurrent,
                format,
                output,
                no_results,
                truncate,
            } => {
                let options = RunOptions {
                    context_file: context,
                    max_iterations,
                    parallel,
                    max_concurrent,
                    format,
                    output,
                    no_results,
                    truncate,
                };
                commands::run_plan(plan, options, &self.config).await
            }

            Commands::Validate { plan, format } => commands::validate_plan(plan, format).await,

            Commands::Capabilities => commands::list_capabilities(),
        }
    }

    /// Parse the command line, load configuration and run
    pub async fn run_from_args() -> Result<()> {
        let args = Args::parse_args();
        let config = Config::load(args.config.clone())?;
        Self::new(config).run(args).await
    }
}

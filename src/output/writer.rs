// ABOUTME: Output writers for the supported destinations (stdout, files)
// ABOUTME: Handles writing formatted results where the caller asked for them

use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use super::config::OutputDestination;
use super::error::{OutputError, Result};

#[async_trait]
pub trait OutputWriter: Send + Sync {
    async fn write(&self, content: &str) -> Result<()>;
}

pub struct StdoutWriter;

pub struct FileWriter {
    path: std::path::PathBuf,
    create_dirs: bool,
}

impl Default for StdoutWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl StdoutWriter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutputWriter for StdoutWriter {
    async fn write(&self, content: &str) -> Result<()> {
        if content.ends_with('\n') {
            print!("{}", content);
        } else {
            println!("{}", content);
        }
        debug!("Output written to stdout ({} chars)", content.len());
        Ok(())
    }
}

impl FileWriter {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_dirs: true,
        }
    }

    pub fn with_create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }
}

#[async_trait]
impl OutputWriter for FileWriter {
    async fn write(&self, content: &str) -> Result<()> {
        let output_path: &Path = &self.path;

        if self.create_dirs {
            if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| OutputError::WriteError {
                        message: format!("Failed to create directory {}: {}", parent.display(), e),
                    })?;
            }
        }

        fs::write(output_path, content)
            .await
            .map_err(|e| OutputError::WriteError {
                message: format!("Failed to write file {}: {}", output_path.display(), e),
            })?;

        info!(
            "Output written to file: {} ({} bytes)",
            output_path.display(),
            content.len()
        );
        Ok(())
    }
}

/// Writer for a destination.
pub fn writer_for(destination: &OutputDestination) -> Box<dyn OutputWriter> {
    match destination {
        OutputDestination::Stdout => Box::new(StdoutWriter::new()),
        OutputDestination::File { path, create_dirs } => {
            Box::new(FileWriter::new(path.clone()).with_create_dirs(*create_dirs))
        }
    }
}

// ABOUTME: Plan documents (YAML or JSON) and the parser that turns them into plans
// ABOUTME: Decoder is picked from the file extension; construction validates shape

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use super::definition::Plan;
use super::error::Result;
use super::step::Step;

/// Serialized form of a plan, as written by hand or by a planning component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Yaml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanParser;

impl PlanParser {
    pub fn new() -> Self {
        Self
    }

    pub async fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Plan> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        self.parse_str(&content, DocumentFormat::from_path(path))
    }

    pub fn parse_str(&self, content: &str, format: DocumentFormat) -> Result<Plan> {
        let document = self.parse_document(content, format)?;
        Plan::from_document(document)
    }

    pub fn parse_document(&self, content: &str, format: DocumentFormat) -> Result<PlanDocument> {
        let document = match format {
            DocumentFormat::Yaml => serde_yaml::from_str(content)?,
            DocumentFormat::Json => serde_json::from_str(content)?,
        };
        Ok(document)
    }
}

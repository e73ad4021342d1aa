// ABOUTME: Error types for output handling operations
// ABOUTME: Covers serialization of run results and writing them to a destination

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Format error: {message}")]
    FormatError { message: String },

    #[error("Write error: {message}")]
    WriteError { message: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    YamlSerializationError(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, OutputError>;

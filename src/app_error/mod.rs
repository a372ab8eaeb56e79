use std::path::Path;
use thiserror::Error;


#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("I/O Error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP Request Error: {0}")]
    Network(String),

    #[error("Chat Protocol Error: {0}")]
    Protocol(String),

    #[error("JSON Serialization/Deserialization Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{failed} of {total} evaluation jobs failed")]
    JobsFailed { failed: usize, total: usize },
}

impl AppError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

use serde::Serialize;
use thiserror::Error;

use crate::host::HostError;
use crate::runtime::RuntimeError;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Invalid scenario: {0}")]
    Scenario(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// Serialized as a plain message for JSON output
impl Serialize for FrameError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VeldtError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid start spot: {0} (valid: 1-8)")]
    InvalidSpot(u8),

    #[error("Malformed knowledge file: {0}")]
    MalformedKnowledge(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VeldtError>;

use thiserror::Error;

/// Result type for deepq operations
pub type Result<T> = std::result::Result<T, DeepQError>;

/// Main error type for the deepq library
#[derive(Error, Debug)]
pub enum DeepQError {
    /// Invalid dimensions for operations
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Action index outside the action set
    #[error("Invalid action {action}: must be less than {max_actions}")]
    InvalidAction {
        action: usize,
        max_actions: usize,
    },

    /// Empty buffer or container
    #[error("Empty buffer: {0}")]
    EmptyBuffer(String),

    /// Models and buffer are unloaded
    #[error("Agent not ready: {0}")]
    NotReady(String),

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<bincode::Error> for DeepQError {
    fn from(err: bincode::Error) -> Self {
        DeepQError::Serialization(err.to_string())
    }
}

// Helper functions for common error patterns
impl DeepQError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        DeepQError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        DeepQError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

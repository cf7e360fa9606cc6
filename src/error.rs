use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorrelatorError {
    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Circuit breaker '{name}' is open")]
    CircuitOpen { name: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CorrelatorError {
    /// A 404-style outcome. Routine for missing builds and git details, so
    /// the circuit breaker ignores it.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api { status, .. } => *status == 404,
            Self::Network(e) => e.status().is_some_and(|s| s.as_u16() == 404),
            _ => false,
        }
    }

    /// A response that arrived but could not be converted. Repeating the
    /// request will not change the outcome.
    pub fn is_decode(&self) -> bool {
        match self {
            Self::Decode(_) | Self::Json(_) => true,
            Self::Network(e) => e.is_decode(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CorrelatorError>;

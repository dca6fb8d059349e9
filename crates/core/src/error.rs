use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid login grant: {0}")]
    InvalidGrant(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(#[from] chrono::ParseError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] config::ConfigError),

    #[error("Tracing initialization failed: {0}")]
    TracingInit(String),
}

impl Error {
    /// Create an invalid grant error
    pub fn invalid_grant(message: impl Into<String>) -> Self {
        Self::InvalidGrant(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

/// Errors raised by the warmer and its capabilities.
#[derive(Debug, Error)]
pub enum WarmerError {
    #[error("invalid warmer config: {0}")]
    InvalidConfig(String),

    #[error("failed to invoke {target}: {source}")]
    Invoke {
        target: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to record metric: {0}")]
    Metric(String),

    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WarmerError>;

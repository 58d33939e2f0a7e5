use thiserror::Error;

#[derive(Error, Debug)]
pub enum MineralError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Raised before any cache interaction when the host passes too few arguments.
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Internal error: null argument list passed to {0}")]
    NullArguments(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MineralError>;

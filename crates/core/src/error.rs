//! Error types shared across gridrun crates.

/// Top-level gridrun error.
#[derive(Debug, thiserror::Error)]
pub enum GridrunError {
    /// Configuration loading or validation failed.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A deployment component failed.
    #[error("deploy error: {0}")]
    Deploy(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// The configuration file is not valid TOML or has wrong types.
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A field holds a value outside its allowed domain.
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

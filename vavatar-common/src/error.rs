//! Common error types for the voice-avatar services

use thiserror::Error;

/// Common result type for voice-avatar operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the voice-avatar crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "IO error: config.toml");
    }

    #[test]
    fn test_config_error_message() {
        let err = Error::Config("logging.level must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: logging.level must not be empty"
        );
    }
}

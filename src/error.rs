//! Error types for corefscore.

use thiserror::Error;

/// Result type for scoring operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for scoring operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Malformed mention or cluster data.
    #[error("Format error: {0}")]
    Format(String),

    /// Key and system inputs disagree in a way that prevents scoring.
    #[error("Data mismatch: {0}")]
    Mismatch(String),

    /// An evaluation was requested with an unusable configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// Create a data-mismatch error.
    pub fn mismatch(msg: impl Into<String>) -> Self {
        Error::Mismatch(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = Error::format("zero mention spans two words");
        assert_eq!(e.to_string(), "Format error: zero mention spans two words");

        let e = Error::mismatch("key and response token counts differ");
        assert!(e.to_string().starts_with("Data mismatch"));
    }
}

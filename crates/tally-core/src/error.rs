//! Error types for tally
//!
//! Recording calls never fail; these errors only surface from one-time setup
//! (identity construction, configuration loading) and from publishers.

use thiserror::Error;

/// Result type alias for tally operations
pub type TallyResult<T> = Result<T, TallyError>;

/// Main error type for tally
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TallyError {
    /// Meter name is empty or blank
    #[error("Invalid meter name: {name:?}")]
    InvalidName { name: String },

    /// Tag key is empty or blank
    #[error("Invalid tag on meter {meter}: empty key")]
    InvalidTag { meter: String },

    /// Configuration values are out of range
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration document could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(String),

    /// A publisher failed to ship a snapshot
    #[error("Publisher error: {publisher}: {message}")]
    Publish { publisher: String, message: String },
}

impl TallyError {
    /// Create a new invalid name error
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Create a new invalid tag error
    pub fn invalid_tag(meter: impl Into<String>) -> Self {
        Self::InvalidTag {
            meter: meter.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new publisher error
    pub fn publish(publisher: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            publisher: publisher.into(),
            message: message.into(),
        }
    }

    /// Whether the error stems from programming misuse of the registration API
    pub fn is_misuse(&self) -> bool {
        matches!(self, Self::InvalidName { .. } | Self::InvalidTag { .. })
    }
}

impl From<std::io::Error> for TallyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<toml::de::Error> for TallyError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TallyError::invalid_name("");
        assert_eq!(err.to_string(), "Invalid meter name: \"\"");

        let err = TallyError::publish("logging", "sink closed");
        assert_eq!(err.to_string(), "Publisher error: logging: sink closed");
    }

    #[test]
    fn test_is_misuse() {
        assert!(TallyError::invalid_tag("requests").is_misuse());
        assert!(!TallyError::config("bad").is_misuse());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: TallyError = io.into();
        assert!(matches!(err, TallyError::Io(msg) if msg.contains("missing")));
    }
}

//! Error types and handling for the `OnTym` service

use thiserror::Error;

/// Main error type for the `OnTym` service
#[derive(Error, Debug)]
pub enum OnTymError {
    /// Missing or malformed caller input
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Network or provider-side failure calling an external service
    #[error("Upstream error: {message}")]
    Upstream { message: String },

    /// The provider replied but the payload did not have the expected shape.
    /// `raw` is kept for diagnostics and never rendered.
    #[error("Unexpected response format: {message}")]
    ResponseFormat { message: String, raw: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Embedded store errors
    #[error("Store error: {message}")]
    Store { message: String },

    /// A referenced record does not exist
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A uniqueness constraint would be violated
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Credentials did not match
    #[error("Invalid email or password")]
    Unauthorized,

    /// The caller is known but not allowed to do this
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// The request did not finish within the server's time limit
    #[error("Request timed out")]
    TimedOut,

    /// The request body is over the configured size limit
    #[error("Request body too large")]
    PayloadTooLarge,

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl OnTymError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new upstream error
    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Create a new response format error, keeping the raw payload
    pub fn response_format<S: Into<String>, R: Into<String>>(message: S, raw: R) -> Self {
        Self::ResponseFormat {
            message: message.into(),
            raw: raw.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new store error
    pub fn store<S: Into<String>>(message: S) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            OnTymError::Validation { message } => format!("Invalid input: {message}"),
            OnTymError::Upstream { .. } => {
                "An external service is unavailable right now. Please try again later."
                    .to_string()
            }
            OnTymError::ResponseFormat { .. } => {
                "An external service returned an unexpected answer. Please try again later."
                    .to_string()
            }
            OnTymError::Config { .. } => {
                "The service is not fully configured. Please contact the operator.".to_string()
            }
            OnTymError::Store { .. } | OnTymError::Io { .. } => {
                "Something went wrong while saving or loading data.".to_string()
            }
            OnTymError::NotFound { entity } => format!("{entity} not found"),
            OnTymError::Conflict { message } => message.clone(),
            OnTymError::Unauthorized => "Invalid email or password".to_string(),
            OnTymError::Forbidden { message } => message.clone(),
            OnTymError::TimedOut => {
                "The request took too long to process. Please try again.".to_string()
            }
            OnTymError::PayloadTooLarge => "The request body is too large.".to_string(),
        }
    }
}

impl From<fjall::Error> for OnTymError {
    fn from(err: fjall::Error) -> Self {
        OnTymError::store(err.to_string())
    }
}

impl From<postcard::Error> for OnTymError {
    fn from(err: postcard::Error) -> Self {
        OnTymError::store(format!("record encoding: {err}"))
    }
}

impl From<tokio::task::JoinError> for OnTymError {
    fn from(err: tokio::task::JoinError) -> Self {
        OnTymError::store(format!("blocking task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let validation_err = OnTymError::validation("description is required");
        assert!(matches!(validation_err, OnTymError::Validation { .. }));

        let upstream_err = OnTymError::upstream("connection refused");
        assert!(matches!(upstream_err, OnTymError::Upstream { .. }));

        let format_err = OnTymError::response_format("not json", "Sure! Here you go");
        assert!(matches!(format_err, OnTymError::ResponseFormat { .. }));
    }

    #[test]
    fn test_response_format_never_shows_raw_text() {
        let err = OnTymError::response_format("reply was not JSON", "SECRET MODEL OUTPUT");
        assert!(!err.to_string().contains("SECRET"));
        assert!(!err.user_message().contains("SECRET"));
    }

    #[test]
    fn test_user_messages() {
        let upstream_err = OnTymError::upstream("timeout");
        assert!(upstream_err.user_message().contains("try again later"));

        let validation_err = OnTymError::validation("message is required");
        assert!(validation_err.user_message().contains("message is required"));

        let not_found = OnTymError::not_found("Product");
        assert_eq!(not_found.user_message(), "Product not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: OnTymError = io_err.into();
        assert!(matches!(err, OnTymError::Io { .. }));
    }
}

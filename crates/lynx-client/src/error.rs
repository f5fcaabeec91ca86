//! Error types for lynx-client crate

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur talking to the Lynx platform
#[derive(Debug, Error)]
pub enum LynxError {
    /// The API answered with a non-success status
    #[error("{message} ({} - {code})", reason(.code))]
    Api { code: u16, message: String },

    /// Network/HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parse error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// MQTT client error
    #[error("MQTT error: {0}")]
    Mqtt(String),

    /// Client was built without MQTT settings
    #[error("MQTT is not configured")]
    MqttNotConfigured,

    /// Publish did not complete in time
    #[error("timeout publishing to topic {0}")]
    PublishTimeout(String),

    /// Publish was rejected by the MQTT client
    #[error("error publishing to topic {topic}: {message}")]
    Publish { topic: String, message: String },

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid arguments to an operation
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Server answered successfully but without the expected content
    #[error("No response from server")]
    NoResponse,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LynxError {
    /// Create an API error from status and message
    pub fn api(code: u16, message: impl Into<String>) -> Self {
        LynxError::Api {
            code,
            message: message.into(),
        }
    }

    /// A 404 error with the canonical message
    pub fn not_found() -> Self {
        Self::api(404, status_text(404))
    }

    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            LynxError::Api { code, .. } => Some(*code),
            LynxError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this is an API error with the given status
    pub fn is_status(&self, code: u16) -> bool {
        matches!(self, LynxError::Api { code: c, .. } if *c == code)
    }

    pub fn is_not_found(&self) -> bool {
        self.is_status(404)
    }

    /// Check if this is a network-related error
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            LynxError::Network(_) | LynxError::Mqtt(_) | LynxError::Timeout
        )
    }
}

impl From<crate::config::ConfigError> for LynxError {
    fn from(err: crate::config::ConfigError) -> Self {
        LynxError::Config(err.to_string())
    }
}

/// Result type for Lynx operations
pub type LynxResult<T> = Result<T, LynxError>;

/// Error body returned by the API
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
}

fn reason(code: &u16) -> &'static str {
    status_text(*code)
}

/// Canonical reason phrase for a status code
pub(crate) fn status_text(code: u16) -> &'static str {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = LynxError::api(403, "Missing permission");
        assert_eq!(err.to_string(), "Missing permission (Forbidden - 403)");

        let err = LynxError::not_found();
        assert_eq!(err.to_string(), "Not Found (Not Found - 404)");
    }

    #[test]
    fn test_status_helpers() {
        let err = LynxError::api(414, "");
        assert_eq!(err.status(), Some(414));
        assert!(err.is_status(414));
        assert!(!err.is_not_found());
        assert!(LynxError::not_found().is_not_found());
        assert_eq!(LynxError::Timeout.status(), None);
    }

    #[test]
    fn test_is_network_error() {
        assert!(LynxError::Mqtt("connection refused".to_string()).is_network_error());
        assert!(LynxError::Timeout.is_network_error());
        assert!(!LynxError::NoResponse.is_network_error());
        assert!(!LynxError::api(500, "boom").is_network_error());
    }

    #[test]
    fn test_publish_error_messages() {
        assert_eq!(
            LynxError::PublishTimeout("obj/1".to_string()).to_string(),
            "timeout publishing to topic obj/1"
        );
        let err = LynxError::Publish {
            topic: "obj/2".to_string(),
            message: "request queue full".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "error publishing to topic obj/2: request queue full"
        );
    }
}

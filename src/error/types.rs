//! Error type definitions
//!
//! Defines the error taxonomy shared by the session, signing and request layers.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the signed client
#[derive(Error, Debug)]
pub enum Error {
    /// No usable session, or the platform rejected the session
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The platform reported failure for a login-flow call
    #[error("Login failed: {message}")]
    Login { message: String },

    /// A non-login call returned `success: false`
    #[error("Request rejected by platform (code {code}): {message}")]
    Rejected { code: i64, message: String },

    /// Transport-level HTTP failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx HTTP status
    #[error("HTTP {status} from {path}")]
    HttpStatus { status: u16, path: String },

    /// Response body is not the expected envelope
    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String },

    /// Cookie record exists but cannot be decoded
    #[error("Cookie file {path:?} is unreadable: {reason}")]
    CookieFile { path: PathBuf, reason: String },

    /// Signature computation failed
    #[error("Signer error: {0}")]
    Signer(String),

    /// Browser launch or cookie harvesting failed
    #[error("Browser error: {message}")]
    Browser { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an unauthenticated error
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    /// Create a login error carrying the platform message
    pub fn login(message: impl Into<String>) -> Self {
        Self::Login {
            message: message.into(),
        }
    }

    /// Create a rejection error
    pub fn rejected(code: i64, message: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            message: message.into(),
        }
    }

    /// Create a malformed response error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
        }
    }

    /// Create a cookie file error
    pub fn cookie_file(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CookieFile {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a signer error
    pub fn signer(msg: impl Into<String>) -> Self {
        Self::Signer(msg.into())
    }

    /// Create a browser error
    pub fn browser(message: impl Into<String>) -> Self {
        Self::Browser {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether a refresh-and-retry may recover from this error
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated(_))
    }

    /// Transport failure or non-2xx status
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::HttpStatus { .. })
    }

    /// Durable storage failure
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::CookieFile { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config("test config error");
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.to_string(), "Configuration error: test config error");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_login_error_keeps_platform_message() {
        let err = Error::login("rate limited");
        assert!(matches!(err, Error::Login { ref message } if message == "rate limited"));
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_rejected_error() {
        let err = Error::rejected(300013, "访问频次异常");
        assert!(err.to_string().contains("300013"));
        assert!(!err.is_unauthenticated());
    }

    #[test]
    fn test_classifiers() {
        assert!(Error::unauthenticated("no session").is_unauthenticated());
        assert!(
            Error::HttpStatus {
                status: 503,
                path: "/api".to_string()
            }
            .is_network()
        );
        assert!(Error::cookie_file("cookies.json", "bad json").is_io());
        assert!(Error::from(std::io::Error::other("disk full")).is_io());
        assert!(!Error::malformed("not json").is_network());
    }

    #[test]
    fn test_browser_error() {
        let err = Error::browser("chrome not found");
        assert!(matches!(err, Error::Browser { .. }));
        assert!(err.to_string().contains("Browser error"));
    }
}

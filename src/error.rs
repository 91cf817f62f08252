//! Unified error handling for the agency session layer
//!
//! This module provides:
//! - Unique error codes for debugging and support tickets
//! - Structured error information with context
//! - Convenient constructor methods
//! - Automatic conversions from common error types

use std::fmt;
use thiserror::Error;

/// Unified Result type for all session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Error codes for session operations
///
/// Each error has a unique code in the format `SXXX` where:
/// - S1XX: Authentication and authorization errors
/// - S2XX: Network and API errors
/// - S3XX: Storage and I/O errors
/// - S4XX: Configuration errors
/// - S5XX: Validation and input errors
/// - S8XX: UI and interaction errors
/// - S9XX: Internal errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (S1XX)
    /// S101: Authentication failed
    AuthenticationFailed,
    /// S102: Authorization denied
    AuthorizationDenied,
    /// S103: Session expired
    SessionExpired,
    /// S104: No session stored locally
    SessionNotFound,

    // Network (S2XX)
    /// S201: HTTP request failed
    HttpError,
    /// S202: Connection timeout
    ConnectionTimeout,
    /// S203: Connection refused
    ConnectionRefused,
    /// S204: API returned error response
    ApiError,
    /// S205: Invalid API response format
    InvalidResponse,

    // Storage/IO (S3XX)
    /// S301: Storage read error
    StorageReadError,
    /// S302: Storage write error
    StorageWriteError,
    /// S303: File not found
    FileNotFound,

    // Configuration (S4XX)
    /// S401: Configuration error
    ConfigError,
    /// S402: Invalid endpoint URL
    InvalidEndpoint,

    // Validation (S5XX)
    /// S501: Invalid input
    InvalidInput,
    /// S502: Validation failed
    ValidationFailed,

    // UI (S8XX)
    /// S801: Dialog error
    DialogError,

    // Internal (S9XX)
    /// S901: Internal error
    InternalError,
    /// S902: Serialization error
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u16 {
        match self {
            ErrorCode::AuthenticationFailed => 101,
            ErrorCode::AuthorizationDenied => 102,
            ErrorCode::SessionExpired => 103,
            ErrorCode::SessionNotFound => 104,

            ErrorCode::HttpError => 201,
            ErrorCode::ConnectionTimeout => 202,
            ErrorCode::ConnectionRefused => 203,
            ErrorCode::ApiError => 204,
            ErrorCode::InvalidResponse => 205,

            ErrorCode::StorageReadError => 301,
            ErrorCode::StorageWriteError => 302,
            ErrorCode::FileNotFound => 303,

            ErrorCode::ConfigError => 401,
            ErrorCode::InvalidEndpoint => 402,

            ErrorCode::InvalidInput => 501,
            ErrorCode::ValidationFailed => 502,

            ErrorCode::DialogError => 801,

            ErrorCode::InternalError => 901,
            ErrorCode::SerializationError => 902,
        }
    }

    /// Get the string code (e.g., "S101")
    pub fn as_str(&self) -> String {
        format!("S{}", self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.code())
    }
}

/// Main error type for all session operations
#[derive(Error, Debug)]
pub enum SessionError {
    // ==================== Authentication Errors (S1XX) ====================
    /// Authentication failed or the session is gone
    #[error("[{code}] Authentication failed: {message}")]
    Authentication { code: ErrorCode, message: String },

    /// Authorization denied (HTTP 403)
    #[error("[{code}] Authorization denied: {message}")]
    Authorization { code: ErrorCode, message: String },

    // ==================== Network Errors (S2XX) ====================
    /// HTTP/Network error
    #[error("[{code}] Network error: {message}")]
    Network {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// API error with status code
    #[error("[{code}] API error ({status}): {message}")]
    Api {
        code: ErrorCode,
        status: u16,
        message: String,
    },

    // ==================== Storage/IO Errors (S3XX) ====================
    /// Storage or IO error
    #[error("[{code}] {context}: {message}")]
    Io {
        code: ErrorCode,
        context: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // ==================== Configuration Errors (S4XX) ====================
    /// Configuration error
    #[error("[{code}] Configuration error: {message}")]
    Config {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<config::ConfigError>,
    },

    // ==================== Validation Errors (S5XX) ====================
    /// Validation error
    #[error("[{code}] Validation error: {message}")]
    Validation {
        code: ErrorCode,
        message: String,
        field: Option<String>,
    },

    /// Invalid input error
    #[error("[{code}] Invalid input: {message}")]
    InvalidInput { code: ErrorCode, message: String },

    // ==================== UI Errors (S8XX) ====================
    /// UI/Dialog error
    #[error("[{code}] UI error: {message}")]
    Ui { code: ErrorCode, message: String },

    // ==================== Internal Errors (S9XX) ====================
    /// Internal/Unexpected error
    #[error("[{code}] Internal error: {message}")]
    Internal { code: ErrorCode, message: String },

    /// JSON serialization error
    #[error("[{code}] Serialization error: {message}")]
    Serialization {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

// ==================== Constructor Methods ====================

impl SessionError {
    // --- Authentication ---

    /// Create authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::AuthenticationFailed,
            message: message.into(),
        }
    }

    /// Create session expired error; raised after the session was terminated
    pub fn session_expired(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::SessionExpired,
            message: message.into(),
        }
    }

    /// Create missing session error
    pub fn session_not_found(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::SessionNotFound,
            message: message.into(),
        }
    }

    /// Create authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            code: ErrorCode::AuthorizationDenied,
            message: message.into(),
        }
    }

    // --- Network ---

    /// Create network error from message
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            code: ErrorCode::HttpError,
            message: message.into(),
            source: None,
        }
    }

    /// Create network error from reqwest error
    pub fn network_from_reqwest(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            ErrorCode::ConnectionTimeout
        } else if err.is_connect() {
            ErrorCode::ConnectionRefused
        } else {
            ErrorCode::HttpError
        };

        Self::Network {
            code,
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::ApiError,
            status,
            message: message.into(),
        }
    }

    /// Create invalid response error
    pub fn invalid_response(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::InvalidResponse,
            status,
            message: message.into(),
        }
    }

    // --- Storage/IO ---

    /// Create storage read error
    pub fn storage_read(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            code: ErrorCode::StorageReadError,
            context: context.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create IO error from std::io::Error
    pub fn io_from_error(context: impl Into<String>, err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::StorageWriteError,
            _ => ErrorCode::StorageReadError,
        };

        Self::Io {
            code,
            context: context.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create storage write error from std::io::Error
    pub fn storage_write(context: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            code: ErrorCode::StorageWriteError,
            context: context.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    // --- Configuration ---

    /// Create configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration error with source
    pub fn config_from_error(err: config::ConfigError) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create invalid endpoint error
    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::InvalidEndpoint,
            message: message.into(),
            source: None,
        }
    }

    // --- Validation ---

    /// Create validation error with field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            code: ErrorCode::InvalidInput,
            message: message.into(),
        }
    }

    // --- Internal ---

    /// Create internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: ErrorCode::InternalError,
            message: message.into(),
        }
    }

    // --- Utility Methods ---

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { code, .. } => *code,
            Self::Authorization { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Api { code, .. } => *code,
            Self::Io { code, .. } => *code,
            Self::Config { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::InvalidInput { code, .. } => *code,
            Self::Ui { code, .. } => *code,
            Self::Internal { code, .. } => *code,
            Self::Serialization { code, .. } => *code,
        }
    }

    /// The bare human-readable message, without code or category prefix.
    ///
    /// Dashboards show this text directly, e.g. the body of a 403.
    pub fn message(&self) -> &str {
        match self {
            Self::Authentication { message, .. }
            | Self::Authorization { message, .. }
            | Self::Network { message, .. }
            | Self::Api { message, .. }
            | Self::Io { message, .. }
            | Self::Config { message, .. }
            | Self::Validation { message, .. }
            | Self::InvalidInput { message, .. }
            | Self::Ui { message, .. }
            | Self::Internal { message, .. }
            | Self::Serialization { message, .. } => message,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Authorization { .. } => Some(403),
            _ => None,
        }
    }

    /// Check if this is an authentication error
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::Authorization { .. }
        )
    }

    /// Check if the session was terminated while serving the call
    pub fn is_session_expired(&self) -> bool {
        self.code() == ErrorCode::SessionExpired
    }
}

// ==================== From Implementations ====================

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        Self::io_from_error("IO operation", err)
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        Self::network_from_reqwest(err)
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            code: ErrorCode::SerializationError,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<config::ConfigError> for SessionError {
    fn from(err: config::ConfigError) -> Self {
        Self::config_from_error(err)
    }
}

impl From<dialoguer::Error> for SessionError {
    fn from(err: dialoguer::Error) -> Self {
        Self::Ui {
            code: ErrorCode::DialogError,
            message: format!("Dialog error: {}", err),
        }
    }
}

impl From<validator::ValidationErrors> for SessionError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|f| f.to_string());
        Self::Validation {
            code: ErrorCode::ValidationFailed,
            message: err.to_string(),
            field,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::AuthenticationFailed.code(), 101);
        assert_eq!(ErrorCode::HttpError.code(), 201);
        assert_eq!(ErrorCode::StorageReadError.code(), 301);
        assert_eq!(ErrorCode::ConfigError.code(), 401);
    }

    #[test]
    fn test_error_code_string() {
        assert_eq!(ErrorCode::SessionExpired.as_str(), "S103");
        assert_eq!(ErrorCode::HttpError.as_str(), "S201");
    }

    #[test]
    fn test_error_display() {
        let err = SessionError::authorization("no access");
        assert!(err.to_string().contains("S102"));
        assert!(err.to_string().contains("no access"));
        assert_eq!(err.message(), "no access");
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn test_session_expired_is_auth_error() {
        let err = SessionError::session_expired("Session expired");
        assert!(err.is_auth_error());
        assert!(err.is_session_expired());
        assert!(!SessionError::authorization("x").is_session_expired());
    }

    #[test]
    fn test_validation_errors_name_the_field() {
        let err = SessionError::from(
            agency_protocol::LoginRequest {
                username: String::new(),
                password: "pw".to_string(),
            }
            .validate()
            .unwrap_err(),
        );
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert!(matches!(
            err,
            SessionError::Validation { field: Some(ref f), .. } if f == "username"
        ));
    }
}

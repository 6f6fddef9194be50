//! Error handling module for the admin core.
//!
//! Provides the centralized error type shared by the transport, the local
//! cache and the controllers, plus parsing of the server's error envelope.

use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
#[allow(dead_code)]
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const SERVER_ERROR: &str = "SERVER_ERROR";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const SERIALIZATION_ERROR: &str = "SERIALIZATION_ERROR";
    pub const SCHEMA_ERROR: &str = "SCHEMA_ERROR";
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
}

/// Application error type.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Transport failure before a response was received
    Network(String),
    /// 401/403 from the backend; the session must be re-established
    Unauthorized(String),
    /// Resource or page not found
    NotFound(String),
    /// Client-side validation failure, never sent to the server
    Validation(String),
    /// Non-success response carrying the server's message
    Server { status: u16, message: String },
    /// Local cache failure
    Storage(String),
    /// JSON encode/decode failure
    Serialization(String),
    /// Introspected schema violates its invariants
    Schema(String),
    /// Invalid configuration value
    Config(String),
}

impl AppError {
    /// Get the HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Unauthorized(_) => Some(401),
            AppError::NotFound(_) => Some(404),
            AppError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Network(_) => codes::NETWORK_ERROR,
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Server { .. } => codes::SERVER_ERROR,
            AppError::Storage(_) => codes::STORAGE_ERROR,
            AppError::Serialization(_) => codes::SERIALIZATION_ERROR,
            AppError::Schema(_) => codes::SCHEMA_ERROR,
            AppError::Config(_) => codes::CONFIG_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Network(msg) => msg.clone(),
            AppError::Unauthorized(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Server { message, .. } => message.clone(),
            AppError::Storage(msg) => msg.clone(),
            AppError::Serialization(msg) => msg.clone(),
            AppError::Schema(msg) => msg.clone(),
            AppError::Config(msg) => msg.clone(),
        }
    }

    /// Whether the UI shell should redirect to the sign-in view.
    pub fn requires_sign_in(&self) -> bool {
        matches!(self, AppError::Unauthorized(_))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Transport error: {:?}", err);
        if err.is_decode() {
            AppError::Serialization(format!("Response decode error: {}", err))
        } else {
            AppError::Network(format!("Network error: {}", err))
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Cache database error: {:?}", err);
        AppError::Storage(format!("Cache database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Serialization(format!("JSON error: {}", err))
    }
}

/// Error body returned by the backend on non-success responses.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServerErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

impl ServerErrorBody {
    /// Build an error from a response status and its raw body text.
    ///
    /// The server's `message` is surfaced verbatim; the reason phrase is
    /// used when the body is not the expected envelope.
    pub fn into_error(status: u16, reason: &str, body: &str) -> AppError {
        let message = serde_json::from_str::<ServerErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| reason.to_string());

        match status {
            401 | 403 => AppError::Unauthorized(message),
            404 => AppError::NotFound(message),
            _ => AppError::Server { status, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_is_verbatim() {
        let err = ServerErrorBody::into_error(422, "Unprocessable", r#"{"message":"Slug taken"}"#);
        assert_eq!(
            err,
            AppError::Server {
                status: 422,
                message: "Slug taken".to_string()
            }
        );
        assert_eq!(err.to_string(), "SERVER_ERROR: Slug taken");
    }

    #[test]
    fn test_reason_used_for_non_envelope_body() {
        let err = ServerErrorBody::into_error(500, "Internal Server Error", "<html>");
        assert_eq!(err.message(), "Internal Server Error");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_auth_statuses_require_sign_in() {
        assert!(ServerErrorBody::into_error(401, "Unauthorized", "").requires_sign_in());
        assert!(ServerErrorBody::into_error(403, "Forbidden", "{}").requires_sign_in());
        assert!(!ServerErrorBody::into_error(404, "Not Found", "").requires_sign_in());
    }
}

//! Error types for mail-digest.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Mail transport errors. Reported to the caller, never retried.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Could not reach {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("Login rejected for {username}: {reason}")]
    AuthRejected { username: String, reason: String },

    #[error("IMAP command {command} failed: {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("IMAP protocol error: {0}")]
    Protocol(String),

    #[error("Message {id} has no body in the FETCH response")]
    MissingBody { id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Recoverable parse failures. Callers substitute a documented fallback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Message has no Date header")]
    MissingDate,

    #[error("Date header is not a valid calendar time: {0}")]
    InvalidDate(String),

    #[error("Invalid date for {field}: {input:?} (expected YYYY-MM-DD)")]
    InvalidCalendarDate { field: String, input: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited")]
    RateLimited { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },
}

/// Google Sheets / Drive API errors.
#[derive(Debug, thiserror::Error)]
pub enum GoogleApiError {
    #[error("Google API request failed: {0}")]
    Request(String),

    #[error("Google API error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response from Google API: {0}")]
    InvalidResponse(String),
}

/// Spreadsheet analysis failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error("No data found in the spreadsheet")]
    NoData,

    #[error("Not enough data found")]
    InsufficientRows,

    #[error("Column '{0}' not found")]
    MissingColumn(&'static str),
}

/// Errors surfaced at the HTTP boundary as `{"error": "..."}` bodies.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Connection(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Configuration(_) => StatusCode::NOT_IMPLEMENTED,
            Self::Connection(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::NoData | AnalysisError::InsufficientRows => Self::NotFound(e.to_string()),
            AnalysisError::MissingColumn(_) => Self::Validation(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_status_codes() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Configuration("x".into()).status(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            ApiError::Connection("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn analysis_errors_map_to_client_statuses() {
        let missing: ApiError = AnalysisError::MissingColumn("Family").into();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.to_string(), "Column 'Family' not found");

        let empty: ApiError = AnalysisError::InsufficientRows.into();
        assert_eq!(empty.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn transport_error_messages_name_the_target() {
        let err = TransportError::AuthRejected {
            username: "ops@example.com".into(),
            reason: "Invalid credentials".into(),
        };
        assert_eq!(
            err.to_string(),
            "Login rejected for ops@example.com: Invalid credentials"
        );
    }
}

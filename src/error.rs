//! Error handling for the authorization core.
//!
//! Every fallible operation in the crate returns [`Result`]. The error type
//! carries a machine-readable [`ErrorCode`] that maps onto HTTP status codes
//! for the response layer, a client-safe message, and an internal message
//! reserved for logs. Backend failures (database, cache, serialization) are
//! always wrapped: callers see the taxonomy kind, never the raw driver error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

/// A specialized Result type for authorization operations.
pub type Result<T> = std::result::Result<T, GateError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Error Codes
// ═══════════════════════════════════════════════════════════════════════════════

/// Machine-readable error codes, stable across releases.
///
/// `InvalidToken` deliberately covers malformed, expired, and revoked tokens:
/// callers must not be able to distinguish them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Token is malformed, expired, or revoked.
    InvalidToken,
    /// Authenticated, but no grant covers the request.
    NoPermission,
    /// Entity does not exist.
    NotFound,
    /// A role with the same name already exists.
    DuplicateName,
    /// The role is still assigned to at least one user.
    RoleInUse,
    /// Username or password is wrong (indistinguishable which).
    InvalidCredentials,
    /// The account exists but is disabled.
    UserDisabled,
    /// Storage, cache, or policy-engine failure.
    Backend,
}

impl ErrorCode {
    /// HTTP status this code maps to in the response layer.
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::NoPermission | Self::UserDisabled => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::DuplicateName | Self::RoleInUse | Self::InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            Self::Backend => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Category label for metrics and log grouping.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::InvalidToken | Self::InvalidCredentials | Self::UserDisabled => "authentication",
            Self::NoPermission => "authorization",
            Self::NotFound | Self::DuplicateName | Self::RoleInUse => "business",
            Self::Backend => "backend",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Main Error Type
// ═══════════════════════════════════════════════════════════════════════════════

/// The crate-wide error type.
#[derive(Error, Debug)]
pub struct GateError {
    /// Machine-readable error code.
    code: ErrorCode,

    /// Client-safe message.
    user_message: Cow<'static, str>,

    /// Internal message, logged but never serialized to clients.
    internal_message: Option<String>,

    /// The underlying error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.user_message)?;
        if let Some(ref internal) = self.internal_message {
            write!(f, " (internal: {})", internal)?;
        }
        Ok(())
    }
}

impl GateError {
    /// Create a new error with code and client-safe message.
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        let error = Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
            source: None,
        };
        counter!(
            "gatekit_errors_total",
            "code" => error.code.to_string(),
            "category" => error.code.category().to_string(),
        )
        .increment(1);
        error
    }

    /// Create an error carrying an internal message for the logs.
    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal_message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(code, user_message);
        error.internal_message = Some(internal_message.into());
        error
    }

    /// Attach the underlying error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Constructors for the taxonomy
    // ─────────────────────────────────────────────────────────────────────────

    /// Token is malformed, expired, or revoked. Uniform on purpose.
    pub fn invalid_token() -> Self {
        Self::new(ErrorCode::InvalidToken, "Invalid token")
    }

    /// Authenticated but not authorized for this resource.
    pub fn no_permission() -> Self {
        Self::new(ErrorCode::NoPermission, "No permission")
    }

    /// Entity absent. The entity kind is client-visible, the id is not.
    pub fn not_found(entity: &'static str) -> Self {
        Self::new(ErrorCode::NotFound, format!("{} not found", entity))
    }

    /// Role name collides with an existing non-deleted role.
    pub fn duplicate_name(name: &str) -> Self {
        Self::with_internal(
            ErrorCode::DuplicateName,
            "A role with this name already exists",
            format!("duplicate role name: {}", name),
        )
    }

    /// Role deletion blocked because users still hold it.
    pub fn role_in_use() -> Self {
        Self::new(
            ErrorCode::RoleInUse,
            "The role is assigned to users and cannot be deleted",
        )
    }

    /// Login failed. Never reveals whether the subject exists.
    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials, "Invalid username or password")
    }

    /// The account is disabled.
    pub fn user_disabled() -> Self {
        Self::new(ErrorCode::UserDisabled, "The account is disabled")
    }

    /// Backend failure with internal context.
    pub fn backend(internal: impl Into<String>) -> Self {
        Self::with_internal(ErrorCode::Backend, "An internal error occurred", internal)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// The machine-readable code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The client-safe message.
    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    /// The internal message, if any.
    pub fn internal_message(&self) -> Option<&str> {
        self.internal_message.as_deref()
    }

    /// HTTP status for this error.
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Log with severity matched to the code category.
    pub fn log(&self) {
        match self.code {
            ErrorCode::Backend => {
                error!(
                    error_code = %self.code,
                    user_message = %self.user_message,
                    internal_message = ?self.internal_message,
                    source = ?self.source,
                    "Backend error"
                );
            }
            ErrorCode::InvalidToken | ErrorCode::NoPermission => {
                debug!(error_code = %self.code, "Request denied");
            }
            _ => {
                warn!(
                    error_code = %self.code,
                    user_message = %self.user_message,
                    "Request rejected"
                );
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// API Response
// ═══════════════════════════════════════════════════════════════════════════════

/// Error payload serialized to API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false` for errors.
    pub success: bool,

    /// Error information.
    pub error: ErrorInfo,
}

/// Client-visible error information.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Machine-readable code.
    pub code: ErrorCode,

    /// Client-safe message.
    pub message: String,
}

impl From<&GateError> for ErrorResponse {
    fn from(error: &GateError) -> Self {
        Self {
            success: false,
            error: ErrorInfo {
                code: error.code,
                message: error.user_message.to_string(),
            },
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.http_status();
        let response = ErrorResponse::from(&self);
        (status, Json(response)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// From Implementations
// ═══════════════════════════════════════════════════════════════════════════════

impl From<sqlx::Error> for GateError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::RowNotFound => Self::not_found("record").with_source(error),
            sqlx::Error::Database(db_err) => {
                // Unique-index violations on grants surface as duplicates.
                if db_err.constraint().is_some() {
                    return Self::with_internal(
                        ErrorCode::DuplicateName,
                        "A record with this identity already exists",
                        format!("constraint violation: {:?}", db_err.constraint()),
                    )
                    .with_source(error);
                }
                Self::backend("database query failed").with_source(error)
            }
            _ => Self::backend("database error").with_source(error),
        }
    }
}

impl From<redis::RedisError> for GateError {
    fn from(error: redis::RedisError) -> Self {
        let internal = if error.is_connection_refusal() || error.is_connection_dropped() {
            "token store connection failed"
        } else if error.is_timeout() {
            "token store operation timed out"
        } else {
            "token store error"
        };
        Self::backend(internal).with_source(error)
    }
}

impl From<serde_json::Error> for GateError {
    fn from(error: serde_json::Error) -> Self {
        Self::backend("failed to process JSON data").with_source(error)
    }
}

impl From<config::ConfigError> for GateError {
    fn from(error: config::ConfigError) -> Self {
        Self::backend(format!("configuration error: {}", error))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::InvalidToken.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::NoPermission.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::DuplicateName.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::RoleInUse.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::Backend.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_message_not_serialized() {
        let error = GateError::duplicate_name("admin");
        let response = ErrorResponse::from(&error);
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains("DUPLICATE_NAME"));
        assert!(!json.contains("admin"));
    }

    #[test]
    fn test_invalid_token_is_uniform() {
        // Malformed, expired, and revoked all surface the same way.
        let error = GateError::invalid_token();
        assert_eq!(error.code(), ErrorCode::InvalidToken);
        assert_eq!(error.user_message(), "Invalid token");
    }

    #[test]
    fn test_error_display_includes_internal() {
        let error = GateError::with_internal(
            ErrorCode::Backend,
            "An internal error occurred",
            "connection refused: localhost:5432",
        );

        let display = format!("{}", error);
        assert!(display.contains("Backend"));
        assert!(display.contains("connection refused"));
    }

    #[test]
    fn test_sqlx_row_not_found_maps_to_not_found() {
        let error = GateError::from(sqlx::Error::RowNotFound);
        assert_eq!(error.code(), ErrorCode::NotFound);
    }
}

// ── Core error types ──
//
// User-facing errors from diradmin-core. Callers never match on reqwest
// errors or raw HTTP status codes; the `From<diradmin_api::Error>` impl
// translates transport-layer failures into these variants.

use thiserror::Error;

use crate::model::AccountType;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to panel at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Unexpected content type from {url}: {snippet:?}")]
    UnexpectedContentType { url: String, snippet: String },

    // ── Panel errors ─────────────────────────────────────────────────
    /// The panel reported a failure through its `error` field.
    #[error("API error: {details} ({text})")]
    Api { details: String, text: String },

    #[error("Panel returned HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Decode error: {message}")]
    Decode { message: String },

    // ── Account model errors ─────────────────────────────────────────
    #[error("Context mismatch: expected a {expected} account, server reports {actual}")]
    ContextMismatch {
        expected: AccountType,
        actual: AccountType,
    },

    #[error("Unknown user type '{usertype}'")]
    UnknownUserType { usertype: String },

    #[error("Insufficient privilege for {operation}: requires {required} context")]
    InsufficientPrivilege {
        operation: String,
        required: AccountType,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<diradmin_api::Error> for CoreError {
    fn from(err: diradmin_api::Error) -> Self {
        use diradmin_api::Error as ApiError;

        match err {
            ApiError::InvalidCredential { reason } => CoreError::Config {
                message: format!("Invalid credential: {reason}"),
            },
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::Connection { uri, source, .. } => CoreError::ConnectionFailed {
                url: uri,
                reason: source.to_string(),
            },
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::HttpStatus { uri, status, .. } => CoreError::HttpStatus { url: uri, status },
            ApiError::UnexpectedContentType { uri, snippet, .. } => {
                CoreError::UnexpectedContentType { url: uri, snippet }
            }
            ApiError::Api { details, text } => CoreError::Api { details, text },
            ApiError::Decode { message } => CoreError::Decode { message },
        }
    }
}

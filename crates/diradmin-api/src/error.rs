use thiserror::Error;

/// Top-level error type for the `diradmin-api` crate.
///
/// Covers every failure mode below the context layer: credential parsing,
/// transport, content negotiation, panel-reported errors, and decoding.
/// `diradmin-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Credentials ─────────────────────────────────────────────────
    /// The qualified username could not be split into account names.
    #[error("Invalid credential: {reason}")]
    InvalidCredential { reason: String },

    /// The panel rejected the credentials (HTTP 401/403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Network-level failure (DNS, TCP, TLS, timeout). Never retried here.
    #[error("{method} request to {uri} failed: {source}")]
    Connection {
        method: String,
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-success status that did not carry a panel error payload.
    #[error("{method} to {uri} returned HTTP {status}: {snippet}")]
    HttpStatus {
        method: String,
        uri: String,
        status: u16,
        snippet: String,
    },

    // ── Content ─────────────────────────────────────────────────────
    /// The panel answered with an HTML page where structured data was
    /// expected. Usually a wrong base URL, a proxy, or a login page.
    #[error("DirectAdmin API returned text/html to {method} {uri} containing {snippet:?}")]
    UnexpectedContentType {
        method: String,
        uri: String,
        snippet: String,
    },

    /// The panel reported an explicit failure through its `error` field.
    #[error("API error: {details} ({text})")]
    Api { details: String, text: String },

    /// The body matched neither the key=value nor the JSON encoding, or a
    /// value could not be coerced to the requested type.
    #[error("Decode error: {message}")]
    Decode { message: String },
}

impl Error {
    /// Returns `true` if the error came from the network layer.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Returns `true` if the panel itself reported the failure.
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

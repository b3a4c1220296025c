// ── Runtime connection configuration ──
//
// Describes *how* to reach a panel: URL, credentials and transport tuning.
// Never touches disk; `diradmin-config` builds one of these from a profile.

use std::time::Duration;

use diradmin_api::transport::{TlsMode, TransportConfig};
use diradmin_api::{ApiEndpoints, Connection};
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed panel certificates).
    DangerAcceptInvalid,
}

/// Configuration for connecting to one panel as one account.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Panel URL (e.g., `https://panel.example.com:2222`).
    pub url: Url,
    /// Account name, optionally qualified as `owner|account`.
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
    pub endpoints: ApiEndpoints,
}

impl ConnectionConfig {
    pub fn new(url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            url,
            username: username.into(),
            password,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            endpoints: ApiEndpoints::default(),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }

    /// Build the connection. No request is made.
    pub fn connection(&self) -> Result<Connection, CoreError> {
        let connection = Connection::with_transport(
            self.url.as_str(),
            &self.username,
            self.password.clone(),
            &self.transport(),
        )?;
        Ok(connection.with_endpoints(self.endpoints.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn qualified_username_yields_managed_connection() {
        let config = ConnectionConfig::new(
            "https://panel.example.com:2222".parse().unwrap(),
            "admin|bob",
            SecretString::from("secret".to_string()),
        );
        let connection = config.connection().unwrap();
        assert!(connection.is_managed());
        assert_eq!(connection.acting_user(), "bob");
        assert_eq!(connection.base_url().as_str(), "https://panel.example.com:2222/");
    }

    #[test]
    fn empty_username_is_a_config_error() {
        let config = ConnectionConfig::new(
            "https://panel.example.com:2222".parse().unwrap(),
            "",
            SecretString::from("secret".to_string()),
        );
        assert!(matches!(config.connection(), Err(CoreError::Config { .. })));
    }
}

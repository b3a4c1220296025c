// Authenticated connection to one panel account
//
// A `Connection` pairs a `Credential` with a shared `reqwest::Client`.
// Every request carries HTTP Basic auth; impersonation is expressed purely
// through the username (`owner|account`), so `login_as` is a local
// operation and the first request under the new identity is the only
// round-trip it ever costs.

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::codec::{ResponseCodec, html_snippet};
use crate::credential::Credential;
use crate::error::Error;
use crate::transport::TransportConfig;

pub use reqwest::Method;

/// Path prefixes for the two API surfaces, relative to the panel root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    /// Prefix for key=value commands, e.g. `CMD_API_` + `SHOW_USERS`.
    pub legacy_prefix: String,
    /// Prefix for JSON commands, e.g. `api/` + `version`.
    pub json_prefix: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            legacy_prefix: "CMD_API_".into(),
            json_prefix: "api/".into(),
        }
    }
}

/// Per-request query, body and header options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    json: Option<Value>,
    headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    pub fn form_pairs<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.form
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// JSON body. Takes precedence over form fields when both are set.
    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A session against the panel as one acting account.
///
/// Cheap to clone: the HTTP client, endpoints and codec are shared. Derived
/// connections from [`login_as`](Self::login_as) share them too, but never
/// share credential state.
#[derive(Debug, Clone)]
pub struct Connection {
    http: reqwest::Client,
    credential: Credential,
    endpoints: Arc<ApiEndpoints>,
    codec: Arc<ResponseCodec>,
}

impl Connection {
    /// Connect with default transport settings.
    ///
    /// `username` may be qualified as `owner|account` to start out managed.
    pub fn new(base_url: &str, username: &str, secret: SecretString) -> Result<Self, Error> {
        Self::with_transport(base_url, username, secret, &TransportConfig::default())
    }

    /// Connect with an explicit transport configuration.
    pub fn with_transport(
        base_url: &str,
        username: &str,
        secret: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let url = Url::parse(base_url)?;
        let credential = Credential::parse(url, username, secret)?;
        let http = transport.build_client()?;
        Ok(Self::with_client(http, credential))
    }

    /// Wrap a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, credential: Credential) -> Self {
        Self {
            http,
            credential,
            endpoints: Arc::new(ApiEndpoints::default()),
            codec: Arc::new(ResponseCodec::default()),
        }
    }

    pub fn with_endpoints(mut self, endpoints: ApiEndpoints) -> Self {
        self.endpoints = Arc::new(endpoints);
        self
    }

    pub fn with_codec(mut self, codec: ResponseCodec) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    // ── Identity ────────────────────────────────────────────────────

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn authenticated_user(&self) -> &str {
        self.credential.authenticated_user()
    }

    /// The account this connection acts as.
    pub fn acting_user(&self) -> &str {
        self.credential.acting_user()
    }

    pub fn base_url(&self) -> &Url {
        self.credential.base_url()
    }

    pub fn is_managed(&self) -> bool {
        self.credential.is_managed()
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    pub fn codec(&self) -> &ResponseCodec {
        &self.codec
    }

    /// A connection acting as `username` under the same authenticated
    /// account and secret. No request is made.
    pub fn login_as(&self, username: &str) -> Self {
        debug!(
            authenticated = self.authenticated_user(),
            acting = username,
            "deriving managed connection"
        );
        Self {
            http: self.http.clone(),
            credential: self.credential.login_as(username),
            endpoints: Arc::clone(&self.endpoints),
            codec: Arc::clone(&self.codec),
        }
    }

    // ── Requests ────────────────────────────────────────────────────

    /// Invoke a key=value command: `<base>/CMD_API_<command>`.
    pub async fn invoke(
        &self,
        method: Method,
        command: &str,
        options: RequestOptions,
    ) -> Result<Value, Error> {
        let path = format!("{}{command}", self.endpoints.legacy_prefix);
        self.request(method, &path, options).await
    }

    /// Invoke a JSON command: `<base>/api/<command>`.
    pub async fn invoke_api(
        &self,
        method: Method,
        command: &str,
        options: RequestOptions,
    ) -> Result<Value, Error> {
        let path = format!("{}{command}", self.endpoints.json_prefix);
        self.request(method, &path, options).await
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, Error> {
        let url = self.credential.base_url().join(path)?;
        debug!(%method, %url, acting = self.acting_user(), "invoking panel API");

        let mut builder = self.http.request(method.clone(), url.clone()).basic_auth(
            self.credential.wire_username(),
            Some(self.credential.secret().expose_secret()),
        );
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &options.json {
            builder = builder.json(body);
        } else if !options.form.is_empty() {
            builder = builder.form(&options.form);
        }

        let resp = builder.send().await.map_err(|source| Error::Connection {
            method: method.to_string(),
            uri: url.to_string(),
            source,
        })?;

        self.handle_response(&method, &url, resp).await
    }

    async fn handle_response(
        &self,
        method: &Method,
        url: &Url,
        resp: reqwest::Response,
    ) -> Result<Value, Error> {
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let body = resp.text().await.map_err(|source| Error::Connection {
            method: method.to_string(),
            uri: url.to_string(),
            source,
        })?;

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(Error::Authentication {
                message: format!(
                    "{method} to {url} rejected the credentials for {}",
                    self.credential.wire_username()
                ),
            });
        }

        if content_type.starts_with("text/html") {
            let snippet = html_snippet(&body);
            warn!(%method, %url, %status, "panel answered with text/html");
            return Err(Error::UnexpectedContentType {
                method: method.to_string(),
                uri: url.to_string(),
                snippet,
            });
        }

        if !status.is_success() {
            return match self.codec.decode(&body) {
                Err(api @ Error::Api { .. }) => Err(api),
                _ => Err(Error::HttpStatus {
                    method: method.to_string(),
                    uri: url.to_string(),
                    status: status.as_u16(),
                    snippet: body.chars().take(200).collect(),
                }),
            };
        }

        self.codec.decode(&body).inspect_err(|e| {
            debug!(%method, %url, error = %e, "panel response rejected");
        })
    }
}

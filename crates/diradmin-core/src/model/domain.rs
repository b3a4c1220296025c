// ── Domain entity ──
//
// `ADDITIONAL_DOMAINS` maps each domain name to a second url-encoded blob
// of settings. Usage figures arrive as `used:limit` pairs where the limit
// may be the unlimited sentinel.

use diradmin_api::codec::parse_query;
use diradmin_api::conversion::{to_amount, to_bool, to_limit};
use diradmin_api::{ResponseCodec, UNLIMITED};
use serde_json::{Map, Value};

use crate::context::ContextHandle;
use crate::error::CoreError;

/// A domain hosted by an account.
#[derive(Debug, Clone)]
pub struct Domain {
    name: String,
    owner: String,
    config: Map<String, Value>,
    bandwidth_used: f64,
    bandwidth_limit: Option<f64>,
    disk_used: f64,
    disk_limit: Option<f64>,
    ssl: bool,
    php: bool,
    cgi: bool,
    suspended: bool,
    default: bool,
    context: ContextHandle,
}

impl Domain {
    /// Build from one `ADDITIONAL_DOMAINS` entry.
    pub(crate) fn from_listing(
        name: &str,
        owner: &str,
        raw: &Value,
        codec: &ResponseCodec,
        context: &ContextHandle,
    ) -> Result<Self, CoreError> {
        let config = match raw {
            Value::String(text) => match codec.sanitize(Value::Object(parse_query(text))) {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };

        let (bandwidth_used, bandwidth_limit) = usage_pair(config.get("bandwidth"))?;
        let (disk_used, disk_limit) = usage_pair(config.get("quota"))?;

        Ok(Self {
            name: name.to_owned(),
            owner: owner.to_owned(),
            bandwidth_used,
            bandwidth_limit,
            disk_used,
            disk_limit,
            ssl: to_bool(config.get("ssl"))?,
            php: to_bool(config.get("php"))?,
            cgi: to_bool(config.get("cgi"))?,
            suspended: to_bool(config.get("suspended"))?,
            default: to_bool(config.get("defaultdomain"))?,
            config,
            context: context.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The raw settings blob, sanitized.
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    /// Bandwidth used this period, in megabytes.
    pub fn bandwidth_used(&self) -> f64 {
        self.bandwidth_used
    }

    /// `None` when the domain shares the account's limit or is unlimited.
    pub fn bandwidth_limit(&self) -> Option<f64> {
        self.bandwidth_limit
    }

    pub fn disk_used(&self) -> f64 {
        self.disk_used
    }

    pub fn disk_limit(&self) -> Option<f64> {
        self.disk_limit
    }

    pub fn has_ssl(&self) -> bool {
        self.ssl
    }

    pub fn has_php(&self) -> bool {
        self.php
    }

    pub fn has_cgi(&self) -> bool {
        self.cgi
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Whether this is the owner's default domain.
    pub fn is_default(&self) -> bool {
        self.default
    }

    /// The owner's self-managed context.
    pub fn context(&self) -> &ContextHandle {
        &self.context
    }
}

/// Parse `used:limit`. A bare value is usage with no limit.
fn usage_pair(value: Option<&Value>) -> Result<(f64, Option<f64>), CoreError> {
    let Some(Value::String(text)) = value else {
        return Ok((to_amount(value)?, None));
    };
    let Some((used, limit)) = text.split_once(':') else {
        return Ok((to_amount(value)?, None));
    };

    let used = to_amount(Some(&Value::String(used.to_owned())))?;
    let limit = if limit.is_empty() || limit == UNLIMITED {
        None
    } else {
        to_limit(Some(&Value::String(limit.to_owned())))?
    };
    Ok((used, limit))
}

/// Parameters for [`User::create_domain`](super::User::create_domain).
///
/// Unset limits share the account's allowance; unset flags follow the
/// account's own settings.
#[derive(Debug, Clone, Default)]
pub struct NewDomain {
    pub name: String,
    pub bandwidth_limit: Option<f64>,
    pub disk_limit: Option<f64>,
    pub ssl: Option<bool>,
    pub php: Option<bool>,
    pub cgi: Option<bool>,
}

impl NewDomain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn bandwidth_limit(mut self, megabytes: f64) -> Self {
        self.bandwidth_limit = Some(megabytes);
        self
    }

    pub fn disk_limit(mut self, megabytes: f64) -> Self {
        self.disk_limit = Some(megabytes);
        self
    }

    pub fn ssl(mut self, enabled: bool) -> Self {
        self.ssl = Some(enabled);
        self
    }

    pub fn php(mut self, enabled: bool) -> Self {
        self.php = Some(enabled);
        self
    }

    pub fn cgi(mut self, enabled: bool) -> Self {
        self.cgi = Some(enabled);
        self
    }
}

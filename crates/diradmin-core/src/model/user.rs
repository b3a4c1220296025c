// ── User entity ──
//
// The base account type. Resellers and admins wrap a `User`, so every
// operation here is available on every tier. Reads go through the entity's
// `ObjectCache`; any mutation clears it wholesale.

use std::sync::Arc;

use diradmin_api::conversion::{
    on_off, process_unlimited_options, to_amount, to_bool, to_count, to_count_limit, to_form_pairs,
    to_limit, to_text,
};
use diradmin_api::{Method, RequestOptions};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tracing::debug;

use crate::cache::{CacheCategory, ObjectCache};
use crate::context::{ContextHandle, UserContext};
use crate::error::CoreError;

use super::cron::{CronTable, split_schedule};
use super::database::Database;
use super::domain::{Domain, NewDomain};
use super::AccountType;

// ── UserState ────────────────────────────────────────────────────

/// Identity and cache of one account, shared by every clone of the entity.
#[derive(Debug)]
pub(crate) struct UserState {
    name: String,
    kind: AccountType,
    cache: ObjectCache,
}

impl UserState {
    pub(crate) fn new(name: String, kind: AccountType) -> Self {
        Self {
            name,
            kind,
            cache: ObjectCache::new(),
        }
    }

    /// Dispatch strictly on `usertype` and keep `config` as the preloaded config.
    pub(crate) fn from_config(config: Value) -> Result<Self, CoreError> {
        let usertype = config
            .get("usertype")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let kind = usertype
            .parse::<AccountType>()
            .map_err(|_| CoreError::UnknownUserType {
                usertype: usertype.to_owned(),
            })?;

        let name = config
            .get("username")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| CoreError::decode("user config carries no username"))?
            .to_owned();

        let state = Self::new(name, kind);
        state.cache.store(CacheCategory::Config, config);
        Ok(state)
    }
}

// ── User ─────────────────────────────────────────────────────────

/// A panel account viewed through some context.
///
/// Cheap to clone; clones share one cache.
#[derive(Debug, Clone)]
pub struct User {
    state: Arc<UserState>,
    context: ContextHandle,
}

impl User {
    /// A not-yet-loaded account of the given tier.
    pub fn new(name: impl Into<String>, kind: AccountType, context: &ContextHandle) -> Self {
        Self::from_state(Arc::new(UserState::new(name.into(), kind)), context.clone())
    }

    pub(crate) fn from_state(state: Arc<UserState>, context: ContextHandle) -> Self {
        Self { state, context }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// The tier this entity was built as.
    pub fn kind(&self) -> AccountType {
        self.state.kind
    }

    /// The context this entity was loaded through.
    pub fn context(&self) -> &ContextHandle {
        &self.context
    }

    pub fn cache(&self) -> &ObjectCache {
        &self.state.cache
    }

    pub fn clear_cache(&self) {
        debug!(user = self.name(), "clearing entity cache");
        self.state.cache.invalidate(None);
    }

    // ── Cached reads ─────────────────────────────────────────────

    /// The full account configuration.
    pub async fn config(&self) -> Result<Arc<Value>, CoreError> {
        self.state
            .cache
            .get_or_load_whole(CacheCategory::Config, || self.load_config())
            .await
    }

    /// One configuration item, or `None` when the panel does not report it.
    pub async fn get_config(&self, key: &str) -> Result<Option<Value>, CoreError> {
        self.state
            .cache
            .get_or_load(CacheCategory::Config, key, || self.load_config())
            .await
    }

    /// One usage statistic, or `None` when the panel does not report it.
    pub async fn get_usage(&self, key: &str) -> Result<Option<Value>, CoreError> {
        self.state
            .cache
            .get_or_load(CacheCategory::Usage, key, || self.load_usage())
            .await
    }

    async fn load_config(&self) -> Result<Value, CoreError> {
        self.context
            .invoke_get("SHOW_USER_CONFIG", &[("user", self.name())])
            .await
    }

    async fn load_usage(&self) -> Result<Value, CoreError> {
        self.context
            .invoke_get("SHOW_USER_USAGE", &[("user", self.name())])
            .await
    }

    // ── Typed getters ────────────────────────────────────────────

    pub async fn email(&self) -> Result<Option<String>, CoreError> {
        Ok(to_text(self.get_config("email").await?.as_ref()))
    }

    /// The server-reported tier.
    pub async fn account_type(&self) -> Result<AccountType, CoreError> {
        let usertype = to_text(self.get_config("usertype").await?.as_ref()).unwrap_or_default();
        usertype
            .parse()
            .map_err(|_| CoreError::UnknownUserType { usertype })
    }

    /// Bandwidth limit in megabytes; `None` is unlimited.
    pub async fn bandwidth_limit(&self) -> Result<Option<f64>, CoreError> {
        Ok(to_limit(self.get_config("bandwidth").await?.as_ref())?)
    }

    /// Current period's bandwidth usage in megabytes.
    pub async fn bandwidth_usage(&self) -> Result<f64, CoreError> {
        Ok(to_amount(self.get_usage("bandwidth").await?.as_ref())?)
    }

    /// Disk quota in megabytes; `None` is unlimited.
    pub async fn disk_limit(&self) -> Result<Option<f64>, CoreError> {
        Ok(to_limit(self.get_config("quota").await?.as_ref())?)
    }

    pub async fn disk_usage(&self) -> Result<f64, CoreError> {
        Ok(to_amount(self.get_usage("quota").await?.as_ref())?)
    }

    pub async fn database_limit(&self) -> Result<Option<u64>, CoreError> {
        Ok(to_count_limit(self.get_config("mysql").await?.as_ref())?)
    }

    pub async fn database_usage(&self) -> Result<u64, CoreError> {
        Ok(to_count(self.get_usage("mysql").await?.as_ref())?)
    }

    pub async fn domain_limit(&self) -> Result<Option<u64>, CoreError> {
        Ok(to_count_limit(self.get_config("vdomains").await?.as_ref())?)
    }

    pub async fn domain_usage(&self) -> Result<u64, CoreError> {
        Ok(to_count(self.get_usage("vdomains").await?.as_ref())?)
    }

    pub async fn is_suspended(&self) -> Result<bool, CoreError> {
        Ok(to_bool(self.get_config("suspended").await?.as_ref())?)
    }

    pub async fn has_cgi(&self) -> Result<bool, CoreError> {
        Ok(to_bool(self.get_config("cgi").await?.as_ref())?)
    }

    pub async fn has_php(&self) -> Result<bool, CoreError> {
        Ok(to_bool(self.get_config("php").await?.as_ref())?)
    }

    pub async fn has_ssl(&self) -> Result<bool, CoreError> {
        Ok(to_bool(self.get_config("ssl").await?.as_ref())?)
    }

    /// The account's default domain, if it has one.
    pub async fn default_domain(&self) -> Result<Option<Domain>, CoreError> {
        match to_text(self.get_config("domain").await?.as_ref()) {
            Some(name) => self.domain(&name).await,
            None => Ok(None),
        }
    }

    // ── Mutation ─────────────────────────────────────────────────

    /// Apply `changes` on top of the current configuration.
    ///
    /// A `null` value sets the key to unlimited. The whole entity cache is
    /// cleared after the panel accepts the change.
    pub async fn modify_config(&self, changes: Map<String, Value>) -> Result<(), CoreError> {
        let current = self.config().await?;
        let mut merged = current.as_object().cloned().unwrap_or_default();
        merged.extend(changes);
        process_unlimited_options(&mut merged);
        merged.remove("action");
        merged.remove("user");

        let mut form = to_form_pairs(&merged);
        form.push(("action".into(), "customize".into()));
        form.push(("user".into(), self.name().to_owned()));

        self.context
            .invoke(
                Method::POST,
                "MODIFY_USER",
                RequestOptions::new().form_pairs(form),
            )
            .await?;
        self.clear_cache();
        Ok(())
    }

    pub async fn set_allow_catchall(&self, allow: bool) -> Result<(), CoreError> {
        self.modify_single("catchall", Value::String(on_off(allow).to_owned()))
            .await
    }

    /// `None` removes the limit.
    pub async fn set_bandwidth_limit(&self, megabytes: Option<f64>) -> Result<(), CoreError> {
        self.modify_single("bandwidth", limit_value(megabytes)?).await
    }

    /// `None` removes the limit.
    pub async fn set_disk_limit(&self, megabytes: Option<f64>) -> Result<(), CoreError> {
        self.modify_single("quota", limit_value(megabytes)?).await
    }

    /// `None` removes the limit.
    pub async fn set_domain_limit(&self, domains: Option<u64>) -> Result<(), CoreError> {
        let value = domains.map_or(Value::Null, |n| Value::String(n.to_string()));
        self.modify_single("vdomains", value).await
    }

    async fn modify_single(&self, key: &str, value: Value) -> Result<(), CoreError> {
        let mut changes = Map::new();
        changes.insert(key.to_owned(), value);
        self.modify_config(changes).await
    }

    // ── Impersonation ────────────────────────────────────────────

    /// Whether the context acts as this very account.
    pub fn is_self_managed(&self) -> bool {
        self.name() == self.context.username()
    }

    /// Act as this account. Requires a context at least one tier above it.
    ///
    /// Only plain user accounts yield a `UserContext`; resellers go through
    /// [`Reseller::impersonate`](crate::model::Reseller::impersonate).
    pub async fn impersonate(&self, validate: bool) -> Result<UserContext, CoreError> {
        self.require_manager("impersonate")?;
        if self.kind() != AccountType::User {
            return Err(CoreError::ContextMismatch {
                expected: AccountType::User,
                actual: self.kind(),
            });
        }
        UserContext::new(self.context.connection().login_as(self.name()), validate).await
    }

    /// The context acting as this account: the owning context itself when
    /// self-managed, otherwise a fresh impersonated one.
    pub fn get_self_managed_context(&self) -> Result<ContextHandle, CoreError> {
        if self.is_self_managed() {
            return Ok(self.context.clone());
        }
        self.require_manager("impersonate")?;
        Ok(self.context.derive(self.name(), self.kind()))
    }

    pub(crate) fn require_manager(&self, operation: &str) -> Result<(), CoreError> {
        let Some(required) = self.kind().manager() else {
            return Err(CoreError::InsufficientPrivilege {
                operation: format!("{operation} admin account {}", self.name()),
                required: AccountType::Admin,
            });
        };
        self.context.require(required, operation)
    }

    // ── Cron jobs ────────────────────────────────────────────────

    pub async fn cronjobs(&self) -> Result<CronTable, CoreError> {
        let context = self.get_self_managed_context()?;
        let value = context.invoke_post("CRON_JOBS", &[]).await?;
        CronTable::from_response(&value)
    }

    /// Add a job. `schedule` is the five cron time fields.
    pub async fn add_cronjob(&self, schedule: &str, command: &str) -> Result<(), CoreError> {
        let [minute, hour, dayofmonth, month, dayofweek] = split_schedule(schedule)?;
        let context = self.get_self_managed_context()?;
        context
            .invoke_post(
                "CRON_JOBS",
                &[
                    ("action", "create"),
                    ("minute", minute),
                    ("hour", hour),
                    ("dayofmonth", dayofmonth),
                    ("month", month),
                    ("dayofweek", dayofweek),
                    ("command", command),
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn delete_cronjob(&self, id: &str) -> Result<(), CoreError> {
        let context = self.get_self_managed_context()?;
        context
            .invoke_post("CRON_JOBS", &[("action", "delete"), ("select0", id)])
            .await?;
        Ok(())
    }

    /// Where cron output is mailed (`MAILTO`).
    pub async fn set_cronjobs_mailto(&self, email: &str) -> Result<(), CoreError> {
        let context = self.get_self_managed_context()?;
        context
            .invoke_post("CRON_JOBS", &[("action", "saveemail"), ("email", email)])
            .await?;
        Ok(())
    }

    // ── Databases ────────────────────────────────────────────────

    pub async fn databases(&self) -> Result<Vec<Database>, CoreError> {
        let context = self.get_self_managed_context()?;
        let names = self
            .state
            .cache
            .get_or_load_whole(CacheCategory::Databases, || async {
                let listed = context.invoke_get("DATABASES", &[]).await?;
                self.own_databases(&listed)
            })
            .await?;

        Ok(names
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .map(|db| Database::new(db, self.name(), &context))
            .collect())
    }

    /// Strip the owner prefix from every listed database, rejecting strangers.
    fn own_databases(&self, listed: &Value) -> Result<Value, CoreError> {
        let Value::Array(items) = listed else {
            return Ok(Value::Array(Vec::new()));
        };
        items
            .iter()
            .filter_map(Value::as_str)
            .map(|full_name| match full_name.split_once('_') {
                Some((owner, db)) if owner == self.name() => Ok(Value::String(db.to_owned())),
                _ => Err(CoreError::decode(format!(
                    "database {full_name} is not owned by {}",
                    self.name()
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    /// Create `<user>_<name>`, accessed by `<user>_<db_user>`.
    ///
    /// With a password the database user is created as well; without one it
    /// must already exist.
    pub async fn create_database(
        &self,
        name: &str,
        db_user: &str,
        password: Option<&SecretString>,
    ) -> Result<Database, CoreError> {
        let context = self.get_self_managed_context()?;
        let mut form = vec![("action", "create"), ("name", name)];
        match password {
            Some(password) => {
                let secret = password.expose_secret();
                form.extend([("user", db_user), ("passwd", secret), ("passwd2", secret)]);
            }
            None => form.push(("userlist", db_user)),
        }
        context.invoke_post("DATABASES", &form).await?;
        self.clear_cache();
        Ok(Database::new(name, self.name(), &context))
    }

    // ── Domains ──────────────────────────────────────────────────

    pub async fn domains(&self) -> Result<Vec<Domain>, CoreError> {
        let context = self.get_self_managed_context()?;
        let listed = self
            .state
            .cache
            .get_or_load_whole(CacheCategory::Domains, || {
                context.invoke_get("ADDITIONAL_DOMAINS", &[])
            })
            .await?;

        let codec = context.connection().codec();
        match listed.as_ref() {
            Value::Object(map) => map
                .iter()
                .map(|(name, raw)| Domain::from_listing(name, self.name(), raw, codec, &context))
                .collect(),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn domain(&self, name: &str) -> Result<Option<Domain>, CoreError> {
        Ok(self
            .domains()
            .await?
            .into_iter()
            .find(|domain| domain.name() == name))
    }

    /// Create a domain under this account and return it as listed afterwards.
    ///
    /// Feature flags left unset follow the account's own settings.
    pub async fn create_domain(&self, new: &NewDomain) -> Result<Domain, CoreError> {
        let ssl = match new.ssl {
            Some(ssl) => ssl,
            None => self.has_ssl().await?,
        };
        let php = match new.php {
            Some(php) => php,
            None => self.has_php().await?,
        };
        let cgi = match new.cgi {
            Some(cgi) => cgi,
            None => self.has_cgi().await?,
        };

        let bandwidth = new.bandwidth_limit.map(format_megabytes);
        let quota = new.disk_limit.map(format_megabytes);

        let mut form = vec![("action", "create"), ("domain", new.name.as_str())];
        match &bandwidth {
            Some(limit) => form.push(("bandwidth", limit.as_str())),
            None => form.push(("ubandwidth", "ON")),
        }
        match &quota {
            Some(limit) => form.push(("quota", limit.as_str())),
            None => form.push(("uquota", "ON")),
        }
        form.extend([("ssl", on_off(ssl)), ("php", on_off(php)), ("cgi", on_off(cgi))]);

        let context = self.get_self_managed_context()?;
        context.invoke_post("DOMAIN", &form).await?;
        self.clear_cache();

        self.domain(&new.name)
            .await?
            .ok_or_else(|| CoreError::ValidationFailed {
                message: format!("domain {} not listed after creation", new.name),
            })
    }
}

fn limit_value(megabytes: Option<f64>) -> Result<Value, CoreError> {
    match megabytes {
        None => Ok(Value::Null),
        Some(mb) if mb.is_finite() && mb >= 0.0 => Ok(Value::String(format_megabytes(mb))),
        Some(mb) => Err(CoreError::ValidationFailed {
            message: format!("invalid limit: {mb}"),
        }),
    }
}

/// Megabytes as the panel expects them; whole values print without a fraction.
fn format_megabytes(mb: f64) -> String {
    mb.to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn state_dispatches_on_usertype() {
        let state =
            UserState::from_config(json!({"usertype": "reseller", "username": "r1"})).ok();
        let state = state.map(|s| (s.name, s.kind));
        assert_eq!(state, Some(("r1".to_owned(), AccountType::Reseller)));
    }

    #[test]
    fn unknown_usertype_is_rejected() {
        let err = UserState::from_config(json!({"usertype": "alien", "username": "x"}));
        assert!(matches!(
            err,
            Err(CoreError::UnknownUserType { ref usertype }) if usertype == "alien"
        ));
    }

    #[test]
    fn limits_format_without_trailing_zeroes() {
        assert_eq!(format_megabytes(500.0), "500");
        assert_eq!(format_megabytes(1.5), "1.5");
        assert!(matches!(limit_value(None), Ok(Value::Null)));
        assert!(limit_value(Some(f64::NAN)).is_err());
        assert!(limit_value(Some(-1.0)).is_err());
    }
}

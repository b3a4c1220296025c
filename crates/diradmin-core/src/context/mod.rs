// ── Role-scoped contexts ──
//
// A context wraps exactly one `Connection` and lazily resolves the account
// it acts as. The three concrete contexts differ only in which operations
// they expose: reseller-level calls live behind `ResellerCapable`, which
// user contexts do not implement, and admin-only calls are inherent to
// `AdminContext`.

mod admin;
mod reseller;
mod user;

use std::future::Future;
use std::sync::Arc;

use diradmin_api::{Connection, Method, RequestOptions};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::model::{Account, AccountType, User, UserState};

pub use admin::AdminContext;
pub use reseller::ResellerContext;
pub use user::UserContext;

// ── ContextHandle ────────────────────────────────────────────────

/// Shared state behind every context and every entity loaded through it.
///
/// Cheaply cloneable via `Arc`. Clones compare equal under
/// [`same_as`](Self::same_as); impersonation always builds a new handle.
#[derive(Debug, Clone)]
pub struct ContextHandle {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    connection: Connection,
    /// The tier this context was opened as.
    role: AccountType,
    /// The acting account, resolved on first use.
    root: OnceCell<Arc<UserState>>,
}

impl ContextHandle {
    pub(crate) fn new(connection: Connection, role: AccountType) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                connection,
                role,
                root: OnceCell::new(),
            }),
        }
    }

    /// Open a context, checking the server-reported type when `validate` is set.
    pub(crate) async fn establish(
        connection: Connection,
        role: AccountType,
        validate: bool,
    ) -> Result<Self, CoreError> {
        let handle = Self::new(connection, role);
        if validate {
            let actual = handle.account_type().await?;
            if actual != role {
                return Err(CoreError::ContextMismatch {
                    expected: role,
                    actual,
                });
            }
        }
        info!(
            %role,
            authenticated = handle.connection().authenticated_user(),
            acting = handle.username(),
            validated = validate,
            "context established"
        );
        Ok(handle)
    }

    /// A new, unvalidated context acting as `username` on the same credentials.
    pub(crate) fn derive(&self, username: &str, role: AccountType) -> Self {
        debug!(from = self.username(), to = username, %role, "impersonating");
        Self::new(self.inner.connection.login_as(username), role)
    }

    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    /// The tier this context was opened as.
    pub fn role(&self) -> AccountType {
        self.inner.role
    }

    /// The acting account name.
    pub fn username(&self) -> &str {
        self.inner.connection.acting_user()
    }

    /// Whether both handles are the same context instance.
    pub fn same_as(&self, other: &ContextHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The acting account, fetched once per context.
    pub async fn context_user(&self) -> Result<Account, CoreError> {
        let state = self
            .inner
            .root
            .get_or_try_init(|| async {
                let config = self.invoke_get("SHOW_USER_CONFIG", &[]).await?;
                UserState::from_config(config).map(Arc::new)
            })
            .await?;
        Ok(Account::from_state(Arc::clone(state), self.clone()))
    }

    /// The server-reported tier of the acting account.
    pub async fn account_type(&self) -> Result<AccountType, CoreError> {
        Ok(self.context_user().await?.account_type())
    }

    // ── Invocation ───────────────────────────────────────────────

    pub async fn invoke(
        &self,
        method: Method,
        command: &str,
        options: RequestOptions,
    ) -> Result<Value, CoreError> {
        Ok(self.inner.connection.invoke(method, command, options).await?)
    }

    pub async fn invoke_get(
        &self,
        command: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, CoreError> {
        let options = query
            .iter()
            .fold(RequestOptions::new(), |options, (key, value)| {
                options.query(*key, *value)
            });
        self.invoke(Method::GET, command, options).await
    }

    pub async fn invoke_post(
        &self,
        command: &str,
        form: &[(&str, &str)],
    ) -> Result<Value, CoreError> {
        let options = RequestOptions::new().form_pairs(form.iter().copied());
        self.invoke(Method::POST, command, options).await
    }

    /// GET against the JSON surface.
    pub async fn invoke_api_get(&self, command: &str) -> Result<Value, CoreError> {
        Ok(self
            .inner
            .connection
            .invoke_api(Method::GET, command, RequestOptions::new())
            .await?)
    }

    /// Fail unless this context was opened at `required` tier or above.
    pub(crate) fn require(&self, required: AccountType, operation: &str) -> Result<(), CoreError> {
        if self.role() >= required {
            Ok(())
        } else {
            Err(CoreError::InsufficientPrivilege {
                operation: operation.to_owned(),
                required,
            })
        }
    }
}

// ── Context traits ───────────────────────────────────────────────

/// Operations available on every context.
pub trait Context {
    /// The tier this context type represents.
    const ROLE: AccountType;

    fn handle(&self) -> &ContextHandle;

    fn connection(&self) -> &Connection {
        self.handle().connection()
    }

    /// The acting account name.
    fn username(&self) -> &str {
        self.handle().username()
    }

    /// The acting account, fetched once per context.
    fn context_user(&self) -> impl Future<Output = Result<Account, CoreError>> + Send {
        self.handle().context_user()
    }

    /// The server-reported tier of the acting account.
    fn account_type(&self) -> impl Future<Output = Result<AccountType, CoreError>> + Send {
        self.handle().account_type()
    }
}

/// Operations available to resellers and admins.
pub trait ResellerCapable: Context {
    /// Act as one of the managed user accounts.
    fn impersonate_user(
        &self,
        username: &str,
        validate: bool,
    ) -> impl Future<Output = Result<UserContext, CoreError>> + Send {
        let connection = self.connection().login_as(username);
        async move { UserContext::new(connection, validate).await }
    }

    /// Accounts owned by the acting reseller.
    fn users(&self) -> impl Future<Output = Result<Vec<User>, CoreError>> + Send {
        let handle = self.handle().clone();
        async move {
            let names = handle.invoke_get("SHOW_USERS", &[]).await?;
            Ok(names_in(&names)
                .into_iter()
                .map(|name| User::new(name, AccountType::User, &handle))
                .collect())
        }
    }
}

/// Account names from a collapsed `list[]` response.
pub(crate) fn names_in(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

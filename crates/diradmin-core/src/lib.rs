// diradmin-core: Role-scoped contexts and the cached account model.
//
// Sits on top of diradmin-api. A context authenticates once; impersonating
// a lower tier derives a new context from the same credentials without
// another login.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod model;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{CacheCategory, ObjectCache};
pub use config::{ConnectionConfig, TlsVerification};
pub use context::{
    AdminContext, Context, ContextHandle, ResellerCapable, ResellerContext, UserContext,
};
pub use error::CoreError;
pub use model::{
    Account, AccountType, Admin, CronJob, CronTable, Database, Domain, NewDomain, Reseller, User,
};

// ── Entry points ────────────────────────────────────────────────────

/// Open an admin context. With `validate`, the account must be an admin.
pub async fn connect_admin(
    config: &ConnectionConfig,
    validate: bool,
) -> Result<AdminContext, CoreError> {
    AdminContext::new(config.connection()?, validate).await
}

/// Open a reseller context. With `validate`, the account must be a reseller.
pub async fn connect_reseller(
    config: &ConnectionConfig,
    validate: bool,
) -> Result<ResellerContext, CoreError> {
    ResellerContext::new(config.connection()?, validate).await
}

/// Open a user context. With `validate`, the account must be a plain user.
pub async fn connect_user(
    config: &ConnectionConfig,
    validate: bool,
) -> Result<UserContext, CoreError> {
    UserContext::new(config.connection()?, validate).await
}

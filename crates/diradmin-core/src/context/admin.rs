use diradmin_api::Connection;
use serde_json::Value;

use crate::error::CoreError;
use crate::model::{Account, AccountType, Admin, Reseller, User};

use super::{Context, ContextHandle, ResellerCapable, ResellerContext, names_in};

/// Context for an admin account.
#[derive(Debug, Clone)]
pub struct AdminContext {
    handle: ContextHandle,
}

impl AdminContext {
    /// Wrap `connection`. With `validate`, the account must report `usertype=admin`.
    pub async fn new(connection: Connection, validate: bool) -> Result<Self, CoreError> {
        let handle = ContextHandle::establish(connection, Self::ROLE, validate).await?;
        Ok(Self { handle })
    }

    /// The acting account as an admin.
    pub async fn admin(&self) -> Result<Admin, CoreError> {
        match self.context_user().await? {
            Account::Admin(admin) => Ok(admin),
            other => Err(CoreError::ContextMismatch {
                expected: Self::ROLE,
                actual: other.account_type(),
            }),
        }
    }

    /// Act as a reseller account.
    pub async fn impersonate_reseller(
        &self,
        username: &str,
        validate: bool,
    ) -> Result<ResellerContext, CoreError> {
        ResellerContext::new(self.connection().login_as(username), validate).await
    }

    // ── Listings ─────────────────────────────────────────────────

    pub async fn admins(&self) -> Result<Vec<Admin>, CoreError> {
        let names = self.handle.invoke_get("SHOW_ADMINS", &[]).await?;
        Ok(names_in(&names)
            .into_iter()
            .map(|name| Admin::new(name, &self.handle))
            .collect())
    }

    pub async fn resellers(&self) -> Result<Vec<Reseller>, CoreError> {
        let names = self.handle.invoke_get("SHOW_RESELLERS", &[]).await?;
        Ok(names_in(&names)
            .into_iter()
            .map(|name| Reseller::new(name, &self.handle))
            .collect())
    }

    /// Every user account on the server, regardless of owner.
    pub async fn all_users(&self) -> Result<Vec<User>, CoreError> {
        let names = self.handle.invoke_get("SHOW_ALL_USERS", &[]).await?;
        Ok(names_in(&names)
            .into_iter()
            .map(|name| User::new(name, AccountType::User, &self.handle))
            .collect())
    }

    /// Panel version information from the JSON surface.
    pub async fn version(&self) -> Result<Value, CoreError> {
        self.handle.invoke_api_get("version").await
    }
}

impl Context for AdminContext {
    const ROLE: AccountType = AccountType::Admin;

    fn handle(&self) -> &ContextHandle {
        &self.handle
    }
}

impl ResellerCapable for AdminContext {}

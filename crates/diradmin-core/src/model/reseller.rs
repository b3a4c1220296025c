use secrecy::{ExposeSecret, SecretString};

use crate::context::{ContextHandle, ResellerContext, names_in};
use crate::error::CoreError;

use super::{AccountType, User};

/// A reseller account: a `User` that owns other users.
#[derive(Debug, Clone)]
pub struct Reseller {
    user: User,
}

impl Reseller {
    pub fn new(name: impl Into<String>, context: &ContextHandle) -> Self {
        Self::from_user(User::new(name, AccountType::Reseller, context))
    }

    pub(crate) fn from_user(user: User) -> Self {
        Self { user }
    }

    pub fn name(&self) -> &str {
        self.user.name()
    }

    pub fn as_user(&self) -> &User {
        &self.user
    }

    pub fn into_user(self) -> User {
        self.user
    }

    /// Users owned by this reseller.
    pub async fn users(&self) -> Result<Vec<User>, CoreError> {
        let context = self.user.context();
        let names = context
            .invoke_get("SHOW_USERS", &[("reseller", self.name())])
            .await?;
        Ok(names_in(&names)
            .into_iter()
            .map(|name| User::new(name, AccountType::User, context))
            .collect())
    }

    pub async fn user(&self, username: &str) -> Result<Option<User>, CoreError> {
        Ok(self
            .users()
            .await?
            .into_iter()
            .find(|user| user.name() == username))
    }

    pub async fn change_user_password(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<(), CoreError> {
        let secret = password.expose_secret();
        self.user
            .context()
            .invoke_post(
                "USER_PASSWD",
                &[("username", username), ("passwd", secret), ("passwd2", secret)],
            )
            .await?;
        Ok(())
    }

    /// Act as this reseller. Requires an admin context.
    pub async fn impersonate(&self, validate: bool) -> Result<ResellerContext, CoreError> {
        self.user.require_manager("impersonate")?;
        ResellerContext::new(
            self.user.context().connection().login_as(self.name()),
            validate,
        )
        .await
    }
}

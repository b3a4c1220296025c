use diradmin_api::Connection;

use crate::error::CoreError;
use crate::model::{Account, AccountType, Reseller};

use super::{Context, ContextHandle, ResellerCapable};

/// Context for a reseller account.
#[derive(Debug, Clone)]
pub struct ResellerContext {
    handle: ContextHandle,
}

impl ResellerContext {
    /// Wrap `connection`. With `validate`, the account must report `usertype=reseller`.
    pub async fn new(connection: Connection, validate: bool) -> Result<Self, CoreError> {
        let handle = ContextHandle::establish(connection, Self::ROLE, validate).await?;
        Ok(Self { handle })
    }

    /// The acting account as a reseller.
    pub async fn reseller(&self) -> Result<Reseller, CoreError> {
        match self.context_user().await? {
            Account::Reseller(reseller) => Ok(reseller),
            Account::Admin(admin) => Ok(admin.into_reseller()),
            Account::User(_) => Err(CoreError::ContextMismatch {
                expected: Self::ROLE,
                actual: AccountType::User,
            }),
        }
    }
}

impl Context for ResellerContext {
    const ROLE: AccountType = AccountType::Reseller;

    fn handle(&self) -> &ContextHandle {
        &self.handle
    }
}

impl ResellerCapable for ResellerContext {}

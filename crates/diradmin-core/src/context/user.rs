use diradmin_api::Connection;

use crate::error::CoreError;
use crate::model::AccountType;

use super::{Context, ContextHandle};

/// Context for a plain user account.
#[derive(Debug, Clone)]
pub struct UserContext {
    handle: ContextHandle,
}

impl UserContext {
    /// Wrap `connection`. With `validate`, the account must report `usertype=user`.
    pub async fn new(connection: Connection, validate: bool) -> Result<Self, CoreError> {
        let handle = ContextHandle::establish(connection, Self::ROLE, validate).await?;
        Ok(Self { handle })
    }
}

impl Context for UserContext {
    const ROLE: AccountType = AccountType::User;

    fn handle(&self) -> &ContextHandle {
        &self.handle
    }
}

use crate::context::ContextHandle;

use super::{AccountType, Reseller, User};

/// An admin account. Admins can do everything resellers can.
#[derive(Debug, Clone)]
pub struct Admin {
    reseller: Reseller,
}

impl Admin {
    pub fn new(name: impl Into<String>, context: &ContextHandle) -> Self {
        Self::from_reseller(Reseller::from_user(User::new(
            name,
            AccountType::Admin,
            context,
        )))
    }

    pub(crate) fn from_reseller(reseller: Reseller) -> Self {
        Self { reseller }
    }

    pub fn name(&self) -> &str {
        self.reseller.name()
    }

    pub fn as_reseller(&self) -> &Reseller {
        &self.reseller
    }

    pub fn into_reseller(self) -> Reseller {
        self.reseller
    }

    pub fn as_user(&self) -> &User {
        self.reseller.as_user()
    }
}

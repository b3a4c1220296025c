// ── Account model ──
//
// Entities mirror the panel's account tree. Accounts are identified by
// name and hold a handle to the context they were loaded through; they
// never own a `Connection` themselves.

pub mod admin;
pub mod cron;
pub mod database;
pub mod domain;
pub mod reseller;
pub mod user;

use std::sync::Arc;

use serde_json::Value;

use crate::context::ContextHandle;
use crate::error::CoreError;

pub use admin::Admin;
pub use cron::{CronJob, CronTable};
pub use database::Database;
pub use domain::{Domain, NewDomain};
pub use reseller::Reseller;
pub use user::User;

pub(crate) use user::UserState;

/// Account tier, ordered by capability: `User < Reseller < Admin`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum AccountType {
    User,
    Reseller,
    Admin,
}

impl AccountType {
    /// The tier allowed to impersonate this one, if any.
    pub fn manager(self) -> Option<AccountType> {
        match self {
            Self::User => Some(Self::Reseller),
            Self::Reseller => Some(Self::Admin),
            Self::Admin => None,
        }
    }
}

/// An account of any tier, as reported by its `usertype`.
#[derive(Debug, Clone)]
pub enum Account {
    User(User),
    Reseller(Reseller),
    Admin(Admin),
}

impl Account {
    /// Build the entity matching `config["usertype"]`.
    ///
    /// The config is kept as the entity's preloaded `config` category.
    pub fn from_config(config: Value, context: &ContextHandle) -> Result<Self, CoreError> {
        let state = UserState::from_config(config)?;
        Ok(Self::from_state(Arc::new(state), context.clone()))
    }

    pub(crate) fn from_state(state: Arc<UserState>, context: ContextHandle) -> Self {
        let user = User::from_state(state, context);
        match user.kind() {
            AccountType::User => Self::User(user),
            AccountType::Reseller => Self::Reseller(Reseller::from_user(user)),
            AccountType::Admin => Self::Admin(Admin::from_reseller(Reseller::from_user(user))),
        }
    }

    pub fn account_type(&self) -> AccountType {
        self.as_user().kind()
    }

    pub fn name(&self) -> &str {
        self.as_user().name()
    }

    /// The user-level view shared by every tier.
    pub fn as_user(&self) -> &User {
        match self {
            Self::User(user) => user,
            Self::Reseller(reseller) => reseller.as_user(),
            Self::Admin(admin) => admin.as_user(),
        }
    }

    pub fn into_user(self) -> User {
        match self {
            Self::User(user) => user,
            Self::Reseller(reseller) => reseller.into_user(),
            Self::Admin(admin) => admin.into_reseller().into_user(),
        }
    }

    /// The reseller-level view, for resellers and admins.
    pub fn as_reseller(&self) -> Option<&Reseller> {
        match self {
            Self::User(_) => None,
            Self::Reseller(reseller) => Some(reseller),
            Self::Admin(admin) => Some(admin.as_reseller()),
        }
    }

    pub fn as_admin(&self) -> Option<&Admin> {
        match self {
            Self::Admin(admin) => Some(admin),
            _ => None,
        }
    }
}

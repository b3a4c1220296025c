use crate::context::ContextHandle;

/// A MySQL database owned by an account.
///
/// The panel names databases `<owner>_<name>`; `name` is stored without the
/// owner prefix.
#[derive(Debug, Clone)]
pub struct Database {
    name: String,
    owner: String,
    context: ContextHandle,
}

impl Database {
    pub(crate) fn new(name: &str, owner: &str, context: &ContextHandle) -> Self {
        Self {
            name: name.to_owned(),
            owner: owner.to_owned(),
            context: context.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The name as the database server knows it.
    pub fn full_name(&self) -> String {
        format!("{}_{}", self.owner, self.name)
    }

    /// The owner's self-managed context.
    pub fn context(&self) -> &ContextHandle {
        &self.context
    }
}

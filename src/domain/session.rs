// Request-scoped caller context
use super::permissions::{Action, Role, can_any};
use thiserror::Error;

/// Who is calling and for which store. Built once per request and passed
/// explicitly to every use case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub store_id: String,
    pub employee_id: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not permitted to {0}")]
pub struct AccessDenied(pub Action);

impl RequestContext {
    pub fn new(store_id: impl Into<String>, employee_id: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            store_id: store_id.into(),
            employee_id: employee_id.into(),
            roles,
        }
    }

    pub fn allows(&self, action: Action) -> bool {
        can_any(&self.roles, action)
    }

    pub fn require(&self, action: Action) -> Result<(), AccessDenied> {
        if self.allows(action) {
            Ok(())
        } else {
            Err(AccessDenied(action))
        }
    }

    pub fn is_self(&self, employee_id: &str) -> bool {
        self.employee_id == employee_id
    }
}

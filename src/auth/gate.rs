//! Access control gate: which role may invoke which user operation.
//!
//! The mapping is a pure table lookup. Handlers never inspect roles directly;
//! the user service asks [`authorize`] before touching the store.

use tracing::warn;

use super::claims::Role;
use crate::error::AppError;

/// Named permission required to invoke an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Read,
    Write,
    Admin,
}

/// User operations exposed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    List,
    Get,
    Replace,
    Delete,
}

impl Operation {
    /// Capability the caller must hold, `None` for open operations.
    pub fn required_capability(self) -> Option<Capability> {
        match self {
            Operation::Register => None,
            Operation::List | Operation::Get => Some(Capability::Read),
            Operation::Replace => Some(Capability::Write),
            Operation::Delete => Some(Capability::Admin),
        }
    }
}

impl Role {
    pub fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::User => &[Capability::Read, Capability::Write],
            Role::Admin => &[Capability::Read, Capability::Write, Capability::Admin],
        }
    }

    pub fn has(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

/// `true` when `role` may perform `op`.
pub fn allows(role: Role, op: Operation) -> bool {
    match op.required_capability() {
        None => true,
        Some(cap) => role.has(cap),
    }
}

pub fn authorize(role: Role, op: Operation) -> Result<(), AppError> {
    if allows(role, op) {
        Ok(())
    } else {
        warn!(?role, ?op, "access denied");
        Err(AppError::Forbidden)
    }
}

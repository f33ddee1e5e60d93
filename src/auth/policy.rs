//! Central access policy applied by every protected handler.

use crate::error::{AppError, AppResult};
use crate::models::AuthenticatedUser;

/// What a caller must be to perform an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Admin role.
    Admin,
    /// The user with this id, or an admin.
    SelfOrAdmin(i32),
    /// The owner (by user id) of the resource, or an admin.
    OwnerOrAdmin(i32),
}

impl AuthenticatedUser {
    /// Check a capability, returning `Forbidden` when it is not held.
    pub fn require(&self, capability: Capability) -> AppResult<()> {
        if self.allows(capability) {
            return Ok(());
        }

        let message = match capability {
            Capability::Admin => "Admin role required",
            Capability::SelfOrAdmin(_) => "You can only access your own account",
            Capability::OwnerOrAdmin(_) => "You can only access your own resources",
        };
        Err(AppError::Forbidden(message.to_string()))
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Admin => self.is_admin,
            Capability::SelfOrAdmin(user_id) | Capability::OwnerOrAdmin(user_id) => {
                self.is_admin || self.user_id == user_id
            }
        }
    }
}

//! Per-object write permissions.
//!
//! Reads are open to everyone. Writes need an authenticated caller who owns
//! the object or holds the admin role.

use crate::web::{error::AppError, models::AuthenticatedUser};

pub fn can_modify(caller: &AuthenticatedUser, owner_id: i32) -> bool {
    caller.is_admin || caller.id == owner_id
}

pub fn ensure_can_modify(caller: &AuthenticatedUser, owner_id: i32) -> Result<(), AppError> {
    if can_modify(caller, owner_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(t!("errors.not_owner").to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(id: i32, is_admin: bool) -> AuthenticatedUser {
        AuthenticatedUser {
            id,
            username: format!("user{id}"),
            is_admin,
        }
    }

    #[test]
    fn test_owner_may_modify() {
        assert!(can_modify(&caller(1, false), 1));
    }

    #[test]
    fn test_stranger_is_denied() {
        assert!(!can_modify(&caller(2, false), 1));
        assert!(matches!(
            ensure_can_modify(&caller(2, false), 1),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_may_modify_anything() {
        assert!(can_modify(&caller(2, true), 1));
        assert!(ensure_can_modify(&caller(2, true), 1).is_ok());
    }
}

//! Role predicates, permission checks and ownership checks composed in front of handlers.

use super::AuthUser;
use crate::error::AppError;
use crate::model::{Permission, Role};

pub fn require_authenticated(identity: Option<AuthUser>) -> Result<AuthUser, AppError> {
    identity.ok_or(AppError::Unauthenticated)
}

fn has_role(identity: Option<&AuthUser>, role: Role) -> bool {
    identity.map(|u| u.has_role(role)).unwrap_or(false)
}

pub fn is_admin(identity: Option<&AuthUser>) -> bool {
    has_role(identity, Role::Admin)
}

pub fn is_librarian(identity: Option<&AuthUser>) -> bool {
    has_role(identity, Role::Librarian)
}

pub fn is_member(identity: Option<&AuthUser>) -> bool {
    has_role(identity, Role::Member)
}

/// 401 for anonymous callers, 403 unless the user holds one of `allowed`.
pub fn require_role(identity: Option<AuthUser>, allowed: &[Role]) -> Result<AuthUser, AppError> {
    let user = require_authenticated(identity)?;
    if allowed.iter().any(|r| user.has_role(*r)) {
        Ok(user)
    } else {
        tracing::warn!(user = %user.user.username, role = ?user.role, required = ?allowed, "role check failed");
        Err(AppError::Forbidden(format!(
            "requires role {}",
            allowed.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(" or ")
        )))
    }
}

pub fn require_permission(user: &AuthUser, permission: Permission) -> Result<(), AppError> {
    if user.has_perm(permission) {
        Ok(())
    } else {
        tracing::warn!(user = %user.user.username, permission = %permission, "permission check failed");
        Err(AppError::Forbidden(format!("missing permission {}", permission)))
    }
}

/// Only the resource's author may change it.
pub fn require_owner(user: &AuthUser, owner_id: i64, resource: &str) -> Result<(), AppError> {
    if user.id() == owner_id {
        Ok(())
    } else {
        tracing::warn!(user = %user.user.username, resource, "ownership check failed");
        Err(AppError::Forbidden(format!("you are not the author of this {}", resource)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::User;
    use chrono::Utc;
    use std::collections::HashSet;

    fn user(id: i64, role: Option<Role>, superuser: bool, perms: &[Permission]) -> AuthUser {
        AuthUser {
            user: User {
                id,
                username: format!("u{id}"),
                email: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                password_hash: String::new(),
                is_superuser: superuser,
                date_joined: Utc::now(),
            },
            role,
            permissions: perms.iter().copied().collect::<HashSet<_>>(),
            token: "t".into(),
        }
    }

    #[test]
    fn role_predicates_need_profile() {
        let member = user(1, Some(Role::Member), false, &[]);
        let no_profile = user(2, None, false, &[]);
        assert!(is_member(Some(&member)));
        assert!(!is_admin(Some(&member)));
        assert!(!is_member(Some(&no_profile)));
        assert!(!is_librarian(None));
    }

    #[test]
    fn require_role_distinguishes_anonymous_from_forbidden() {
        assert!(matches!(require_role(None, &[Role::Admin]), Err(AppError::Unauthenticated)));
        let member = user(1, Some(Role::Member), false, &[]);
        assert!(matches!(require_role(Some(member.clone()), &[Role::Admin]), Err(AppError::Forbidden(_))));
        assert!(require_role(Some(member), &[Role::Librarian, Role::Member]).is_ok());
    }

    #[test]
    fn superuser_holds_every_permission() {
        let root = user(1, None, true, &[]);
        let clerk = user(2, None, false, &[Permission::AddBook]);
        assert!(require_permission(&root, Permission::DeleteBook).is_ok());
        assert!(require_permission(&clerk, Permission::AddBook).is_ok());
        assert!(matches!(require_permission(&clerk, Permission::DeleteBook), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn ownership() {
        let u = user(3, None, false, &[]);
        assert!(require_owner(&u, 3, "post").is_ok());
        assert!(matches!(require_owner(&u, 4, "post"), Err(AppError::Forbidden(_))));
    }
}

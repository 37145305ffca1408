//! Session tokens and the resolved acting user.

use crate::error::AppError;
use crate::model::{Permission, Role, Session, User};
use crate::store::Store;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashSet;

/// Cookie carrying the session token when no `Authorization` header is sent.
pub const SESSION_COOKIE: &str = "sessionid";

/// An authenticated user with role and granted permissions loaded.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user: User,
    /// `None` when the user has no profile row.
    pub role: Option<Role>,
    pub permissions: HashSet<Permission>,
    pub token: String,
}

impl AuthUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    /// Superusers hold every permission.
    pub fn has_perm(&self, permission: Permission) -> bool {
        self.user.is_superuser || self.permissions.contains(&permission)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }
}

pub fn new_session(user_id: i64, now: DateTime<Utc>, ttl_hours: i64) -> Result<Session, AppError> {
    let expires_at = TimeDelta::try_hours(ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| AppError::Internal(format!("session ttl of {} hours is out of range", ttl_hours)))?;
    Ok(Session {
        token: uuid::Uuid::new_v4().simple().to_string(),
        user_id,
        expires_at,
    })
}

/// Token from `Authorization: Bearer <token>`, else from the session cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    if bearer.is_some() {
        return bearer;
    }
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve a token to its user, role and permissions. Unknown or expired tokens yield `None`.
pub async fn resolve(store: &dyn Store, token: &str, now: DateTime<Utc>) -> Result<Option<AuthUser>, AppError> {
    let Some(user) = store.session_user(token, now).await? else {
        return Ok(None);
    };
    let role = store.profile(user.id).await?.map(|p| p.role);
    let permissions = store.permissions(user.id).await?.into_iter().collect();
    Ok(Some(AuthUser {
        user,
        role,
        permissions,
        token: token.to_string(),
    }))
}

pub fn set_cookie_value(token: &str, ttl_hours: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        ttl_hours.saturating_mul(3600)
    )
}

pub fn clear_cookie_value() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

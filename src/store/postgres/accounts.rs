//! Users, profiles, permission grants, sessions.

use super::{conflict_on_unique, PgStore};
use crate::error::AppError;
use crate::model::*;
use chrono::{DateTime, Utc};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, is_superuser, date_joined";

pub(super) async fn create_user(store: &PgStore, user: NewUser) -> Result<User, AppError> {
    let sql = format!(
        "INSERT INTO {} (username, email, first_name, last_name, password_hash, is_superuser) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
        store.table("users"),
        USER_COLUMNS
    );
    tracing::debug!(sql = %sql, username = %user.username, "query");
    sqlx::query_as::<_, User>(&sql)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.is_superuser)
        .fetch_one(store.pool())
        .await
        .map_err(|e| conflict_on_unique(e, || format!("username '{}' is taken", user.username)))
}

pub(super) async fn user_by_id(store: &PgStore, id: i64) -> Result<Option<User>, AppError> {
    let sql = format!("SELECT {} FROM {} WHERE id = $1", USER_COLUMNS, store.table("users"));
    Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(store.pool()).await?)
}

pub(super) async fn user_by_username(store: &PgStore, username: &str) -> Result<Option<User>, AppError> {
    let sql = format!("SELECT {} FROM {} WHERE username = $1", USER_COLUMNS, store.table("users"));
    Ok(sqlx::query_as::<_, User>(&sql)
        .bind(username)
        .fetch_optional(store.pool())
        .await?)
}

pub(super) async fn update_user(store: &PgStore, id: i64, changes: &UserChanges) -> Result<Option<User>, AppError> {
    let sql = format!(
        "UPDATE {} SET email = COALESCE($2, email), first_name = COALESCE($3, first_name), \
         last_name = COALESCE($4, last_name) WHERE id = $1 RETURNING {}",
        store.table("users"),
        USER_COLUMNS
    );
    tracing::debug!(sql = %sql, id, "query");
    Ok(sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .bind(changes.email.as_deref())
        .bind(changes.first_name.as_deref())
        .bind(changes.last_name.as_deref())
        .fetch_optional(store.pool())
        .await?)
}

fn to_profile(user_id: i64, role: String) -> Result<UserProfile, AppError> {
    Ok(UserProfile {
        user_id,
        role: role.parse()?,
    })
}

pub(super) async fn profile(store: &PgStore, user_id: i64) -> Result<Option<UserProfile>, AppError> {
    let sql = format!("SELECT role FROM {} WHERE user_id = $1", store.table("user_profiles"));
    let role: Option<String> = sqlx::query_scalar(&sql)
        .bind(user_id)
        .fetch_optional(store.pool())
        .await?;
    role.map(|r| to_profile(user_id, r)).transpose()
}

pub(super) async fn ensure_profile(store: &PgStore, user_id: i64) -> Result<UserProfile, AppError> {
    if let Some(existing) = profile(store, user_id).await? {
        return Ok(existing);
    }
    let sql = format!(
        "INSERT INTO {} (user_id, role) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
        store.table("user_profiles")
    );
    tracing::debug!(sql = %sql, user_id, "query");
    sqlx::query(&sql)
        .bind(user_id)
        .bind(Role::default().as_str())
        .execute(store.pool())
        .await?;
    profile(store, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))
}

pub(super) async fn set_role(store: &PgStore, user_id: i64, role: Role) -> Result<UserProfile, AppError> {
    if user_by_id(store, user_id).await?.is_none() {
        return Err(AppError::NotFound(format!("user {}", user_id)));
    }
    let sql = format!(
        "INSERT INTO {} (user_id, role) VALUES ($1, $2) ON CONFLICT (user_id) DO UPDATE SET role = EXCLUDED.role",
        store.table("user_profiles")
    );
    tracing::debug!(sql = %sql, user_id, role = %role, "query");
    sqlx::query(&sql)
        .bind(user_id)
        .bind(role.as_str())
        .execute(store.pool())
        .await?;
    Ok(UserProfile { user_id, role })
}

pub(super) async fn permissions(store: &PgStore, user_id: i64) -> Result<Vec<Permission>, AppError> {
    let sql = format!(
        "SELECT codename FROM {} WHERE user_id = $1 ORDER BY codename",
        store.table("user_permissions")
    );
    let codenames: Vec<String> = sqlx::query_scalar(&sql)
        .bind(user_id)
        .fetch_all(store.pool())
        .await?;
    // Rows with codenames this build no longer knows are skipped.
    Ok(codenames.iter().filter_map(|c| c.parse().ok()).collect())
}

pub(super) async fn grant_permission(store: &PgStore, user_id: i64, permission: Permission) -> Result<(), AppError> {
    if user_by_id(store, user_id).await?.is_none() {
        return Err(AppError::NotFound(format!("user {}", user_id)));
    }
    let sql = format!(
        "INSERT INTO {} (user_id, codename) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        store.table("user_permissions")
    );
    tracing::debug!(sql = %sql, user_id, codename = %permission, "query");
    sqlx::query(&sql)
        .bind(user_id)
        .bind(permission.codename())
        .execute(store.pool())
        .await?;
    Ok(())
}

pub(super) async fn revoke_permission(store: &PgStore, user_id: i64, permission: Permission) -> Result<bool, AppError> {
    let sql = format!(
        "DELETE FROM {} WHERE user_id = $1 AND codename = $2",
        store.table("user_permissions")
    );
    let res = sqlx::query(&sql)
        .bind(user_id)
        .bind(permission.codename())
        .execute(store.pool())
        .await?;
    Ok(res.rows_affected() > 0)
}

pub(super) async fn create_session(store: &PgStore, session: Session) -> Result<(), AppError> {
    let sql = format!(
        "INSERT INTO {} (token, user_id, expires_at) VALUES ($1, $2, $3)",
        store.table("sessions")
    );
    sqlx::query(&sql)
        .bind(&session.token)
        .bind(session.user_id)
        .bind(session.expires_at)
        .execute(store.pool())
        .await?;
    Ok(())
}

pub(super) async fn session_user(store: &PgStore, token: &str, now: DateTime<Utc>) -> Result<Option<User>, AppError> {
    let columns = USER_COLUMNS
        .split(", ")
        .map(|c| format!("u.{}", c))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {} FROM {} s JOIN {} u ON u.id = s.user_id WHERE s.token = $1 AND s.expires_at > $2",
        columns,
        store.table("sessions"),
        store.table("users")
    );
    Ok(sqlx::query_as::<_, User>(&sql)
        .bind(token)
        .bind(now)
        .fetch_optional(store.pool())
        .await?)
}

pub(super) async fn delete_session(store: &PgStore, token: &str) -> Result<bool, AppError> {
    let sql = format!("DELETE FROM {} WHERE token = $1", store.table("sessions"));
    let res = sqlx::query(&sql).bind(token).execute(store.pool()).await?;
    Ok(res.rows_affected() > 0)
}

pub(super) async fn purge_expired_sessions(store: &PgStore, now: DateTime<Utc>) -> Result<u64, AppError> {
    let sql = format!("DELETE FROM {} WHERE expires_at <= $1", store.table("sessions"));
    tracing::debug!(sql = %sql, "query");
    let res = sqlx::query(&sql).bind(now).execute(store.pool()).await?;
    Ok(res.rows_affected())
}

//! Registration, login, logout, profile, and role/permission administration.

use crate::auth::password::{decoy_hash, hash_password_blocking, verify_password_blocking};
use crate::auth::session::new_session;
use crate::auth::AuthUser;
use crate::config::Settings;
use crate::error::{AppError, FieldErrors};
use crate::model::*;
use crate::service::validation::{Credentials, Registration};
use crate::store::Store;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
pub const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// A user as returned by the account endpoints.
#[derive(Clone, Debug, Serialize)]
pub struct AccountView {
    #[serde(flatten)]
    pub user: User,
    pub role: Option<Role>,
    pub permissions: Vec<String>,
}

/// Account plus the session that now authenticates it.
#[derive(Clone, Debug, Serialize)]
pub struct SignedIn {
    pub user: AccountView,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccountView {
    pub fn new(user: User, role: Option<Role>, mut permissions: Vec<Permission>) -> Self {
        // Superusers implicitly hold everything; list it so clients need not special-case them.
        if user.is_superuser {
            permissions = Permission::ALL.to_vec();
        }
        let mut permissions: Vec<String> = permissions.iter().map(|p| p.codename().to_string()).collect();
        permissions.sort();
        AccountView { user, role, permissions }
    }

    pub fn of(auth: &AuthUser) -> Self {
        AccountView::new(auth.user.clone(), auth.role, auth.permissions.iter().copied().collect())
    }
}

pub struct AccountService;

impl AccountService {
    async fn start_session(
        store: &dyn Store,
        settings: &Settings,
        user: User,
        role: Option<Role>,
        now: DateTime<Utc>,
    ) -> Result<SignedIn, AppError> {
        let session = new_session(user.id, now, settings.session_ttl_hours)?;
        let purged = store.purge_expired_sessions(now).await?;
        if purged > 0 {
            tracing::debug!(purged, "expired sessions removed");
        }
        store.create_session(session.clone()).await?;
        let permissions = store.permissions(user.id).await?;
        Ok(SignedIn {
            user: AccountView::new(user, role, permissions),
            token: session.token,
            expires_at: session.expires_at,
        })
    }

    /// Creates the user, then the Member profile, then logs them in.
    pub async fn register(
        store: &dyn Store,
        settings: &Settings,
        form: Registration,
        now: DateTime<Utc>,
    ) -> Result<SignedIn, AppError> {
        if store.user_by_username(&form.username).await?.is_some() {
            return Err(AppError::field("username", DUPLICATE_USERNAME));
        }
        let password_hash = hash_password_blocking(form.password, settings.password_iterations).await?;
        let user = store
            .create_user(NewUser {
                username: form.username,
                email: form.email,
                first_name: form.first_name,
                last_name: form.last_name,
                password_hash,
                is_superuser: false,
            })
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => AppError::field("username", DUPLICATE_USERNAME),
                other => other,
            })?;
        let profile = store.ensure_profile(user.id).await?;
        tracing::info!(user_id = user.id, username = %user.username, "user registered");
        Self::start_session(store, settings, user, Some(profile.role), now).await
    }

    pub async fn login(
        store: &dyn Store,
        settings: &Settings,
        credentials: Credentials,
        now: DateTime<Utc>,
    ) -> Result<SignedIn, AppError> {
        let found = store.user_by_username(&credentials.username).await?;
        // Unknown usernames still pay for a full verification.
        let encoded = match &found {
            Some(u) => u.password_hash.clone(),
            None => decoy_hash(settings.password_iterations),
        };
        let verified = verify_password_blocking(credentials.password, encoded).await?;
        let user = match found {
            Some(u) if verified => u,
            _ => {
                tracing::warn!(username = %credentials.username, "login failed");
                return Err(AppError::Validation(FieldErrors::single("__all__", BAD_CREDENTIALS)));
            }
        };
        let role = store.profile(user.id).await?.map(|p| p.role);
        tracing::info!(user_id = user.id, "user logged in");
        Self::start_session(store, settings, user, role, now).await
    }

    pub async fn logout(store: &dyn Store, user: &AuthUser) -> Result<(), AppError> {
        store.delete_session(&user.token).await?;
        tracing::info!(user_id = user.id(), "user logged out");
        Ok(())
    }

    pub async fn update_profile(store: &dyn Store, user: &AuthUser, changes: UserChanges) -> Result<AccountView, AppError> {
        let updated = if changes.is_empty() {
            user.user.clone()
        } else {
            let updated = store
                .update_user(user.id(), &changes)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("user {}", user.id())))?;
            tracing::info!(user_id = user.id(), "profile updated");
            updated
        };
        Ok(AccountView::new(updated, user.role, user.permissions.iter().copied().collect()))
    }

    async fn account(store: &dyn Store, user_id: i64) -> Result<AccountView, AppError> {
        let user = store
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;
        let role = store.profile(user_id).await?.map(|p| p.role);
        let permissions = store.permissions(user_id).await?;
        Ok(AccountView::new(user, role, permissions))
    }

    pub async fn set_role(store: &dyn Store, user_id: i64, role: Role) -> Result<AccountView, AppError> {
        store.set_role(user_id, role).await?;
        tracing::info!(user_id, role = %role, "role changed");
        Self::account(store, user_id).await
    }

    pub async fn grant(store: &dyn Store, user_id: i64, permission: Permission) -> Result<AccountView, AppError> {
        store.grant_permission(user_id, permission).await?;
        tracing::info!(user_id, permission = %permission, "permission granted");
        Self::account(store, user_id).await
    }

    pub async fn revoke(store: &dyn Store, user_id: i64, permission: Permission) -> Result<AccountView, AppError> {
        if store.user_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("user {}", user_id)));
        }
        if store.revoke_permission(user_id, permission).await? {
            tracing::info!(user_id, permission = %permission, "permission revoked");
        }
        Self::account(store, user_id).await
    }

    /// Create the configured superuser (role Admin) unless the username is taken.
    pub async fn bootstrap_admin(store: &dyn Store, settings: &Settings) -> Result<Option<User>, AppError> {
        let (Some(username), Some(password)) = (&settings.admin_username, &settings.admin_password) else {
            return Ok(None);
        };
        if store.user_by_username(username).await?.is_some() {
            tracing::debug!(username = %username, "bootstrap admin already present");
            return Ok(None);
        }
        let password_hash = hash_password_blocking(password.clone(), settings.password_iterations).await?;
        let user = store
            .create_user(NewUser {
                username: username.clone(),
                email: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                password_hash,
                is_superuser: true,
            })
            .await?;
        store.set_role(user.id, Role::Admin).await?;
        tracing::info!(user_id = user.id, username = %user.username, "bootstrap admin created");
        Ok(Some(user))
    }
}

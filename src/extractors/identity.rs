//! Resolve the acting user from the session token on the request.

use crate::auth::{self, AuthUser};
use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Utc;

/// The acting user, or `None` for anonymous requests and unknown/expired tokens.
#[derive(Clone, Debug)]
pub struct Identity(pub Option<AuthUser>);

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = auth::session::token_from_headers(&parts.headers) else {
            return Ok(Identity(None));
        };
        let user = auth::session::resolve(state.store.as_ref(), &token, Utc::now()).await?;
        if user.is_none() {
            tracing::debug!("session token did not resolve");
        }
        Ok(Identity(user))
    }
}

/// Rejects with 401 unless a valid session is present.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Identity(user) = Identity::from_request_parts(parts, state).await?;
        auth::require_authenticated(user).map(CurrentUser)
    }
}

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{error, warn};

use crate::{
    auth::{jwt::JwtKeys, repo::UserStore, repo_types::User},
    error::ApiError,
    state::AppState,
};

/// Verifies the session token and resolves it to the stored user.
pub struct AuthUser(pub User);

/// An [`AuthUser`] whose premium flag is set.
pub struct PremiumUser(pub User);

/// Accepts both a bare token and `Bearer <token>`.
fn token_from_header(value: &str) -> Option<&str> {
    let value = value.trim_start();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value)
        .trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(token_from_header)
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;

        let claims = JwtKeys::from_ref(state).verify(token).map_err(|e| {
            warn!(error = %e, "rejected session token");
            ApiError::Unauthorized("Invalid or expired token".into())
        })?;

        match state.store.find_user_by_id(claims.sub).await {
            Ok(Some(user)) => Ok(AuthUser(user)),
            Ok(None) => {
                warn!(user_id = claims.sub, "token for unknown user");
                Err(ApiError::Unauthorized("User not found".into()))
            }
            Err(e) => {
                error!(error = %e, user_id = claims.sub, "user lookup failed");
                Err(ApiError::Unauthorized("Authentication failed".into()))
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for PremiumUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_premium_user {
            warn!(user_id = user.id, "premium feature requested by non-premium user");
            return Err(ApiError::Forbidden("Premium membership required".into()));
        }
        Ok(PremiumUser(user))
    }
}

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginRequest, SignupRequest},
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_password_blocking},
        repo::UserStore,
        repo_types::{NewUser, User},
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn sign_up(state: &AppState, req: SignupRequest) -> ApiResult<User> {
    let name = req.name.trim();
    let email = normalize_email(&req.email);

    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if req.password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".into()));
    }

    // Cheap pre-check; the unique index still decides races.
    if state.store.find_user_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict(
            "This email is already taken. Please choose another one".into(),
        ));
    }

    let hash = hash_password_blocking(req.password, state.config.password.clone()).await?;
    let user = state
        .store
        .create_user(NewUser {
            name,
            email: &email,
            password_hash: &hash,
        })
        .await?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Returns the user and a fresh session token.
pub async fn log_in(state: &AppState, req: LoginRequest) -> ApiResult<(User, String)> {
    let email = normalize_email(&req.email);

    let user = match state.store.find_user_by_email(&email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::NotFound("User not found".into()));
        }
    };

    if !verify_password_blocking(req.password, user.password_hash.clone()).await? {
        warn!(user_id = user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Incorrect password".into()));
    }

    let token = JwtKeys::from_ref(state).issue(user.id, &user.email)?;
    info!(user_id = user.id, "user logged in");
    Ok((user, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_context;

    fn signup(name: &str, email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a x@y.com"));
        assert!(!is_valid_email(""));
    }

    #[tokio::test]
    async fn signup_then_login_returns_verifiable_token() {
        let ctx = test_context();
        let user = sign_up(&ctx.state, signup("Alice", " A@X.com ", "pw1"))
            .await
            .unwrap();
        assert_eq!(user.email, "a@x.com");
        assert!(!user.is_premium_user);
        assert_eq!(user.total_expenses, 0);

        let (logged_in, token) = log_in(&ctx.state, login("a@x.com", "pw1")).await.unwrap();
        assert_eq!(logged_in.id, user.id);
        let claims = JwtKeys::from_ref(&ctx.state).verify(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "a@x.com");
    }

    #[tokio::test]
    async fn duplicate_signup_keeps_original_password() {
        let ctx = test_context();
        sign_up(&ctx.state, signup("Alice", "a@x.com", "pw1")).await.unwrap();

        let err = sign_up(&ctx.state, signup("Mallory", "a@x.com", "evil"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        assert!(log_in(&ctx.state, login("a@x.com", "pw1")).await.is_ok());
        let err = log_in(&ctx.state, login("a@x.com", "evil")).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn login_distinguishes_unknown_user_from_bad_password() {
        let ctx = test_context();
        sign_up(&ctx.state, signup("Alice", "a@x.com", "pw1")).await.unwrap();

        let err = log_in(&ctx.state, login("b@x.com", "pw1")).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        let err = log_in(&ctx.state, login("a@x.com", "nope")).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn signup_rejects_invalid_input() {
        let ctx = test_context();
        for req in [
            signup("", "a@x.com", "pw1"),
            signup("Alice", "not-an-email", "pw1"),
            signup("Alice", "a@x.com", ""),
        ] {
            let err = sign_up(&ctx.state, req).await.unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)));
        }
    }
}

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::{password::hash_password_blocking, repo::UserStore, services::normalize_email},
    error::{ApiError, ApiResult},
    password_reset::{repo::ResetStore, repo_types::ResetRequest},
    state::AppState,
};

const CONSUME_FAILED: &str = "Failed to change password!";

pub fn reset_link(public_base_url: &str, id: Uuid) -> String {
    format!(
        "{}/password/resetPasswordPage/{}",
        public_base_url.trim_end_matches('/'),
        id
    )
}

/// Last path segment of a reset page URL, ignoring any query or fragment.
pub fn request_id_from_referer(referer: &str) -> Option<&str> {
    let path = referer.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

/// Create a reset request for the account behind `email` and mail its link.
/// A request whose mail could not be sent is deactivated right away.
pub async fn request_reset(state: &AppState, email: &str) -> ApiResult<ResetRequest> {
    let email = normalize_email(email);
    let Some(user) = state.store.find_user_by_email(&email).await? else {
        warn!(email = %email, "reset requested for unknown email");
        return Err(ApiError::NotFound(
            "Please provide the registered email!".into(),
        ));
    };

    let request = state
        .store
        .create_reset_request(Uuid::new_v4(), user.id)
        .await?;
    let link = reset_link(&state.config.mail.public_base_url, request.id);

    if let Err(e) = state.mailer.send_password_reset(&user.email, &link).await {
        error!(user_id = user.id, error = %e, "reset mail failed");
        state.store.deactivate_reset_request(request.id).await?;
        return Err(ApiError::Conflict("Failed to send the reset link".into()));
    }

    info!(user_id = user.id, request_id = %request.id, "reset link sent");
    Ok(request)
}

/// Spend a reset request on a new password. Unknown, used and malformed ids
/// all fail the same way.
pub async fn consume_reset(state: &AppState, request_id: &str, password: String) -> ApiResult<()> {
    let Ok(id) = Uuid::parse_str(request_id.trim()) else {
        warn!(request_id, "malformed reset request id");
        return Err(ApiError::Conflict(CONSUME_FAILED.into()));
    };
    if password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".into()));
    }

    if state.store.find_active_reset_request(id).await?.is_none() {
        warn!(request_id = %id, "reset request unknown or used");
        return Err(ApiError::Conflict(CONSUME_FAILED.into()));
    }

    let hash = hash_password_blocking(password, state.config.password.clone()).await?;
    match state.store.consume_reset_request(id, &hash).await? {
        Some(user_id) => {
            info!(user_id, request_id = %id, "password changed via reset");
            Ok(())
        }
        None => {
            warn!(request_id = %id, "reset request consumed concurrently");
            Err(ApiError::Conflict(CONSUME_FAILED.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::password::verify_password,
        test_utils::{test_context, test_user},
    };

    #[test]
    fn link_and_referer_agree() {
        let id = Uuid::new_v4();
        let link = reset_link("http://localhost:8080/", id);
        assert_eq!(
            link,
            format!("http://localhost:8080/password/resetPasswordPage/{id}")
        );
        assert_eq!(request_id_from_referer(&link), Some(id.to_string().as_str()));
        assert_eq!(
            request_id_from_referer(&format!("{link}/?utm=1")),
            Some(id.to_string().as_str())
        );
        assert_eq!(request_id_from_referer(""), None);
    }

    #[tokio::test]
    async fn reset_is_single_use() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;

        let request = request_reset(&ctx.state, "A@x.com").await.unwrap();
        assert_eq!(request.user_id, user.id);
        let sent = ctx.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "a@x.com");
        assert!(sent[0].1.ends_with(&request.id.to_string()));

        consume_reset(&ctx.state, &request.id.to_string(), "newpw".into())
            .await
            .unwrap();
        let stored = ctx.store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(verify_password("newpw", &stored.password_hash).unwrap());

        let err = consume_reset(&ctx.state, &request.id.to_string(), "other".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        let stored = ctx.store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(verify_password("newpw", &stored.password_hash).unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_consumes_have_one_winner() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;
        let request = request_reset(&ctx.state, "a@x.com").await.unwrap();
        let id = request.id.to_string();

        let (a, b) = tokio::join!(
            consume_reset(&ctx.state, &id, "first".into()),
            consume_reset(&ctx.state, &id, "second".into()),
        );
        let winner = match (a, b) {
            (Ok(()), Err(ApiError::Conflict(msg))) => {
                assert_eq!(msg, CONSUME_FAILED);
                "first"
            }
            (Err(ApiError::Conflict(msg)), Ok(())) => {
                assert_eq!(msg, CONSUME_FAILED);
                "second"
            }
            other => panic!("expected exactly one success: {other:?}"),
        };

        let stored = ctx.store.find_user_by_id(user.id).await.unwrap().unwrap();
        assert!(verify_password(winner, &stored.password_hash).unwrap());
    }

    #[tokio::test]
    async fn unknown_email_is_not_found() {
        let ctx = test_context();
        let err = request_reset(&ctx.state, "nobody@x.com").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(ctx.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn failed_mail_deactivates_request() {
        let ctx = test_context();
        test_user(&ctx, "a@x.com").await;
        ctx.mailer.fail(true);

        let err = request_reset(&ctx.state, "a@x.com").await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        let link = ctx.mailer.attempted().pop().unwrap();
        let id = request_id_from_referer(&link).unwrap().to_string();

        let err = consume_reset(&ctx.state, &id, "newpw".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn bad_ids_fail_alike() {
        let ctx = test_context();
        let fresh = Uuid::new_v4().to_string();
        for id in ["not-a-uuid", "", fresh.as_str()] {
            let err = consume_reset(&ctx.state, id, "pw".into()).await.unwrap_err();
            match err {
                ApiError::Conflict(msg) => assert_eq!(msg, CONSUME_FAILED),
                other => panic!("unexpected: {other:?}"),
            }
        }
    }
}

use axum::{
    extract::State,
    http::{header::REFERER, HeaderMap},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    error::{ApiError, ApiResult},
    password_reset::{
        dto::{MessageResponse, ResetPasswordRequest, SendMailRequest},
        services,
    },
    state::AppState,
};

pub fn password_routes() -> Router<AppState> {
    Router::new()
        .route("/password/sendMail", post(send_mail))
        .route("/password/resetPassword", post(reset_password))
}

#[instrument(skip_all)]
pub async fn send_mail(
    State(state): State<AppState>,
    Json(body): Json<SendMailRequest>,
) -> ApiResult<Json<MessageResponse>> {
    services::request_reset(&state, &body.email).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Link for reset the password is successfully sent to your email".into(),
    }))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let request_id = match body.request_id {
        Some(id) => id,
        None => headers
            .get(REFERER)
            .and_then(|v| v.to_str().ok())
            .and_then(services::request_id_from_referer)
            .map(str::to_string)
            .ok_or_else(|| ApiError::Conflict("Failed to change password!".into()))?,
    };

    services::consume_reset(&state, &request_id, body.password).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Successfully changed password".into(),
    }))
}

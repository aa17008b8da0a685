use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, PremiumStatus, SignupRequest, SignupResponse},
        extractors::AuthUser,
        services,
    },
    error::ApiResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/isPremiumUser", get(is_premium_user))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> ApiResult<Json<SignupResponse>> {
    let user = services::sign_up(&state, payload).await?;
    Ok(Json(SignupResponse {
        success: true,
        message: "Signed up successfully".into(),
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let (user, token) = services::log_in(&state, payload).await?;
    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".into(),
        token,
        user: user.into(),
    }))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn is_premium_user(AuthUser(user): AuthUser) -> Json<PremiumStatus> {
    Json(PremiumStatus {
        is_premium_user: user.is_premium_user,
    })
}

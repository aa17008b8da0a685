use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::ApiResult,
    purchase::{
        dto::{ConfirmPurchaseRequest, ConfirmPurchaseResponse, InitiatePurchaseResponse},
        services,
    },
    state::AppState,
};

pub fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/purchase/initiate", get(initiate_purchase))
        .route("/purchase/confirm", post(confirm_purchase))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn initiate_purchase(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<(StatusCode, Json<InitiatePurchaseResponse>)> {
    let (order, gateway_key) = services::initiate(&state, &user).await?;
    Ok((
        StatusCode::CREATED,
        Json(InitiatePurchaseResponse { order, gateway_key }),
    ))
}

#[instrument(skip_all, fields(user_id = user.id, order_id = %body.order_id))]
pub async fn confirm_purchase(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<ConfirmPurchaseRequest>,
) -> ApiResult<(StatusCode, Json<ConfirmPurchaseResponse>)> {
    services::confirm(&state, &user, &body.order_id, &body.payment_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ConfirmPurchaseResponse {
            success: true,
            message: "Transaction Successful".into(),
        }),
    ))
}

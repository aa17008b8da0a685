use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::instrument;

use crate::{
    auth::extractors::PremiumUser,
    downloads::services::{self, DownloadLink},
    error::ApiResult,
    state::AppState,
};

pub fn download_routes() -> Router<AppState> {
    Router::new()
        .route("/user/download", get(download_expenses))
        .route("/user/downloads", get(list_downloads))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn download_expenses(
    State(state): State<AppState>,
    PremiumUser(user): PremiumUser,
) -> ApiResult<(StatusCode, Json<DownloadLink>)> {
    let link = services::export(&state, user.id).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn list_downloads(
    State(state): State<AppState>,
    PremiumUser(user): PremiumUser,
) -> ApiResult<Json<Vec<DownloadLink>>> {
    Ok(Json(services::history(&state, user.id).await?))
}

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    auth::extractors::PremiumUser,
    error::ApiResult,
    expenses::repo_types::Expense,
    premium::{repo_types::LeaderboardEntry, services},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct DailyReportRequest {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyReportRequest {
    pub month: String,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub expenses: Vec<Expense>,
    pub total: i64,
}

impl From<services::Report> for ReportResponse {
    fn from(r: services::Report) -> Self {
        Self {
            expenses: r.expenses,
            total: r.total,
        }
    }
}

pub fn premium_routes() -> Router<AppState> {
    Router::new()
        .route("/premium/getAllUsers", get(get_all_users))
        .route("/reports/dailyReports", post(daily_reports))
        .route("/reports/monthlyReports", post(monthly_reports))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn get_all_users(
    State(state): State<AppState>,
    PremiumUser(user): PremiumUser,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    Ok(Json(services::leaderboard(&state).await?))
}

#[instrument(skip_all, fields(user_id = user.id, date = %body.date))]
pub async fn daily_reports(
    State(state): State<AppState>,
    PremiumUser(user): PremiumUser,
    Json(body): Json<DailyReportRequest>,
) -> ApiResult<Json<ReportResponse>> {
    let report = services::daily_report(&state, user.id, &body.date).await?;
    Ok(Json(report.into()))
}

#[instrument(skip_all, fields(user_id = user.id, month = %body.month))]
pub async fn monthly_reports(
    State(state): State<AppState>,
    PremiumUser(user): PremiumUser,
    Json(body): Json<MonthlyReportRequest>,
) -> ApiResult<Json<ReportResponse>> {
    let report = services::monthly_report(&state, user.id, &body.month).await?;
    Ok(Json(report.into()))
}

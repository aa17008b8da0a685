//! Premium-only features: the spending leaderboard and expense reports.

use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::premium_routes()
}

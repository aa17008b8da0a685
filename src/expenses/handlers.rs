use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::ApiResult,
    expenses::{
        dto::{DeletedResponse, ExpenseResponse, PageQuery, PagedExpenses},
        repo_types::{Expense, ExpenseInput},
        services,
    },
    state::AppState,
};

pub fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/expense/addExpense", post(add_expense))
        .route("/expense/getAllExpenses", get(list_expenses))
        .route("/expense/getAllExpenses/:page", get(page_expenses))
        .route("/expense/editExpense/:id", post(edit_expense))
        // Older clients delete with a plain GET.
        .route(
            "/expense/deleteExpense/:id",
            delete(delete_expense).get(delete_expense),
        )
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn add_expense(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<ExpenseInput>,
) -> ApiResult<(StatusCode, Json<ExpenseResponse>)> {
    let expense = services::add(&state, user.id, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ExpenseResponse {
            success: true,
            expense,
        }),
    ))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn list_expenses(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<Expense>>> {
    Ok(Json(services::list(&state, user.id).await?))
}

#[instrument(skip_all, fields(user_id = user.id, page = page))]
pub async fn page_expenses(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(page): Path<i64>,
    Query(q): Query<PageQuery>,
) -> ApiResult<Json<PagedExpenses>> {
    let page = services::page(&state, user.id, page, q.per_page).await?;
    Ok(Json(PagedExpenses {
        expenses: page.expenses,
        total_pages: page.total_pages,
        current_page: page.current_page,
    }))
}

#[instrument(skip_all, fields(user_id = user.id, expense_id = id))]
pub async fn edit_expense(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<ExpenseInput>,
) -> ApiResult<Json<ExpenseResponse>> {
    let expense = services::edit(&state, user.id, id, body).await?;
    Ok(Json(ExpenseResponse {
        success: true,
        expense,
    }))
}

#[instrument(skip_all, fields(user_id = user.id, expense_id = id))]
pub async fn delete_expense(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeletedResponse>> {
    services::remove(&state, user.id, id).await?;
    Ok(Json(DeletedResponse {
        success: true,
        message: "Expense deleted".into(),
    }))
}

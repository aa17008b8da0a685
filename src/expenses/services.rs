use tracing::{info, warn};

use crate::{
    error::{ApiError, ApiResult},
    expenses::{
        repo::ExpenseStore,
        repo_types::{Expense, ExpenseInput},
    },
    state::AppState,
};

pub const DEFAULT_PER_PAGE: i64 = 3;
pub const MAX_PER_PAGE: i64 = 100;
/// Largest amount a single expense may carry.
pub const MAX_AMOUNT: i64 = 1_000_000_000;

#[derive(Debug, Clone)]
pub struct Page {
    pub expenses: Vec<Expense>,
    pub total_pages: i64,
    pub current_page: i64,
}

fn validate(mut input: ExpenseInput) -> ApiResult<ExpenseInput> {
    input.category = input.category.trim().to_string();
    input.description = input.description.trim().to_string();
    if input.category.is_empty() {
        return Err(ApiError::BadRequest("Category is required".into()));
    }
    if input.amount <= 0 {
        return Err(ApiError::BadRequest("Amount must be positive".into()));
    }
    if input.amount > MAX_AMOUNT {
        return Err(ApiError::BadRequest(format!(
            "Amount must not exceed {MAX_AMOUNT}"
        )));
    }
    Ok(input)
}

pub fn total_pages(total: i64, per_page: i64) -> i64 {
    (total + per_page - 1) / per_page
}

pub async fn add(state: &AppState, user_id: i64, input: ExpenseInput) -> ApiResult<Expense> {
    let input = validate(input)?;
    let expense = state.store.add_expense(user_id, &input).await?;
    info!(user_id, expense_id = expense.id, amount = expense.amount, "expense added");
    Ok(expense)
}

pub async fn edit(
    state: &AppState,
    user_id: i64,
    expense_id: i64,
    input: ExpenseInput,
) -> ApiResult<Expense> {
    let input = validate(input)?;
    match state.store.update_expense(user_id, expense_id, &input).await? {
        Some(expense) => {
            info!(user_id, expense_id, "expense updated");
            Ok(expense)
        }
        None => {
            warn!(user_id, expense_id, "edit of missing expense");
            Err(ApiError::NotFound("Expense not found".into()))
        }
    }
}

pub async fn remove(state: &AppState, user_id: i64, expense_id: i64) -> ApiResult<()> {
    if !state.store.delete_expense(user_id, expense_id).await? {
        warn!(user_id, expense_id, "delete of missing expense");
        return Err(ApiError::NotFound("Expense not found".into()));
    }
    info!(user_id, expense_id, "expense deleted");
    Ok(())
}

pub async fn list(state: &AppState, user_id: i64) -> ApiResult<Vec<Expense>> {
    Ok(state.store.list_expenses(user_id).await?)
}

/// 1-based page of the user's expenses, newest first. Pages past the end
/// come back empty.
pub async fn page(
    state: &AppState,
    user_id: i64,
    page: i64,
    per_page: Option<i64>,
) -> ApiResult<Page> {
    if page < 1 {
        return Err(ApiError::BadRequest("Page must be 1 or greater".into()));
    }
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let offset = (page - 1).saturating_mul(per_page);

    let result = state
        .store
        .page_expenses(user_id, per_page, offset)
        .await?;
    Ok(Page {
        expenses: result.expenses,
        total_pages: total_pages(result.total, per_page),
        current_page: page,
    })
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::{
        auth::repo::UserStore,
        test_utils::{test_context, test_user},
    };

    fn input(category: &str, amount: i64) -> ExpenseInput {
        ExpenseInput {
            date: date!(2024 - 05 - 01),
            category: category.into(),
            description: " coffee ".into(),
            amount,
        }
    }

    async fn total_of(ctx: &crate::test_utils::TestContext, user_id: i64) -> i64 {
        ctx.store
            .find_user_by_id(user_id)
            .await
            .unwrap()
            .unwrap()
            .total_expenses
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(total_pages(0, 3), 0);
        assert_eq!(total_pages(3, 3), 1);
        assert_eq!(total_pages(7, 3), 3);
    }

    #[tokio::test]
    async fn total_tracks_sum_of_expenses() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;

        let a = add(&ctx.state, user.id, input("Food", 120)).await.unwrap();
        assert_eq!(a.description, "coffee");
        let b = add(&ctx.state, user.id, input("Fuel", 80)).await.unwrap();
        assert_eq!(total_of(&ctx, user.id).await, 200);

        edit(&ctx.state, user.id, a.id, input("Food", 20)).await.unwrap();
        assert_eq!(total_of(&ctx, user.id).await, 100);

        remove(&ctx.state, user.id, b.id).await.unwrap();
        assert_eq!(total_of(&ctx, user.id).await, 20);

        let sum: i64 = list(&ctx.state, user.id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.amount)
            .sum();
        assert_eq!(sum, total_of(&ctx, user.id).await);
    }

    #[tokio::test]
    async fn rejects_bad_input() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;
        for bad in [
            input(" ", 10),
            input("Food", 0),
            input("Food", -5),
            input("Food", MAX_AMOUNT + 1),
            input("Food", i64::MAX),
        ] {
            let err = add(&ctx.state, user.id, bad).await.unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)));
        }
        assert_eq!(total_of(&ctx, user.id).await, 0);
    }

    #[tokio::test]
    async fn missing_expense_is_not_found() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;
        let err = edit(&ctx.state, user.id, 999, input("Food", 1)).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        let err = remove(&ctx.state, user.id, 999).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn paginates_with_default_size() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;
        for amount in 1..=7 {
            add(&ctx.state, user.id, input("Food", amount)).await.unwrap();
        }

        let first = page(&ctx.state, user.id, 1, None).await.unwrap();
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.expenses.len(), 3);
        let last = page(&ctx.state, user.id, 3, None).await.unwrap();
        assert_eq!(last.expenses.len(), 1);
        let wide = page(&ctx.state, user.id, 1, Some(10)).await.unwrap();
        assert_eq!(wide.total_pages, 1);
        assert_eq!(wide.expenses.len(), 7);

        let err = page(&ctx.state, user.id, 0, None).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn huge_page_number_is_empty() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;
        add(&ctx.state, user.id, input("Food", 5)).await.unwrap();

        for per_page in [None, Some(MAX_PER_PAGE)] {
            let far = page(&ctx.state, user.id, i64::MAX, per_page).await.unwrap();
            assert!(far.expenses.is_empty());
            assert_eq!(far.total_pages, 1);
            assert_eq!(far.current_page, i64::MAX);
        }
    }

    #[tokio::test]
    async fn largest_amount_is_accepted() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;
        add(&ctx.state, user.id, input("Rent", MAX_AMOUNT)).await.unwrap();
        assert_eq!(total_of(&ctx, user.id).await, MAX_AMOUNT);
    }
}

use time::{macros::format_description, util::days_in_year_month, Date, Month};

use crate::{
    auth::repo::UserStore,
    error::{ApiError, ApiResult},
    expenses::{repo::ExpenseStore, repo_types::Expense},
    premium::repo_types::LeaderboardEntry,
    state::AppState,
};

#[derive(Debug, Clone)]
pub struct Report {
    pub expenses: Vec<Expense>,
    pub total: i64,
}

impl From<Vec<Expense>> for Report {
    fn from(expenses: Vec<Expense>) -> Self {
        let total = expenses.iter().map(|e| e.amount).sum();
        Self { expenses, total }
    }
}

pub fn parse_day(raw: &str) -> ApiResult<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| ApiError::BadRequest("date must be YYYY-MM-DD".into()))
}

/// First and last day of a `YYYY-MM` month.
pub fn month_bounds(raw: &str) -> ApiResult<(Date, Date)> {
    let bad = || ApiError::BadRequest("month must be YYYY-MM".into());
    let (year, month) = raw.trim().split_once('-').ok_or_else(bad)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(bad());
    }
    let year: i32 = year.parse().map_err(|_| bad())?;
    let month: u8 = month.parse().map_err(|_| bad())?;
    let month = Month::try_from(month).map_err(|_| bad())?;

    let first = Date::from_calendar_date(year, month, 1).map_err(|_| bad())?;
    let last = Date::from_calendar_date(year, month, days_in_year_month(year, month))
        .map_err(|_| bad())?;
    Ok((first, last))
}

pub async fn leaderboard(state: &AppState) -> ApiResult<Vec<LeaderboardEntry>> {
    Ok(state.store.leaderboard().await?)
}

pub async fn daily_report(state: &AppState, user_id: i64, day: &str) -> ApiResult<Report> {
    let day = parse_day(day)?;
    Ok(state.store.expenses_between(user_id, day, day).await?.into())
}

pub async fn monthly_report(state: &AppState, user_id: i64, month: &str) -> ApiResult<Report> {
    let (first, last) = month_bounds(month)?;
    Ok(state
        .store
        .expenses_between(user_id, first, last)
        .await?
        .into())
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;
    use crate::{
        expenses::repo_types::ExpenseInput,
        test_utils::{test_context, test_user},
    };

    #[test]
    fn month_bounds_handle_leap_years() {
        assert_eq!(
            month_bounds("2024-02").unwrap(),
            (date!(2024 - 02 - 01), date!(2024 - 02 - 29))
        );
        assert_eq!(
            month_bounds("2023-12").unwrap(),
            (date!(2023 - 12 - 01), date!(2023 - 12 - 31))
        );
        for bad in ["2024-13", "2024-2", "24-02", "202402", "abcd-ef"] {
            assert!(month_bounds(bad).is_err(), "{bad}");
        }
    }

    #[tokio::test]
    async fn reports_filter_by_period() {
        let ctx = test_context();
        let user = test_user(&ctx, "a@x.com").await;
        for (date, amount) in [
            (date!(2024 - 03 - 10), 100),
            (date!(2024 - 03 - 10), 25),
            (date!(2024 - 03 - 31), 5),
            (date!(2024 - 04 - 01), 999),
        ] {
            ctx.store
                .add_expense(
                    user.id,
                    &ExpenseInput {
                        date,
                        category: "Food".into(),
                        description: String::new(),
                        amount,
                    },
                )
                .await
                .unwrap();
        }

        let day = daily_report(&ctx.state, user.id, "2024-03-10").await.unwrap();
        assert_eq!(day.expenses.len(), 2);
        assert_eq!(day.total, 125);

        let month = monthly_report(&ctx.state, user.id, "2024-03").await.unwrap();
        assert_eq!(month.expenses.len(), 3);
        assert_eq!(month.total, 130);

        let err = daily_report(&ctx.state, user.id, "10/03/2024").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn leaderboard_orders_by_total() {
        let ctx = test_context();
        let low = test_user(&ctx, "a@x.com").await;
        let high = test_user(&ctx, "b@x.com").await;
        for (user, amount) in [(low.id, 10), (high.id, 50)] {
            ctx.store
                .add_expense(
                    user,
                    &ExpenseInput {
                        date: date!(2024 - 01 - 01),
                        category: "Misc".into(),
                        description: String::new(),
                        amount,
                    },
                )
                .await
                .unwrap();
        }

        let board = leaderboard(&ctx.state).await.unwrap();
        let totals: Vec<i64> = board.iter().map(|e| e.total_expenses).collect();
        assert_eq!(totals, vec![50, 10]);
    }
}

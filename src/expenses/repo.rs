use async_trait::async_trait;
use time::Date;

use crate::{
    db::{PgStore, StoreError},
    expenses::repo_types::{Expense, ExpenseInput, ExpensePage},
};

/// Expense persistence. Every mutation adjusts `users.total_expenses` in the
/// same transaction.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn add_expense(&self, user_id: i64, input: &ExpenseInput)
        -> Result<Expense, StoreError>;
    /// `None` when the expense does not exist or belongs to someone else.
    async fn update_expense(
        &self,
        user_id: i64,
        expense_id: i64,
        input: &ExpenseInput,
    ) -> Result<Option<Expense>, StoreError>;
    /// `false` when the expense does not exist or belongs to someone else.
    async fn delete_expense(&self, user_id: i64, expense_id: i64) -> Result<bool, StoreError>;
    async fn list_expenses(&self, user_id: i64) -> Result<Vec<Expense>, StoreError>;
    async fn page_expenses(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<ExpensePage, StoreError>;
    /// Expenses dated within `from..=to`, oldest first.
    async fn expenses_between(
        &self,
        user_id: i64,
        from: Date,
        to: Date,
    ) -> Result<Vec<Expense>, StoreError>;
}

#[async_trait]
impl ExpenseStore for PgStore {
    async fn add_expense(
        &self,
        user_id: i64,
        input: &ExpenseInput,
    ) -> Result<Expense, StoreError> {
        let mut tx = self.pool.begin().await?;

        let expense = sqlx::query_as::<_, Expense>(
            r#"
            INSERT INTO expenses (user_id, expense_date, category, description, amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, expense_date AS date, category, description, amount, created_at
            "#,
        )
        .bind(user_id)
        .bind(input.date)
        .bind(&input.category)
        .bind(&input.description)
        .bind(input.amount)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET total_expenses = total_expenses + $1 WHERE id = $2")
            .bind(input.amount)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(expense)
    }

    async fn update_expense(
        &self,
        user_id: i64,
        expense_id: i64,
        input: &ExpenseInput,
    ) -> Result<Option<Expense>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let old_amount = sqlx::query_scalar::<_, i64>(
            "SELECT amount FROM expenses WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(expense_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(old_amount) = old_amount else {
            return Ok(None);
        };

        let expense = sqlx::query_as::<_, Expense>(
            r#"
            UPDATE expenses
               SET expense_date = $1, category = $2, description = $3, amount = $4
             WHERE id = $5
            RETURNING id, user_id, expense_date AS date, category, description, amount, created_at
            "#,
        )
        .bind(input.date)
        .bind(&input.category)
        .bind(&input.description)
        .bind(input.amount)
        .bind(expense_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET total_expenses = total_expenses + $1 WHERE id = $2")
            .bind(input.amount - old_amount)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(expense))
    }

    async fn delete_expense(&self, user_id: i64, expense_id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let amount = sqlx::query_scalar::<_, i64>(
            "DELETE FROM expenses WHERE id = $1 AND user_id = $2 RETURNING amount",
        )
        .bind(expense_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(amount) = amount else {
            return Ok(false);
        };

        sqlx::query("UPDATE users SET total_expenses = total_expenses - $1 WHERE id = $2")
            .bind(amount)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_expenses(&self, user_id: i64) -> Result<Vec<Expense>, StoreError> {
        let rows = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, user_id, expense_date AS date, category, description, amount, created_at
            FROM expenses
            WHERE user_id = $1
            ORDER BY expense_date DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn page_expenses(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<ExpensePage, StoreError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM expenses WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let expenses = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, user_id, expense_date AS date, category, description, amount, created_at
            FROM expenses
            WHERE user_id = $1
            ORDER BY expense_date DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(ExpensePage { expenses, total })
    }

    async fn expenses_between(
        &self,
        user_id: i64,
        from: Date,
        to: Date,
    ) -> Result<Vec<Expense>, StoreError> {
        let rows = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, user_id, expense_date AS date, category, description, amount, created_at
            FROM expenses
            WHERE user_id = $1 AND expense_date BETWEEN $2 AND $3
            ORDER BY expense_date ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

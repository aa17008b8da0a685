use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    pub date: Date,
    pub category: String,
    pub description: String,
    pub amount: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Writable fields of an expense, used for both create and edit.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseInput {
    pub date: Date,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub amount: i64,
}

/// One page of a user's expenses plus the total row count.
#[derive(Debug, Clone)]
pub struct ExpensePage {
    pub expenses: Vec<Expense>,
    pub total: i64,
}

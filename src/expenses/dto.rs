use serde::{Deserialize, Serialize};

use crate::expenses::repo_types::Expense;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub per_page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    pub success: bool,
    pub expense: Expense,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedExpenses {
    pub expenses: Vec<Expense>,
    pub total_pages: i64,
    pub current_page: i64,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub success: bool,
    pub message: String,
}

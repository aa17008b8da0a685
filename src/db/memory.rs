use std::collections::HashMap;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::{
    auth::{
        repo::UserStore,
        repo_types::{NewUser, User},
    },
    downloads::{repo::DownloadStore, repo_types::Download},
    expenses::{
        repo::ExpenseStore,
        repo_types::{Expense, ExpenseInput, ExpensePage},
    },
    password_reset::{repo::ResetStore, repo_types::ResetRequest},
    premium::repo_types::LeaderboardEntry,
    purchase::{
        repo::OrderStore,
        repo_types::{ConfirmOutcome, Order, OrderStatus},
    },
};

/// In-process store with the same semantics as [`super::PgStore`].
///
/// All tables sit behind one mutex, so every trait method is atomic with
/// respect to every other.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    orders: Vec<Order>,
    resets: HashMap<Uuid, ResetRequest>,
    expenses: Vec<Expense>,
    downloads: Vec<Download>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user_mut(&mut self, id: i64) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    /// New running total of `user_id` after applying `delta`, or an error if
    /// it would leave the `i64` range. Nothing is written.
    fn checked_total(&self, user_id: i64, delta: i64) -> Result<Option<i64>, StoreError> {
        match self.users.iter().find(|u| u.id == user_id) {
            Some(u) => u
                .total_expenses
                .checked_add(delta)
                .map(Some)
                .ok_or(StoreError::TotalOutOfRange(user_id)),
            None => Ok(None),
        }
    }

    fn set_total(&mut self, user_id: i64, total: Option<i64>) {
        if let (Some(total), Some(user)) = (total, self.user_mut(user_id)) {
            user.total_expenses = total;
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_newest_first(rows: &mut [Expense]) {
    rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser<'_>) -> Result<User, StoreError> {
        let mut t = self.inner.lock().await;
        if t.users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::EmailTaken);
        }
        let user = User {
            id: t.next_id(),
            name: new.name.to_string(),
            email: new.email.to_string(),
            password_hash: new.password_hash.to_string(),
            is_premium_user: false,
            total_expenses: 0,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let t = self.inner.lock().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let t = self.inner.lock().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let t = self.inner.lock().await;
        let mut users: Vec<&User> = t.users.iter().collect();
        users.sort_by(|a, b| b.total_expenses.cmp(&a.total_expenses).then(a.id.cmp(&b.id)));
        Ok(users
            .into_iter()
            .map(|u| LeaderboardEntry {
                name: u.name.clone(),
                total_expenses: u.total_expenses,
            })
            .collect())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, user_id: i64, orderid: &str) -> Result<Order, StoreError> {
        let mut t = self.inner.lock().await;
        if t.orders.iter().any(|o| o.orderid == orderid) {
            return Err(StoreError::OrderExists(orderid.to_string()));
        }
        let order = Order {
            id: t.next_id(),
            user_id,
            orderid: orderid.to_string(),
            paymentid: None,
            status: OrderStatus::Pending,
            created_at: OffsetDateTime::now_utc(),
        };
        t.orders.push(order.clone());
        Ok(order)
    }

    async fn confirm_order(
        &self,
        user_id: i64,
        orderid: &str,
        paymentid: &str,
    ) -> Result<ConfirmOutcome, StoreError> {
        let mut t = self.inner.lock().await;
        let Some(order) = t
            .orders
            .iter_mut()
            .find(|o| o.orderid == orderid && o.user_id == user_id)
        else {
            return Ok(ConfirmOutcome::NotFound);
        };

        if order.status == OrderStatus::Successful {
            let order = order.clone();
            return Ok(if order.paymentid.as_deref() == Some(paymentid) {
                ConfirmOutcome::AlreadyConfirmed(order)
            } else {
                ConfirmOutcome::PaymentMismatch(order)
            });
        }

        order.paymentid = Some(paymentid.to_string());
        order.status = OrderStatus::Successful;
        let order = order.clone();
        if let Some(user) = t.user_mut(user_id) {
            user.is_premium_user = true;
        }
        Ok(ConfirmOutcome::Confirmed(order))
    }
}

#[async_trait]
impl ResetStore for MemoryStore {
    async fn create_reset_request(
        &self,
        id: Uuid,
        user_id: i64,
    ) -> Result<ResetRequest, StoreError> {
        let mut t = self.inner.lock().await;
        let request = ResetRequest {
            id,
            user_id,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        t.resets.insert(id, request.clone());
        Ok(request)
    }

    async fn find_active_reset_request(
        &self,
        id: Uuid,
    ) -> Result<Option<ResetRequest>, StoreError> {
        let t = self.inner.lock().await;
        Ok(t.resets.get(&id).filter(|r| r.is_active).cloned())
    }

    async fn deactivate_reset_request(&self, id: Uuid) -> Result<(), StoreError> {
        let mut t = self.inner.lock().await;
        if let Some(r) = t.resets.get_mut(&id) {
            r.is_active = false;
        }
        Ok(())
    }

    async fn consume_reset_request(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<i64>, StoreError> {
        let mut t = self.inner.lock().await;
        let user_id = match t.resets.get_mut(&id) {
            Some(r) if r.is_active => {
                r.is_active = false;
                r.user_id
            }
            _ => return Ok(None),
        };
        if let Some(user) = t.user_mut(user_id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(Some(user_id))
    }
}

#[async_trait]
impl ExpenseStore for MemoryStore {
    async fn add_expense(
        &self,
        user_id: i64,
        input: &ExpenseInput,
    ) -> Result<Expense, StoreError> {
        let mut t = self.inner.lock().await;
        let total = t.checked_total(user_id, input.amount)?;
        let expense = Expense {
            id: t.next_id(),
            user_id,
            date: input.date,
            category: input.category.clone(),
            description: input.description.clone(),
            amount: input.amount,
            created_at: OffsetDateTime::now_utc(),
        };
        t.expenses.push(expense.clone());
        t.set_total(user_id, total);
        Ok(expense)
    }

    async fn update_expense(
        &self,
        user_id: i64,
        expense_id: i64,
        input: &ExpenseInput,
    ) -> Result<Option<Expense>, StoreError> {
        let mut t = self.inner.lock().await;
        let Some(pos) = t
            .expenses
            .iter()
            .position(|e| e.id == expense_id && e.user_id == user_id)
        else {
            return Ok(None);
        };
        let delta = input
            .amount
            .checked_sub(t.expenses[pos].amount)
            .ok_or(StoreError::TotalOutOfRange(user_id))?;
        let total = t.checked_total(user_id, delta)?;

        let expense = &mut t.expenses[pos];
        expense.date = input.date;
        expense.category = input.category.clone();
        expense.description = input.description.clone();
        expense.amount = input.amount;
        let expense = expense.clone();
        t.set_total(user_id, total);
        Ok(Some(expense))
    }

    async fn delete_expense(&self, user_id: i64, expense_id: i64) -> Result<bool, StoreError> {
        let mut t = self.inner.lock().await;
        let Some(pos) = t
            .expenses
            .iter()
            .position(|e| e.id == expense_id && e.user_id == user_id)
        else {
            return Ok(false);
        };
        let delta = t.expenses[pos]
            .amount
            .checked_neg()
            .ok_or(StoreError::TotalOutOfRange(user_id))?;
        let total = t.checked_total(user_id, delta)?;
        t.expenses.remove(pos);
        t.set_total(user_id, total);
        Ok(true)
    }

    async fn list_expenses(&self, user_id: i64) -> Result<Vec<Expense>, StoreError> {
        let t = self.inner.lock().await;
        let mut rows: Vec<Expense> = t
            .expenses
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        sort_newest_first(&mut rows);
        Ok(rows)
    }

    async fn page_expenses(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<ExpensePage, StoreError> {
        let all = self.list_expenses(user_id).await?;
        let total = all.len() as i64;
        let expenses = all
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect();
        Ok(ExpensePage { expenses, total })
    }

    async fn expenses_between(
        &self,
        user_id: i64,
        from: Date,
        to: Date,
    ) -> Result<Vec<Expense>, StoreError> {
        let t = self.inner.lock().await;
        let mut rows: Vec<Expense> = t
            .expenses
            .iter()
            .filter(|e| e.user_id == user_id && e.date >= from && e.date <= to)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(rows)
    }
}

#[async_trait]
impl DownloadStore for MemoryStore {
    async fn record_download(
        &self,
        user_id: i64,
        object_key: &str,
    ) -> Result<Download, StoreError> {
        let mut t = self.inner.lock().await;
        let download = Download {
            id: t.next_id(),
            user_id,
            object_key: object_key.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.downloads.push(download.clone());
        Ok(download)
    }

    async fn list_downloads(&self, user_id: i64) -> Result<Vec<Download>, StoreError> {
        let t = self.inner.lock().await;
        let mut rows: Vec<Download> = t
            .downloads
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }
}

impl Store for MemoryStore {}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    async fn user(store: &MemoryStore, email: &str) -> User {
        store
            .create_user(NewUser {
                name: "Alice",
                email,
                password_hash: "hash",
            })
            .await
            .unwrap()
    }

    fn input(amount: i64) -> ExpenseInput {
        ExpenseInput {
            date: date!(2024 - 03 - 10),
            category: "Food".into(),
            description: "lunch".into(),
            amount,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        user(&store, "a@x.com").await;
        let err = store
            .create_user(NewUser {
                name: "Mallory",
                email: "a@x.com",
                password_hash: "other",
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken));
    }

    #[tokio::test]
    async fn expense_mutations_keep_running_total() {
        let store = MemoryStore::new();
        let u = user(&store, "a@x.com").await;

        let first = store.add_expense(u.id, &input(100)).await.unwrap();
        store.add_expense(u.id, &input(50)).await.unwrap();
        store.update_expense(u.id, first.id, &input(30)).await.unwrap();
        let total = store.find_user_by_id(u.id).await.unwrap().unwrap().total_expenses;
        assert_eq!(total, 80);

        assert!(store.delete_expense(u.id, first.id).await.unwrap());
        let total = store.find_user_by_id(u.id).await.unwrap().unwrap().total_expenses;
        assert_eq!(total, 50);
    }

    #[tokio::test]
    async fn expenses_of_other_users_are_untouchable() {
        let store = MemoryStore::new();
        let alice = user(&store, "a@x.com").await;
        let bob = user(&store, "b@x.com").await;
        let e = store.add_expense(alice.id, &input(10)).await.unwrap();

        assert!(store.update_expense(bob.id, e.id, &input(99)).await.unwrap().is_none());
        assert!(!store.delete_expense(bob.id, e.id).await.unwrap());
        assert_eq!(store.list_expenses(alice.id).await.unwrap()[0].amount, 10);
    }

    #[tokio::test]
    async fn total_overflow_is_an_error_and_writes_nothing() {
        let store = MemoryStore::new();
        let u = user(&store, "a@x.com").await;
        store.add_expense(u.id, &input(i64::MAX)).await.unwrap();

        let err = store.add_expense(u.id, &input(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::TotalOutOfRange(id) if id == u.id));
        assert_eq!(store.list_expenses(u.id).await.unwrap().len(), 1);
        let total = store.find_user_by_id(u.id).await.unwrap().unwrap().total_expenses;
        assert_eq!(total, i64::MAX);
    }

    #[tokio::test]
    async fn gateway_order_ids_are_unique() {
        let store = MemoryStore::new();
        let alice = user(&store, "a@x.com").await;
        let bob = user(&store, "b@x.com").await;
        store.create_order(alice.id, "order_1").await.unwrap();

        let err = store.create_order(bob.id, "order_1").await.unwrap_err();
        assert!(matches!(err, StoreError::OrderExists(ref id) if id == "order_1"));
        assert!(matches!(
            store.confirm_order(bob.id, "order_1", "pay_1").await.unwrap(),
            ConfirmOutcome::NotFound
        ));
    }
}

use async_trait::async_trait;

use crate::{
    db::{PgStore, StoreError},
    purchase::repo_types::{ConfirmOutcome, Order, OrderStatus},
};

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Record a new PENDING order for `user_id`. Fails with
    /// [`StoreError::OrderExists`] when `orderid` was already recorded.
    async fn create_order(&self, user_id: i64, orderid: &str) -> Result<Order, StoreError>;

    /// Settle `orderid` with `paymentid` and grant premium to its owner, as a
    /// single unit. Repeating a successful confirmation changes nothing.
    async fn confirm_order(
        &self,
        user_id: i64,
        orderid: &str,
        paymentid: &str,
    ) -> Result<ConfirmOutcome, StoreError>;
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create_order(&self, user_id: i64, orderid: &str) -> Result<Order, StoreError> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (user_id, orderid, status)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, orderid, paymentid, status, created_at
            "#,
        )
        .bind(user_id)
        .bind(orderid)
        .bind(OrderStatus::Pending)
        .fetch_one(&self.pool)
        .await;

        match order {
            Ok(order) => Ok(order),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::OrderExists(orderid.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn confirm_order(
        &self,
        user_id: i64,
        orderid: &str,
        paymentid: &str,
    ) -> Result<ConfirmOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent confirmations of the same order.
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, orderid, paymentid, status, created_at
            FROM orders
            WHERE orderid = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(orderid)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(order) = order else {
            return Ok(ConfirmOutcome::NotFound);
        };

        if order.status == OrderStatus::Successful {
            return Ok(if order.paymentid.as_deref() == Some(paymentid) {
                ConfirmOutcome::AlreadyConfirmed(order)
            } else {
                ConfirmOutcome::PaymentMismatch(order)
            });
        }

        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
               SET paymentid = $1, status = $2, updated_at = now()
             WHERE id = $3
            RETURNING id, user_id, orderid, paymentid, status, created_at
            "#,
        )
        .bind(paymentid)
        .bind(OrderStatus::Successful)
        .bind(order.id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET is_premium_user = TRUE WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ConfirmOutcome::Confirmed(order))
    }
}

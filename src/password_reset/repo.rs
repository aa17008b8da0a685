use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::{PgStore, StoreError},
    password_reset::repo_types::ResetRequest,
};

#[async_trait]
pub trait ResetStore: Send + Sync {
    async fn create_reset_request(&self, id: Uuid, user_id: i64)
        -> Result<ResetRequest, StoreError>;
    async fn find_active_reset_request(&self, id: Uuid)
        -> Result<Option<ResetRequest>, StoreError>;
    async fn deactivate_reset_request(&self, id: Uuid) -> Result<(), StoreError>;

    /// Deactivate an active request and store the new password hash for its
    /// user, as a single unit. Returns the user id, or `None` if the request
    /// was unknown or already used.
    async fn consume_reset_request(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<i64>, StoreError>;
}

#[async_trait]
impl ResetStore for PgStore {
    async fn create_reset_request(
        &self,
        id: Uuid,
        user_id: i64,
    ) -> Result<ResetRequest, StoreError> {
        let request = sqlx::query_as::<_, ResetRequest>(
            r#"
            INSERT INTO reset_requests (id, user_id, is_active)
            VALUES ($1, $2, TRUE)
            RETURNING id, user_id, is_active, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(request)
    }

    async fn find_active_reset_request(
        &self,
        id: Uuid,
    ) -> Result<Option<ResetRequest>, StoreError> {
        let request = sqlx::query_as::<_, ResetRequest>(
            r#"
            SELECT id, user_id, is_active, created_at
            FROM reset_requests
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    async fn deactivate_reset_request(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE reset_requests SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn consume_reset_request(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<Option<i64>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // The conditional update locks the row; a concurrent consumer blocks
        // here and then sees is_active = FALSE.
        let user_id = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE reset_requests
               SET is_active = FALSE
             WHERE id = $1 AND is_active
            RETURNING user_id
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            return Ok(None);
        };

        sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(user_id))
    }
}

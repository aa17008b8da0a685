use async_trait::async_trait;

use crate::{
    db::{PgStore, StoreError},
    downloads::repo_types::Download,
};

#[async_trait]
pub trait DownloadStore: Send + Sync {
    async fn record_download(&self, user_id: i64, object_key: &str)
        -> Result<Download, StoreError>;
    /// Newest first.
    async fn list_downloads(&self, user_id: i64) -> Result<Vec<Download>, StoreError>;
}

#[async_trait]
impl DownloadStore for PgStore {
    async fn record_download(
        &self,
        user_id: i64,
        object_key: &str,
    ) -> Result<Download, StoreError> {
        let download = sqlx::query_as::<_, Download>(
            r#"
            INSERT INTO downloads (user_id, object_key)
            VALUES ($1, $2)
            RETURNING id, user_id, object_key, created_at
            "#,
        )
        .bind(user_id)
        .bind(object_key)
        .fetch_one(&self.pool)
        .await?;
        Ok(download)
    }

    async fn list_downloads(&self, user_id: i64) -> Result<Vec<Download>, StoreError> {
        let rows = sqlx::query_as::<_, Download>(
            r#"
            SELECT id, user_id, object_key, created_at
            FROM downloads
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

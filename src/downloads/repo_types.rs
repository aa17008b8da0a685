use sqlx::FromRow;
use time::OffsetDateTime;

/// An expense export stored in the object store.
#[derive(Debug, Clone, FromRow)]
pub struct Download {
    pub id: i64,
    pub user_id: i64,
    pub object_key: String,
    pub created_at: OffsetDateTime,
}

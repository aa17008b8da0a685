//! Credential store: the persistence seam shared by every feature module.
//!
//! Each feature declares its own store trait next to its queries
//! (`auth::repo::UserStore`, `purchase::repo::OrderStore`, ...). [`Store`]
//! bundles them so the application state can hold a single
//! `Arc<dyn Store>`. [`PgStore`] is the production implementation;
//! [`MemoryStore`] keeps the same transactional guarantees in-process.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::{
    auth::repo::UserStore, downloads::repo::DownloadStore, expenses::repo::ExpenseStore,
    password_reset::repo::ResetStore, purchase::repo::OrderStore,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    EmailTaken,
    #[error("gateway order {0} already recorded")]
    OrderExists(String),
    #[error("running total of user {0} out of range")]
    TotalOutOfRange(i64),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait Store: UserStore + OrderStore + ResetStore + ExpenseStore + DownloadStore {
    /// Release pooled resources. Called once after the server stops.
    async fn close(&self) {}
}

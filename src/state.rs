use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{PgStore, Store},
    mail::{self, Mailer},
    purchase::gateway::{PaymentGateway, RazorpayGateway},
    storage::{Storage, StorageClient},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn StorageClient>,
    pub mailer: Arc<dyn Mailer>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    /// Connects every production collaborator described by `config`.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let store = Arc::new(
            PgStore::connect(&config.database_url, config.database_max_connections).await?,
        ) as Arc<dyn Store>;

        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;

        let mailer = mail::from_config(&config.mail)?;

        let gateway = Arc::new(RazorpayGateway::new(
            &config.gateway.base_url,
            &config.gateway.key_id,
            &config.gateway.key_secret,
        )) as Arc<dyn PaymentGateway>;

        Ok(Self::from_parts(store, config, storage, mailer, gateway))
    }

    pub fn from_parts(
        store: Arc<dyn Store>,
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
        mailer: Arc<dyn Mailer>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            store,
            config,
            storage,
            mailer,
            gateway,
        }
    }
}

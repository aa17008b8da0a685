//! In-process collaborators for unit and integration tests.
//!
//! [`test_context`] wires an [`AppState`] around a [`MemoryStore`] and fakes
//! for storage, mail and the payment gateway, keeping typed handles to each
//! so tests can inspect what happened.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    auth::{
        password::hash_password,
        repo::UserStore,
        repo_types::{NewUser, User},
    },
    config::{
        AppConfig, GatewayConfig, JwtConfig, MailConfig, PasswordConfig, StorageConfig,
    },
    db::{MemoryStore, Store},
    mail::{MailError, Mailer},
    purchase::gateway::{CreateOrder, GatewayError, GatewayOrder, PaymentGateway},
    state::AppState,
    storage::StorageClient,
};

pub const TEST_PASSWORD: &str = "pw1";

/// Records uploads in memory and presigns to `https://fake.local/<key>`.
#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<Vec<(String, Bytes, String)>>,
    fail_puts: AtomicBool,
}

impl FakeStorage {
    /// `(key, body, content_type)` of every object still stored.
    pub fn objects(&self) -> Vec<(String, Bytes, String)> {
        self.objects.lock().map(|o| o.clone()).unwrap_or_default()
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageClient for FakeStorage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            anyhow::bail!("fake storage unavailable");
        }
        if let Ok(mut objects) = self.objects.lock() {
            objects.push((key.to_string(), body, content_type.to_string()));
        }
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        if let Ok(mut objects) = self.objects.lock() {
            objects.retain(|(k, _, _)| k != key);
        }
        Ok(())
    }

    async fn presign_get(&self, key: &str, _seconds: u64) -> anyhow::Result<String> {
        Ok(format!("https://fake.local/{key}"))
    }
}

/// Keeps every reset link instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
    attempted: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    /// `(to, link)` pairs that were delivered.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Links of every send attempt, delivered or not.
    pub fn attempted(&self) -> Vec<String> {
        self.attempted.lock().map(|a| a.clone()).unwrap_or_default()
    }

    pub fn last_link(&self) -> Option<String> {
        self.attempted().pop()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_password_reset(&self, to_email: &str, link: &str) -> Result<(), MailError> {
        if let Ok(mut attempted) = self.attempted.lock() {
            attempted.push(link.to_string());
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::SendFailed("fake mailer down".into()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((to_email.to_string(), link.to_string()));
        }
        Ok(())
    }
}

/// Hands out `order_test_<n>` ids.
#[derive(Default)]
pub struct FakeGateway {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl FakeGateway {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, req: &CreateOrder) -> Result<GatewayOrder, GatewayError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected {
                status: 500,
                body: "fake gateway down".into(),
            });
        }
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewayOrder {
            id: format!("order_test_{n}"),
            amount: req.amount,
            currency: req.currency.clone(),
            status: "created".into(),
        })
    }

    fn key_id(&self) -> &str {
        "rzp_test_key"
    }
}

/// Configuration with cheap password hashing and placeholder endpoints.
pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".into(),
        database_max_connections: 1,
        host: "127.0.0.1".into(),
        port: 0,
        jwt: JwtConfig {
            secret: "test-secret".into(),
            issuer: "expense-tracker".into(),
            audience: "expense-tracker-users".into(),
            ttl_minutes: 60,
        },
        password: PasswordConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
        gateway: GatewayConfig {
            key_id: "rzp_test_key".into(),
            key_secret: "rzp_test_secret".into(),
            base_url: "http://127.0.0.1:9".into(),
            amount: 1000,
            currency: "INR".into(),
        },
        mail: MailConfig {
            smtp: None,
            from_email: "noreply@localhost".into(),
            from_name: "Expense Tracker".into(),
            public_base_url: "http://localhost:8080".into(),
        },
        storage: StorageConfig {
            endpoint: "http://127.0.0.1:9".into(),
            bucket: "test".into(),
            access_key: "test".into(),
            secret_key: "test".into(),
            region: "us-east-1".into(),
            download_ttl_secs: 600,
        },
    }
}

pub struct TestContext {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub storage: Arc<FakeStorage>,
    pub mailer: Arc<RecordingMailer>,
    pub gateway: Arc<FakeGateway>,
}

pub fn test_context() -> TestContext {
    let store = Arc::new(MemoryStore::new());
    let storage = Arc::new(FakeStorage::default());
    let mailer = Arc::new(RecordingMailer::default());
    let gateway = Arc::new(FakeGateway::default());

    let state = AppState::from_parts(
        store.clone() as Arc<dyn Store>,
        Arc::new(test_config()),
        storage.clone() as Arc<dyn StorageClient>,
        mailer.clone() as Arc<dyn Mailer>,
        gateway.clone() as Arc<dyn PaymentGateway>,
    );

    TestContext {
        state,
        store,
        storage,
        mailer,
        gateway,
    }
}

/// Inserts a user whose password is [`TEST_PASSWORD`].
pub async fn test_user(ctx: &TestContext, email: &str) -> User {
    let hash = hash_password(TEST_PASSWORD, &ctx.state.config.password)
        .unwrap_or_else(|e| panic!("hash test password: {e}"));
    ctx.store
        .create_user(NewUser {
            name: email.split('@').next().unwrap_or(email),
            email,
            password_hash: &hash,
        })
        .await
        .unwrap_or_else(|e| panic!("create test user {email}: {e}"))
}

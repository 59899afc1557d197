#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sea_orm_migration::MigratorTrait;
use tempfile::TempDir;
use tenant_context::{DeferredExecutor, DeferredExecutorConfig, ScopeGuard, TenantContext, TenantId};
use tenant_db::{DbConfig, TenantDb};
use tenant_directory::infra::storage::SeaOrmTenantStore;
use tenant_directory::infra::storage::migrations::Migrator;
use tenant_directory::{
    MailMessage, Mailer, NewTenant, TenantDirectory, TenantDirectoryConfig, TenantIdentity,
    TenantRegistry, UuidTokenIssuer, WelcomeNotifier,
};

pub fn identity(id: i64, domain: &str) -> TenantIdentity {
    TenantIdentity {
        id: TenantId::new(id),
        domain: domain.to_owned(),
        name: format!("tenant {id}"),
        email: format!("owner{id}@mail.example"),
    }
}

pub fn new_tenant(name: &str, domain: &str) -> NewTenant {
    NewTenant {
        name: name.to_owned(),
        domain: domain.to_owned(),
        email: format!("owner@{domain}"),
    }
}

/// File-backed SQLite with the module schema applied.
pub async fn sqlite_db() -> (TenantDb, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("tenancy.db").display());
    let db = TenantDb::connect(&DbConfig {
        url,
        max_conns: Some(1),
        ..Default::default()
    })
    .await
    .unwrap();
    Migrator::up(db.conn(), None).await.unwrap();
    (db, dir)
}

#[derive(Debug, Clone)]
pub struct Delivered {
    pub message: MailMessage,
    pub bound: Option<TenantId>,
    pub scoped: bool,
}

/// Mailer that records what it was asked to send and under which tenant.
#[derive(Default)]
pub struct Outbox {
    sent: Mutex<Vec<Delivered>>,
}

impl Outbox {
    pub fn sent(&self) -> Vec<Delivered> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Mailer for Outbox {
    async fn send(&self, message: &MailMessage) -> anyhow::Result<()> {
        self.sent.lock().push(Delivered {
            message: message.clone(),
            bound: TenantContext::try_current(),
            scoped: ScopeGuard::is_active(),
        });
        Ok(())
    }
}

pub struct TestEnv {
    pub db: TenantDb,
    pub directory: Arc<TenantDirectory>,
    pub registry: Arc<TenantRegistry>,
    pub executor: Arc<DeferredExecutor>,
    pub outbox: Arc<Outbox>,
    _dir: TempDir,
}

impl TestEnv {
    pub async fn new(cfg: TenantDirectoryConfig) -> Self {
        let (db, dir) = sqlite_db().await;
        let store = Arc::new(SeaOrmTenantStore::new(db.clone()));
        let directory = Arc::new(TenantDirectory::new(store, &cfg));
        let executor = Arc::new(DeferredExecutor::start(&DeferredExecutorConfig {
            workers: 2,
            queue_capacity: 16,
        }));
        let outbox = Arc::new(Outbox::default());
        let notifier = Arc::new(WelcomeNotifier::new(
            outbox.clone(),
            Arc::new(UuidTokenIssuer),
            cfg.scheme.clone(),
        ));
        let registry = Arc::new(TenantRegistry::new(
            db.clone(),
            directory.clone(),
            executor.clone(),
            notifier,
        ));
        Self {
            db,
            directory,
            registry,
            executor,
            outbox,
            _dir: dir,
        }
    }

    /// Let queued deferred work finish.
    pub async fn drain(&self) {
        self.executor.shutdown(Duration::from_secs(5)).await;
    }
}

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::tx::{AfterCommit, InfraError, TxError};

/// Connection settings for the shared tenant schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DbConfig {
    /// `sqlite://path?mode=rwc`, `postgres://...`
    pub url: String,
    pub max_conns: Option<u32>,
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Option<Duration>,
    pub sqlx_logging: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_owned(),
            max_conns: None,
            acquire_timeout: Some(Duration::from_secs(5)),
            sqlx_logging: false,
        }
    }
}

type TxFuture<'c, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>;

/// Database handle shared by all tenants.
///
/// Tenant confinement is not a property of the connection: it comes from the
/// scoped query extensions, which read the active filter of the current unit
/// of work.
#[derive(Clone, Debug)]
pub struct TenantDb {
    conn: DatabaseConnection,
}

impl TenantDb {
    #[must_use]
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// # Errors
    /// Returns the driver error if the pool cannot be opened.
    pub async fn connect(cfg: &DbConfig) -> Result<Self, DbErr> {
        let mut opts = ConnectOptions::new(cfg.url.clone());
        if let Some(n) = cfg.max_conns {
            opts.max_connections(n);
        }
        // Every SQLite in-memory connection is a separate database.
        if cfg.url.contains(":memory:") {
            opts.max_connections(1).min_connections(1);
        }
        if let Some(t) = cfg.acquire_timeout {
            opts.acquire_timeout(t);
        }
        opts.sqlx_logging(cfg.sqlx_logging);
        let conn = Database::connect(opts).await?;
        tracing::info!(engine = engine_name(&conn), "database connected");
        Ok(Self { conn })
    }

    #[must_use]
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    #[must_use]
    pub fn db_engine(&self) -> &'static str {
        engine_name(&self.conn)
    }

    /// Run `f` inside a transaction, then run its [`AfterCommit`] hooks once
    /// the commit succeeded.
    ///
    /// A domain error from `f` rolls the transaction back and drops the hooks.
    ///
    /// # Errors
    /// - `TxError::Domain` with the callback's error
    /// - `TxError::Infra` if begin, commit or rollback fails
    pub async fn in_transaction<T, E, F>(&self, f: F) -> Result<T, TxError<E>>
    where
        T: Send,
        E: Send,
        F: for<'c> FnOnce(&'c DatabaseTransaction, &'c mut AfterCommit) -> TxFuture<'c, T, E>
            + Send,
    {
        let txn = self.conn.begin().await.map_err(infra)?;
        let mut hooks = AfterCommit::default();

        match f(&txn, &mut hooks).await {
            Ok(value) => {
                txn.commit().await.map_err(|e| {
                    hooks_dropped_on_commit_failure(&e);
                    infra(e)
                })?;
                hooks.run();
                Ok(value)
            }
            Err(e) => {
                hooks.discard();
                txn.rollback().await.map_err(infra)?;
                Err(TxError::Domain(e))
            }
        }
    }

    /// `anyhow` flavoured [`TenantDb::in_transaction`] for infrastructure glue.
    ///
    /// # Errors
    /// Any error from the callback or from the transaction itself.
    pub async fn transaction<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        T: Send,
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
                &'c mut AfterCommit,
            ) -> TxFuture<'c, T, anyhow::Error>
            + Send,
    {
        self.in_transaction(f).await.map_err(|e| match e {
            TxError::Domain(err) => err,
            TxError::Infra(infra) => anyhow::anyhow!("transaction failed: {infra}"),
        })
    }
}

fn infra<E>(e: DbErr) -> TxError<E> {
    TxError::Infra(InfraError::new(e.to_string()))
}

fn hooks_dropped_on_commit_failure(e: &DbErr) {
    tracing::error!(error = %e, "commit failed, after-commit hooks dropped");
}

fn engine_name(conn: &DatabaseConnection) -> &'static str {
    use sea_orm::DatabaseBackend;

    match conn.get_database_backend() {
        DatabaseBackend::Postgres => "postgres",
        DatabaseBackend::MySql => "mysql",
        DatabaseBackend::Sqlite => "sqlite",
    }
}

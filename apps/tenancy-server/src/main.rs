mod config;
mod files;
mod logging;
mod shutdown;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tenant_context::DeferredExecutor;
use tenant_db::TenantDb;
use tenant_directory::api::rest::{ApiState, with_tenant_routes};
use tenant_directory::infra::storage::SeaOrmTenantStore;
use tenant_directory::infra::storage::migrations::Migrator;
use tenant_directory::{
    LogMailer, SiteConfigService, TenantDirectory, TenantRegistry, UuidTokenIssuer,
    WelcomeNotifier,
};
use tenant_files::LocalFileStorage;

use crate::config::AppConfig;

/// Multi-tenant HTTP server: resolves every request to its tenant by domain
#[derive(Parser)]
#[command(name = "tenancy-server")]
#[command(version)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address override, e.g. 0.0.0.0:8080
    #[arg(short, long)]
    bind: Option<std::net::SocketAddr>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server (default)
    Run,
    /// Validate configuration, print it and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Check => {
            println!("Configuration is valid");
            println!("{}", config.to_pretty_json()?);
            Ok(())
        }
        Commands::Run => {
            logging::init(&config.logging)?;
            run(config).await
        }
    }
}

async fn run(config: AppConfig) -> Result<()> {
    tracing::info!(bind = %config.server.bind, "tenancy server starting");

    let db = TenantDb::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    Migrator::up(db.conn(), None)
        .await
        .context("failed to apply migrations")?;
    tracing::info!(engine = db.db_engine(), "schema up to date");

    let store = Arc::new(SeaOrmTenantStore::new(db.clone()));
    let directory = Arc::new(TenantDirectory::new(store, &config.directory));
    let executor = Arc::new(DeferredExecutor::start(&config.deferred));
    let notifier = Arc::new(WelcomeNotifier::new(
        Arc::new(LogMailer),
        Arc::new(UuidTokenIssuer),
        config.directory.scheme.clone(),
    ));
    let registry = Arc::new(TenantRegistry::new(
        db.clone(),
        directory.clone(),
        executor.clone(),
        notifier,
    ));
    let storage = Arc::new(LocalFileStorage::new(config.storage.clone()));

    let app = with_tenant_routes(
        ApiState {
            directory,
            site_configs: Arc::new(SiteConfigService::new(db)),
            registry: Some(registry),
        },
        files::routes(storage),
    );

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!(addr = %config.server.bind, "listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::signal())
        .await;

    tracing::info!("draining deferred work");
    executor.shutdown(config.server.shutdown_grace).await;
    let stats = executor.stats();
    tracing::info!(
        completed = stats.completed,
        failed = stats.failed,
        rejected = stats.rejected,
        "deferred executor stopped"
    );

    served.context("server error")?;
    tracing::info!("tenancy server stopped");
    Ok(())
}

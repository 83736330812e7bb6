use anyhow::Context;
use axum::Router;
use bookstore_db::{Database, DbConfig};
use bookstore_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// A fully wired bookstore service: settings, store handle and modules.
pub struct App {
    settings: Settings,
    db: Database,
    registry: ModuleRegistry,
}

impl App {
    /// Connect to the configured store and register every module.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let db = Database::connect(DbConfig::from_settings(&settings.database))
            .await
            .with_context(|| "failed to connect to database")?;
        Self::with_database(settings, db)
    }

    /// Register every module over an already opened store.
    pub fn with_database(settings: Settings, db: Database) -> anyhow::Result<Self> {
        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &db)?;

        tracing::info!(modules = registry.module_count(), "modules registered");
        Ok(Self {
            settings,
            db,
            registry,
        })
    }

    /// Apply pending module migrations; returns how many ran.
    pub async fn migrate(&self) -> anyhow::Result<usize> {
        let migrations = self.registry.collect_migrations();
        let applied = self
            .db
            .migrate(&migrations)
            .await
            .with_context(|| "failed to apply migrations")?;
        Ok(applied)
    }

    /// HTTP router with every module mounted.
    pub fn router(&self) -> Router {
        bookstore_http::build_router(&self.registry, &self.settings)
    }

    /// Run the service until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let ctx = InitCtx {
            settings: &self.settings,
        };

        self.registry.init_modules(&ctx).await?;
        if self.settings.database.run_migrations {
            self.migrate().await?;
        }
        self.registry.start_modules(&ctx).await?;

        let served = bookstore_http::start_server(&self.registry, &self.settings, shutdown).await;

        self.registry.stop_modules().await?;
        self.db.close().await;
        served
    }
}

/// Resolves on Ctrl-C (and SIGTERM on unix).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

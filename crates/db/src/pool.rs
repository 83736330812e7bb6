use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use bookstore_kernel::settings::DatabaseSettings;
use bookstore_kernel::Migration;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;

/// Future returned by a unit of work run inside [`Database::transaction`].
///
/// It borrows the transaction's connection for `'c`.
pub type TxFuture<'c, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>;

#[derive(Debug, Clone)]
pub struct DbConfig {
    /// sqlx connection URL, e.g. `sqlite://bookstore.db?mode=rwc`.
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long to wait for a free pooled connection.
    pub connect_timeout: Duration,
    /// `None` keeps idle connections open forever.
    pub idle_timeout: Option<Duration>,
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        DbConfig {
            url: url.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }

    pub fn from_settings(settings: &DatabaseSettings) -> Self {
        DbConfig::new(settings.url.clone())
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .connect_timeout(Duration::from_millis(settings.connect_timeout_ms))
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Private in-memory database, used by tests.
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// pinned to one connection that is never recycled.
    pub fn in_memory() -> Self {
        DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// Handle to the relational store. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the connection pool described by `config`.
    pub async fn connect(config: DbConfig) -> DbResult<Self> {
        info!(url = %config.url, "initializing database connection");

        let mut connect_options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .foreign_keys(true)
            .create_if_missing(true);

        if !config.is_in_memory() {
            connect_options = connect_options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout);

        if config.is_in_memory() {
            pool_options = pool_options.max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "database pool created"
        );

        Ok(Database { pool })
    }

    /// Pool for read-only statements that need no transaction.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run `work` as one atomic unit of work.
    ///
    /// Commits when `work` returns `Ok`; rolls back and hands the error back
    /// unchanged when it returns `Err`.
    ///
    /// ```rust,ignore
    /// let id = db
    ///     .transaction(|conn| {
    ///         Box::pin(async move {
    ///             let done = sqlx::query("DELETE FROM book WHERE id = ?")
    ///                 .bind(7_i64)
    ///                 .execute(&mut *conn)
    ///                 .await?;
    ///             Ok::<_, DbError>(done.rows_affected())
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> TxFuture<'c, T, E> + Send,
        T: Send,
        E: From<DbError> + Send,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| E::from(begin_error(e)))?;
        debug!("transaction started");

        let outcome = work(&mut *tx).await;
        match outcome {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| E::from(DbError::TransactionFailed(e.to_string())))?;
                debug!("transaction committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "transaction rollback failed");
                } else {
                    debug!("transaction rolled back");
                }
                Err(err)
            }
        }
    }

    /// Apply pending module migrations; returns how many were applied.
    pub async fn migrate(&self, migrations: &[(String, Migration)]) -> DbResult<usize> {
        migrations::apply(&self.pool, migrations).await
    }

    /// `(module, id)` of every migration applied so far.
    pub async fn applied_migrations(&self) -> DbResult<Vec<(String, String)>> {
        migrations::applied(&self.pool).await
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub async fn close(&self) {
        info!("closing database connection pool");
        self.pool.close().await;
    }
}

fn begin_error(err: sqlx::Error) -> DbError {
    match DbError::from(err) {
        unavailable @ (DbError::PoolExhausted | DbError::ConnectionFailed(_)) => unavailable,
        other => DbError::TransactionFailed(other.to_string()),
    }
}

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Errors raised by the store.
#[derive(Debug, Error)]
pub enum DbError {
    /// The store could not be reached or the pool was closed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A module migration could not be applied.
    #[error("migration {module}/{id} failed: {message}")]
    MigrationFailed {
        module: String,
        id: String,
        message: String,
    },

    /// The store rejected a write because of a schema constraint
    /// (NOT NULL, CHECK, UNIQUE, foreign key).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Any other statement failure.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Begin, commit or rollback failed.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// All pooled connections stayed busy past the acquire timeout.
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// A stored row could not be mapped back into its domain type.
    #[error("corrupt {entity} row {id}: {message}")]
    CorruptRow {
        entity: &'static str,
        id: i64,
        message: String,
    },
}

impl DbError {
    /// True when the store itself is unavailable rather than the request
    /// being wrong.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DbError::ConnectionFailed(_) | DbError::PoolExhausted)
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => {
                    DbError::ConstraintViolation(db_err.message().to_string())
                }
                _ => DbError::QueryFailed(db_err.message().to_string()),
            },
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            sqlx::Error::Io(io) => DbError::ConnectionFailed(io.to_string()),
            other => DbError::QueryFailed(other.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

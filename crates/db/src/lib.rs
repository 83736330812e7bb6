//! Relational store access for the bookstore service.
//!
//! [`Database`] owns the SQLite pool. Writes go through
//! [`Database::transaction`], which commits when the unit of work succeeds
//! and rolls back when it fails. Module schemas are applied by
//! [`Database::migrate`].

pub mod error;
pub mod migrations;
pub mod pool;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, TxFuture};

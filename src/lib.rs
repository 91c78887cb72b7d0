//! DB Dialect Driver Library
//!
//! This library adapts a pooled SQL client (sqlx pools for SQLite, PostgreSQL
//! and MySQL) to the connection contract a query builder expects: explicit
//! acquire/release, transaction control as ordinary statements, and chunked
//! streaming of large result sets without server-side cursors.

pub mod config;
pub mod connection;
pub mod db;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod instrumentation;
pub mod models;
mod stream;

pub use config::{DatabaseConfig, PoolOptions};
pub use connection::Connection;
pub use db::{DbConnection, DbPool, RawResult, ReservedConnection, SqlClient};
pub use dialect::{Dialect, DialectAdapter, DialectConfig, PooledDialect, SqlxDialect};
pub use driver::{Driver, DriverConnection};
pub use error::{DbError, DbResult};
pub use instrumentation::{LogEvent, QueryLogger, init_tracing, query_logger};
pub use models::{
    CompiledQuery, ConnectionState, DEFAULT_CHUNK_SIZE, DatabaseType, IsolationLevel, QueryId,
    QueryParam, QueryResult, Row, TransactionSettings,
};

//! Dialect facade.
//!
//! Wires a pooled client and an optional query logger into a [`Driver`], and
//! describes what SQL the chosen backend accepts.

use crate::config::DatabaseConfig;
use crate::db::client::SqlClient;
use crate::db::pool::DbPool;
use crate::driver::Driver;
use crate::error::DbResult;
use crate::instrumentation::{LogEvent, QueryLogger, query_logger};
use crate::models::DatabaseType;

/// Construction parameters for a [`PooledDialect`].
pub struct DialectConfig<C> {
    pub client: C,
    pub logger: Option<QueryLogger>,
}

impl<C> DialectConfig<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            logger: None,
        }
    }

    /// Report every executed statement to `f`.
    pub fn with_logger<F>(mut self, f: F) -> Self
    where
        F: Fn(&LogEvent<'_>) + Send + Sync + 'static,
    {
        self.logger = Some(query_logger(f));
        self
    }
}

/// SQL capabilities of a backend, as needed by a query compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectAdapter {
    db_type: DatabaseType,
}

impl DialectAdapter {
    pub fn new(db_type: DatabaseType) -> Self {
        Self { db_type }
    }

    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    /// Whether `insert/update/delete ... returning` is accepted.
    pub fn supports_returning(&self) -> bool {
        matches!(self.db_type, DatabaseType::PostgreSQL | DatabaseType::SQLite)
    }

    /// Whether DDL can be rolled back as part of a transaction.
    pub fn supports_transactional_ddl(&self) -> bool {
        matches!(self.db_type, DatabaseType::PostgreSQL | DatabaseType::SQLite)
    }

    /// Placeholder for the `index`-th (1-based) positional parameter.
    pub fn placeholder(&self, index: usize) -> String {
        match self.db_type {
            DatabaseType::PostgreSQL => format!("${index}"),
            DatabaseType::MySQL | DatabaseType::SQLite => "?".to_string(),
        }
    }
}

/// Entry point used by the query-building layer.
pub trait Dialect {
    type Client: SqlClient;

    fn create_driver(&self) -> Driver<Self::Client>;

    fn create_adapter(&self) -> DialectAdapter;
}

/// Dialect over any cloneable pooled client.
pub struct PooledDialect<C> {
    config: DialectConfig<C>,
}

/// Dialect over the sqlx pools.
pub type SqlxDialect = PooledDialect<DbPool>;

impl<C: SqlClient + Clone> PooledDialect<C> {
    pub fn new(config: DialectConfig<C>) -> Self {
        Self { config }
    }
}

impl SqlxDialect {
    /// Connect a pool described by `url` and build a dialect over it.
    pub async fn connect(url: &str) -> DbResult<Self> {
        let config = DatabaseConfig::parse(url)?;
        let pool = DbPool::connect(&config).await?;
        Ok(Self::new(DialectConfig::new(pool)))
    }

    /// Same as [`connect`](Self::connect), reporting statements to `logger`.
    pub async fn connect_with_logger(url: &str, logger: QueryLogger) -> DbResult<Self> {
        let mut dialect = Self::connect(url).await?;
        dialect.config.logger = Some(logger);
        Ok(dialect)
    }
}

impl<C: SqlClient + Clone> Dialect for PooledDialect<C> {
    type Client = C;

    fn create_driver(&self) -> Driver<C> {
        Driver::new(self.config.client.clone(), self.config.logger.clone())
    }

    fn create_adapter(&self) -> DialectAdapter {
        DialectAdapter::new(self.config.client.database_type())
    }
}

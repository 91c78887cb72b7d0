//! Logical connection over one reserved physical connection.
//!
//! A [`Connection`] owns its reserved connection exclusively and moves through
//! `Idle -> InTransaction -> Idle` until it is released. Every statement it
//! runs, including transaction control and stream pages, goes through
//! [`Connection::execute_query`] so logging sees all of them.

use crate::db::client::{RawResult, ReservedConnection};
use crate::error::{DbError, DbResult};
use crate::instrumentation::{LogEvent, QueryLogger};
use crate::models::{
    CompiledQuery, ConnectionState, DatabaseType, IsolationLevel, QueryId, QueryResult,
    TransactionSettings,
};
use crate::stream;
use chrono::Utc;
use futures_util::stream::BoxStream;
use std::mem;
use std::time::Instant;
use tracing::{debug, warn};

const BEGIN_MARKER: &str = "transaction-begin";
const COMMIT_MARKER: &str = "transaction-commit";
const ROLLBACK_MARKER: &str = "transaction-rollback";

/// Largest chunk size a `LIMIT` clause accepts on every backend.
const MAX_CHUNK_SIZE: usize = i64::MAX as usize;

enum Lifecycle<R> {
    Idle(R),
    InTransaction(R),
    Released,
}

/// One logical connection handed out by a [`Driver`](crate::Driver).
pub struct Connection<R: ReservedConnection> {
    lifecycle: Lifecycle<R>,
    db_type: DatabaseType,
    logger: Option<QueryLogger>,
}

impl<R: ReservedConnection> Connection<R> {
    pub fn new(reserved: R, db_type: DatabaseType, logger: Option<QueryLogger>) -> Self {
        Self {
            lifecycle: Lifecycle::Idle(reserved),
            db_type,
            logger,
        }
    }

    pub fn state(&self) -> ConnectionState {
        match self.lifecycle {
            Lifecycle::Idle(_) => ConnectionState::Idle,
            Lifecycle::InTransaction(_) => ConnectionState::InTransaction,
            Lifecycle::Released => ConnectionState::Released,
        }
    }

    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    /// Execute a compiled query and normalize its result.
    ///
    /// Parameters are bound positionally by the client. Execution errors are
    /// returned exactly as the client reported them.
    pub async fn execute_query(&mut self, query: &CompiledQuery) -> DbResult<QueryResult> {
        let reserved = self.reserved_mut("execute a query")?;

        let started_at = Utc::now();
        let start = Instant::now();
        let outcome = reserved.unsafe_query(&query.sql, &query.parameters).await;
        let duration = start.elapsed();

        match outcome {
            Ok(raw) => {
                let result = normalize(raw);
                debug!(
                    query_id = %query.query_id,
                    sql = %query.sql,
                    params = query.parameters.len(),
                    rows = result.rows.len(),
                    affected = ?result.num_affected_rows,
                    elapsed_ms = duration.as_millis() as u64,
                    "Query executed"
                );
                if let Some(logger) = &self.logger {
                    logger(&LogEvent::Query {
                        query,
                        started_at,
                        duration,
                    });
                }
                Ok(result)
            }
            Err(error) => {
                warn!(
                    query_id = %query.query_id,
                    sql = %query.sql,
                    elapsed_ms = duration.as_millis() as u64,
                    error = %error,
                    "Query failed"
                );
                if let Some(logger) = &self.logger {
                    logger(&LogEvent::Error {
                        query,
                        error: &error,
                        started_at,
                        duration,
                    });
                }
                Err(error)
            }
        }
    }

    /// Start a transaction, optionally at a given isolation level.
    pub async fn begin_transaction(&mut self, settings: &TransactionSettings) -> DbResult<()> {
        match self.lifecycle {
            Lifecycle::Released => return Err(DbError::connection_released("begin a transaction")),
            Lifecycle::InTransaction(_) => {
                return Err(DbError::transaction("a transaction is already open"));
            }
            Lifecycle::Idle(_) => {}
        }

        for sql in begin_statements(self.db_type, settings.isolation_level)? {
            self.execute_query(&CompiledQuery::statement(sql, QueryId::marker(BEGIN_MARKER)))
                .await?;
        }

        self.lifecycle = match mem::replace(&mut self.lifecycle, Lifecycle::Released) {
            Lifecycle::Idle(reserved) => Lifecycle::InTransaction(reserved),
            other => other,
        };
        Ok(())
    }

    pub async fn commit_transaction(&mut self) -> DbResult<()> {
        self.finish_transaction("commit", COMMIT_MARKER).await
    }

    pub async fn rollback_transaction(&mut self) -> DbResult<()> {
        self.finish_transaction("rollback", ROLLBACK_MARKER).await
    }

    /// A failed `commit`/`rollback` leaves the connection marked as in a
    /// transaction so the caller can still roll back.
    async fn finish_transaction(&mut self, sql: &'static str, marker: &'static str) -> DbResult<()> {
        match self.lifecycle {
            Lifecycle::Released => {
                return Err(DbError::connection_released(format!("{sql} a transaction")));
            }
            Lifecycle::Idle(_) => {
                return Err(DbError::transaction(format!("no open transaction to {sql}")));
            }
            Lifecycle::InTransaction(_) => {}
        }

        self.execute_query(&CompiledQuery::statement(sql, QueryId::marker(marker)))
            .await?;

        self.lifecycle = match mem::replace(&mut self.lifecycle, Lifecycle::Released) {
            Lifecycle::InTransaction(reserved) => Lifecycle::Idle(reserved),
            other => other,
        };
        Ok(())
    }

    /// Stream the results of `query` in chunks of at most `chunk_size` rows.
    ///
    /// Reads without a row-limiting clause are paged with `LIMIT/OFFSET`, one
    /// round trip per chunk. Pages are only stable if the statement orders its
    /// rows deterministically; no ordering is added here. Writes and already
    /// limited statements run once and are chunked in memory.
    ///
    /// The stream borrows the connection, so nothing else runs on it until the
    /// stream is dropped. Dropping the stream early stops further fetches.
    pub fn stream_query(
        &mut self,
        query: &CompiledQuery,
        chunk_size: usize,
    ) -> DbResult<BoxStream<'_, DbResult<QueryResult>>> {
        if chunk_size == 0 {
            return Err(DbError::invalid_input("chunk size must be a positive integer"));
        }
        if chunk_size > MAX_CHUNK_SIZE {
            return Err(DbError::invalid_input(format!(
                "chunk size must not exceed {MAX_CHUNK_SIZE}"
            )));
        }
        self.reserved_mut("stream a query")?;

        Ok(stream::chunks(self, query.clone(), chunk_size))
    }

    /// Return the reserved connection to its pool.
    ///
    /// A connection still inside a transaction is discarded instead, so the
    /// pool never hands out a session with an open transaction.
    pub fn release_connection(&mut self) -> DbResult<()> {
        match mem::replace(&mut self.lifecycle, Lifecycle::Released) {
            Lifecycle::Idle(reserved) => {
                reserved.release();
                debug!("Connection released");
                Ok(())
            }
            Lifecycle::InTransaction(reserved) => {
                warn!("Connection released with an open transaction; discarding it");
                reserved.discard();
                Ok(())
            }
            Lifecycle::Released => Err(DbError::connection_released("release the connection")),
        }
    }

    fn reserved_mut(&mut self, operation: &str) -> DbResult<&mut R> {
        match &mut self.lifecycle {
            Lifecycle::Idle(reserved) | Lifecycle::InTransaction(reserved) => Ok(reserved),
            Lifecycle::Released => Err(DbError::connection_released(operation)),
        }
    }
}

impl<R: ReservedConnection> std::fmt::Debug for Connection<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .field("db_type", &self.db_type)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl<R: ReservedConnection> Drop for Connection<R> {
    fn drop(&mut self) {
        match mem::replace(&mut self.lifecycle, Lifecycle::Released) {
            Lifecycle::Released => {}
            Lifecycle::Idle(reserved) => {
                warn!("Connection dropped without being released; returning it to the pool");
                reserved.release();
            }
            Lifecycle::InTransaction(reserved) => {
                warn!("Connection dropped inside an open transaction; discarding it");
                reserved.discard();
            }
        }
    }
}

fn normalize(raw: RawResult) -> QueryResult {
    match raw {
        RawResult::Rows(rows) => QueryResult::from_rows(rows),
        RawResult::Command { rows, changes } => QueryResult {
            rows,
            num_affected_rows: Some(changes),
        },
    }
}

/// Statements that open a transaction on `db_type`.
fn begin_statements(
    db_type: DatabaseType,
    isolation_level: Option<IsolationLevel>,
) -> DbResult<Vec<String>> {
    let statements = match (db_type, isolation_level) {
        (DatabaseType::PostgreSQL, None) => vec!["start transaction".to_string()],
        (DatabaseType::PostgreSQL, Some(level)) => {
            vec![format!("start transaction isolation level {}", level.as_sql())]
        }
        (DatabaseType::MySQL, None) => vec!["start transaction".to_string()],
        // MySQL only accepts the isolation level on a separate statement.
        (DatabaseType::MySQL, Some(level)) => vec![
            format!("set transaction isolation level {}", level.as_sql()),
            "start transaction".to_string(),
        ],
        (DatabaseType::SQLite, None) => vec!["begin".to_string()],
        (DatabaseType::SQLite, Some(level)) => {
            return Err(DbError::invalid_input(format!(
                "SQLite does not support isolation level {level}"
            )));
        }
    };
    Ok(statements)
}

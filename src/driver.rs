//! Driver: hands out logical connections from a pooled client.
//!
//! The driver holds no per-connection state. Transaction state lives on each
//! [`Connection`] and ownership of a connection is simply whoever holds it.

use crate::connection::Connection;
use crate::db::client::SqlClient;
use crate::error::DbResult;
use crate::instrumentation::QueryLogger;
use crate::models::{CompiledQuery, QueryResult, TransactionSettings};
use futures_util::stream::BoxStream;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Logical connection type produced by a driver over client `C`.
pub type DriverConnection<C> = Connection<<C as SqlClient>::Reserved>;

pub struct Driver<C: SqlClient> {
    client: C,
    logger: Option<QueryLogger>,
    destroyed: AtomicBool,
}

impl<C: SqlClient> Driver<C> {
    pub fn new(client: C, logger: Option<QueryLogger>) -> Self {
        Self {
            client,
            logger,
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Nothing to set up: pools connect lazily or on construction.
    pub async fn init(&self) -> DbResult<()> {
        Ok(())
    }

    /// Reserve one physical connection and wrap it.
    ///
    /// Suspends while the pool has nothing free; pool errors are returned as-is.
    pub async fn acquire_connection(&self) -> DbResult<DriverConnection<C>> {
        let reserved = self.client.reserve().await?;
        debug!(db_type = %self.client.database_type(), "Connection acquired");
        Ok(Connection::new(
            reserved,
            self.client.database_type(),
            self.logger.clone(),
        ))
    }

    pub async fn begin_transaction(
        &self,
        connection: &mut DriverConnection<C>,
        settings: &TransactionSettings,
    ) -> DbResult<()> {
        connection.begin_transaction(settings).await
    }

    pub async fn commit_transaction(&self, connection: &mut DriverConnection<C>) -> DbResult<()> {
        connection.commit_transaction().await
    }

    pub async fn rollback_transaction(&self, connection: &mut DriverConnection<C>) -> DbResult<()> {
        connection.rollback_transaction().await
    }

    pub async fn execute_query(
        &self,
        connection: &mut DriverConnection<C>,
        query: &CompiledQuery,
    ) -> DbResult<QueryResult> {
        connection.execute_query(query).await
    }

    pub fn stream_query<'c>(
        &self,
        connection: &'c mut DriverConnection<C>,
        query: &CompiledQuery,
        chunk_size: usize,
    ) -> DbResult<BoxStream<'c, DbResult<QueryResult>>> {
        connection.stream_query(query, chunk_size)
    }

    pub async fn release_connection(&self, connection: &mut DriverConnection<C>) -> DbResult<()> {
        connection.release_connection()
    }

    /// Close the pool. Later calls do nothing.
    ///
    /// Connections still held by callers are left to the pool's own close
    /// semantics.
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            debug!("Driver already destroyed");
            return;
        }
        self.client.close().await;
        info!(db_type = %self.client.database_type(), "Connection pool closed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl<C: SqlClient + std::fmt::Debug> std::fmt::Debug for Driver<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("client", &self.client)
            .field("logger", &self.logger.is_some())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

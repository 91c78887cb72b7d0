//! Contract consumed from the pooled SQL client.
//!
//! The driver only needs four capabilities from the pool: reserve a physical
//! connection, run one parameterized statement on it, hand it back, and shut
//! the pool down. Anything implementing these traits can sit under a
//! [`Driver`](crate::Driver); [`DbPool`](crate::db::DbPool) is the sqlx-backed
//! implementation.

use crate::error::DbResult;
use crate::models::{DatabaseType, QueryParam, Row};
use async_trait::async_trait;

/// Raw shape of one execution as reported by the client.
///
/// Clients either hand back plain rows, or rows together with an affected-row
/// count when the statement was a write that reported one.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    Rows(Vec<Row>),
    Command { rows: Vec<Row>, changes: u64 },
}

/// A pool of physical connections.
#[async_trait]
pub trait SqlClient: Send + Sync {
    type Reserved: ReservedConnection;

    /// Backend behind this pool, used to pick transaction syntax.
    fn database_type(&self) -> DatabaseType;

    /// Check out one physical connection for exclusive use.
    ///
    /// May suspend while the pool has nothing available; fails once the pool's
    /// own acquire constraints are exhausted.
    async fn reserve(&self) -> DbResult<Self::Reserved>;

    /// Close the pool. Safe to call more than once.
    async fn close(&self);
}

/// One physical connection checked out of a [`SqlClient`].
#[async_trait]
pub trait ReservedConnection: Send {
    /// Execute `sql` with `params` bound positionally.
    async fn unsafe_query(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<RawResult>;

    /// Hand the connection back to its pool.
    fn release(self)
    where
        Self: Sized;

    /// Give up the connection without returning it for reuse.
    ///
    /// Used when the session may still hold an open transaction. Clients that
    /// cannot tell the difference just release.
    fn discard(self)
    where
        Self: Sized,
    {
        self.release();
    }
}

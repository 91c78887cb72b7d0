//! Data models shared by the driver layers.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod query;
pub mod transaction;

// Re-export commonly used types
pub use connection::{ConnectionState, DatabaseType};
pub use query::{CompiledQuery, DEFAULT_CHUNK_SIZE, QueryId, QueryParam, QueryResult, Row};
pub use transaction::{IsolationLevel, TransactionSettings};

//! Database access layer.
//!
//! This module provides:
//! - The pooled-client contract the driver is written against
//! - The sqlx-backed pool implementing it
//! - Parameter binding and row decoding per backend
//! - Statement classification used by streaming
//! - Database dispatch macros for reducing code duplication

pub mod client;
#[cfg(test)]
pub(crate) mod fake;
#[macro_use]
pub mod macros;
pub mod params;
pub mod pool;
pub mod statement;
pub mod types;

pub use client::{RawResult, ReservedConnection, SqlClient};
pub use pool::{DbConnection, DbPool};
pub use statement::StatementKind;

//! Query logging.
//!
//! Every statement the adapter executes (data queries, transaction control and
//! each stream page) is reported twice: as a `tracing` event, and to an
//! optional caller-supplied [`QueryLogger`] hook.

use crate::error::DbError;
use crate::models::CompiledQuery;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, prelude::*};

/// One finished execution, as seen by a [`QueryLogger`].
#[derive(Debug)]
pub enum LogEvent<'a> {
    Query {
        query: &'a CompiledQuery,
        started_at: DateTime<Utc>,
        duration: Duration,
    },
    Error {
        query: &'a CompiledQuery,
        error: &'a DbError,
        started_at: DateTime<Utc>,
        duration: Duration,
    },
}

impl<'a> LogEvent<'a> {
    pub fn query(&self) -> &'a CompiledQuery {
        match self {
            Self::Query { query, .. } | Self::Error { query, .. } => query,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Self::Query { duration, .. } | Self::Error { duration, .. } => *duration,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl fmt::Display for LogEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query {
                query, duration, ..
            } => write!(
                f,
                "[{}] {} ({} ms)",
                query.query_id,
                query.sql,
                duration.as_millis()
            ),
            Self::Error {
                query,
                error,
                duration,
                ..
            } => write!(
                f,
                "[{}] {} failed after {} ms: {}",
                query.query_id,
                query.sql,
                duration.as_millis(),
                error
            ),
        }
    }
}

/// Hook invoked once per executed statement.
pub type QueryLogger = Arc<dyn Fn(&LogEvent<'_>) + Send + Sync>;

/// Wrap a closure as a [`QueryLogger`].
pub fn query_logger<F>(f: F) -> QueryLogger
where
    F: Fn(&LogEvent<'_>) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Install a global `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `level`. Fails if a global subscriber is
/// already set.
pub fn init_tracing(level: &str, json: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        subscriber
            .with(
                tracing_fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    }
}

//! Emulated result streaming.
//!
//! The client has no server-side cursors, so a stream is either a sequence of
//! `LIMIT/OFFSET` page queries or a single execution split into chunks. Either
//! way nothing stays open on the server between polls, and dropping the stream
//! simply stops further fetches.

use crate::connection::Connection;
use crate::db::client::ReservedConnection;
use crate::db::statement::{StatementKind, paginate};
use crate::error::{DbError, DbResult};
use crate::models::{CompiledQuery, QueryResult, Row};
use futures_util::stream::{self, BoxStream};
use futures_util::{StreamExt, TryStreamExt};
use tracing::debug;

/// Stream `query` over `conn` in chunks of at most `chunk_size` rows.
///
/// `chunk_size` must already be validated as non-zero.
pub(crate) fn chunks<'a, R>(
    conn: &'a mut Connection<R>,
    query: CompiledQuery,
    chunk_size: usize,
) -> BoxStream<'a, DbResult<QueryResult>>
where
    R: ReservedConnection + 'a,
{
    let kind = StatementKind::classify(&query.sql);
    debug!(
        query_id = %query.query_id,
        chunk_size = chunk_size,
        paged = !kind.must_execute_once(),
        "Streaming query"
    );

    if kind.must_execute_once() {
        buffered(conn, query, chunk_size)
    } else {
        paged(conn, query, chunk_size)
    }
}

/// Execute once on first poll, then yield the rows chunk by chunk.
fn buffered<'a, R>(
    conn: &'a mut Connection<R>,
    query: CompiledQuery,
    chunk_size: usize,
) -> BoxStream<'a, DbResult<QueryResult>>
where
    R: ReservedConnection + 'a,
{
    stream::once(async move { conn.execute_query(&query).await })
        .map_ok(move |result| {
            stream::iter(
                partition(result.rows, chunk_size)
                    .into_iter()
                    .map(Ok::<_, DbError>),
            )
        })
        .try_flatten()
        .boxed()
}

/// One page query per chunk until a short or empty page.
///
/// A page larger than `chunk_size` means the page clause was not applied, and
/// ends the stream with an error instead of repeating rows.
fn paged<'a, R>(
    conn: &'a mut Connection<R>,
    query: CompiledQuery,
    chunk_size: usize,
) -> BoxStream<'a, DbResult<QueryResult>>
where
    R: ReservedConnection + 'a,
{
    stream::try_unfold(Some((conn, query, 0usize)), move |cursor| async move {
        let Some((conn, query, offset)) = cursor else {
            return Ok(None);
        };

        let page = CompiledQuery {
            sql: paginate(&query.sql, chunk_size, offset),
            parameters: query.parameters.clone(),
            query_id: query.query_id.clone(),
        };
        let rows = match conn.execute_query(&page).await {
            Ok(result) => result.rows,
            Err(error) => return Err(error),
        };

        if rows.is_empty() {
            return Ok(None);
        }
        if rows.len() > chunk_size {
            return Err(DbError::invalid_input(format!(
                "page returned {} rows for LIMIT {chunk_size}; the statement cannot be paged",
                rows.len()
            )));
        }
        let next = if rows.len() < chunk_size {
            None
        } else {
            Some((conn, query, offset + chunk_size))
        };
        Ok(Some((QueryResult::from_rows(rows), next)))
    })
    .boxed()
}

fn partition(rows: Vec<Row>, chunk_size: usize) -> Vec<QueryResult> {
    let mut chunks = Vec::with_capacity(rows.len().div_ceil(chunk_size));
    let mut rows = rows.into_iter();
    loop {
        let chunk: Vec<Row> = rows.by_ref().take(chunk_size).collect();
        if chunk.is_empty() {
            break;
        }
        chunks.push(QueryResult::from_rows(chunk));
    }
    chunks
}

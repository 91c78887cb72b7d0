//! Randomized tests for streaming and input validation.
//!
//! Streams are checked against an in-memory client implementing the public
//! client traits, so every chunk size and row count combination is cheap.

use async_trait::async_trait;
use db_dialect_driver::db::StatementKind;
use db_dialect_driver::{
    CompiledQuery, Connection, DatabaseType, DbResult, IsolationLevel, QueryParam, QueryResult,
    RawResult, ReservedConnection, Row, TransactionSettings,
};
use futures_util::TryStreamExt;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Generate random string of given length
fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Serves a fixed table, honouring a final `LIMIT n OFFSET m` line.
struct TableConnection {
    rows: Vec<Row>,
    executed: Arc<AtomicUsize>,
}

impl TableConnection {
    fn new(count: usize) -> (Self, Arc<AtomicUsize>) {
        let executed = Arc::new(AtomicUsize::new(0));
        let rows = (0..count)
            .map(|i| {
                let mut row = Row::new();
                row.insert("n".to_string(), json!(i));
                row
            })
            .collect();
        (
            Self {
                rows,
                executed: executed.clone(),
            },
            executed,
        )
    }
}

#[async_trait]
impl ReservedConnection for TableConnection {
    async fn unsafe_query(&mut self, sql: &str, _params: &[QueryParam]) -> DbResult<RawResult> {
        self.executed.fetch_add(1, Ordering::SeqCst);
        let Some(pos) = sql.rfind("\nLIMIT ") else {
            return Ok(RawResult::Rows(self.rows.clone()));
        };
        let tokens: Vec<&str> = sql[pos..].split_whitespace().collect();
        let limit: usize = tokens[1].parse().unwrap();
        let offset: usize = tokens[3].parse().unwrap();
        Ok(RawResult::Rows(
            self.rows.iter().skip(offset).take(limit).cloned().collect(),
        ))
    }

    fn release(self) {}
}

fn numbers(chunks: &[QueryResult]) -> Vec<u64> {
    chunks
        .iter()
        .flat_map(|c| c.rows.iter())
        .map(|row| row["n"].as_u64().unwrap())
        .collect()
}

#[tokio::test]
async fn fuzz_stream_chunk_counts() {
    let mut rng = rand::thread_rng();

    for _ in 0..200 {
        let total = rng.gen_range(0..500);
        let chunk_size = rng.gen_range(1..64);
        let (reserved, executed) = TableConnection::new(total);
        let mut conn = Connection::new(reserved, DatabaseType::PostgreSQL, None);

        let query = CompiledQuery::raw("select n from numbers order by n", vec![]);
        let chunks: Vec<QueryResult> = conn
            .stream_query(&query, chunk_size)
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(chunks.len(), total.div_ceil(chunk_size), "{total} rows / {chunk_size}");
        assert_eq!(numbers(&chunks), (0..total as u64).collect::<Vec<_>>());
        // One page per chunk, plus a trailing empty page when the total divides evenly.
        let expected_pages = total / chunk_size + 1;
        assert_eq!(executed.load(Ordering::SeqCst), expected_pages);

        conn.release_connection().unwrap();
    }
}

#[tokio::test]
async fn fuzz_limited_stream_executes_once() {
    let mut rng = rand::thread_rng();

    for _ in 0..100 {
        let total = rng.gen_range(0..300);
        let chunk_size = rng.gen_range(1..40);
        let (reserved, executed) = TableConnection::new(total);
        let mut conn = Connection::new(reserved, DatabaseType::SQLite, None);

        let query = CompiledQuery::raw("SELECT n FROM numbers ORDER BY n OFFSET 0", vec![]);
        let chunks: Vec<QueryResult> = conn
            .stream_query(&query, chunk_size)
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(executed.load(Ordering::SeqCst), 1);
        assert_eq!(chunks.len(), total.div_ceil(chunk_size));
        assert!(chunks.iter().all(|c| !c.rows.is_empty() && c.rows.len() <= chunk_size));
    }
}

#[test]
fn fuzz_isolation_level_rejects_garbage() {
    for _ in 0..500 {
        let len = rand::thread_rng().gen_range(0..40);
        let input = random_string(len);
        let parsed = IsolationLevel::from_str(&input);
        assert!(parsed.is_err(), "accepted {input:?}");
        assert!(parsed.unwrap_err().is_validation());
    }

    for injected in [
        "serializable; drop table person",
        "read committed --",
        "repeatable read' or '1'='1",
        "",
    ] {
        assert!(
            TransactionSettings::new()
                .with_isolation_level_str(injected)
                .is_err()
        );
    }
}

#[test]
fn fuzz_classify_never_panics() {
    let edge_cases = [
        String::new(),
        " ".to_string(),
        "\n\r\t".to_string(),
        "(".repeat(100),
        "ÜPDATE ü".to_string(),
        "insert".to_string(),
        ";".to_string(),
    ];
    for sql in edge_cases.iter().cloned().chain((0..200).map(|i| random_string(i % 50))) {
        let kind = StatementKind::classify(&sql);
        if kind.data_modification {
            let first = sql.trim().to_ascii_lowercase();
            assert!(["insert", "update", "delete"].iter().any(|k| first.starts_with(k)));
        }
    }
}

#[test]
fn test_release_through_public_traits() {
    let (reserved, _) = TableConnection::new(0);
    let mut conn = Connection::new(reserved, DatabaseType::MySQL, None);
    tokio_test::assert_ok!(conn.release_connection());
    tokio_test::assert_err!(conn.release_connection());
}

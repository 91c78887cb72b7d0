//! In-memory client used by unit tests.
//!
//! Records every statement it receives and answers `select`s from a fixed row
//! set, honouring a trailing `LIMIT n [OFFSET m]`.

use crate::db::client::{RawResult, ReservedConnection, SqlClient};
use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, QueryParam, Row};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared counters observed by tests.
#[derive(Debug, Clone, Default)]
pub(crate) struct Recorder {
    statements: Arc<Mutex<Vec<String>>>,
    releases: Arc<AtomicUsize>,
    discards: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn discards(&self) -> usize {
        self.discards.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Rows `{ id: 1.., name: "person N" }`.
pub(crate) fn numbered_rows(count: usize) -> Vec<Row> {
    (1..=count)
        .map(|i| {
            let mut row = Row::new();
            row.insert("id".to_string(), json!(i));
            row.insert("name".to_string(), json!(format!("person {i}")));
            row
        })
        .collect()
}

#[derive(Debug)]
pub(crate) struct FakeConnection {
    recorder: Recorder,
    rows: Vec<Row>,
    fail_on: Option<String>,
    ignore_limits: bool,
}

impl FakeConnection {
    pub fn new(recorder: Recorder) -> Self {
        Self {
            recorder,
            rows: Vec::new(),
            fail_on: None,
            ignore_limits: false,
        }
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    /// Return every row regardless of any `LIMIT` clause.
    pub fn ignoring_limits(mut self) -> Self {
        self.ignore_limits = true;
        self
    }

    /// Fail every statement containing `pattern`.
    pub fn failing_on(mut self, pattern: &str) -> Self {
        self.fail_on = Some(pattern.to_string());
        self
    }

    fn select(&self, sql: &str) -> Vec<Row> {
        let lower = sql.to_ascii_lowercase();
        let Some(pos) = lower.rfind("limit").filter(|_| !self.ignore_limits) else {
            return self.rows.clone();
        };
        let tokens: Vec<&str> = lower[pos + "limit".len()..].split_whitespace().collect();
        let limit = tokens.first().and_then(|t| t.parse().ok()).unwrap_or(usize::MAX);
        let offset = match tokens.get(1) {
            Some(&"offset") => tokens.get(2).and_then(|t| t.parse().ok()).unwrap_or(0),
            _ => 0,
        };
        self.rows.iter().skip(offset).take(limit).cloned().collect()
    }
}

#[async_trait]
impl ReservedConnection for FakeConnection {
    async fn unsafe_query(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<RawResult> {
        self.recorder.statements.lock().unwrap().push(sql.to_string());

        if let Some(pattern) = &self.fail_on {
            if sql.contains(pattern.as_str()) {
                return Err(DbError::client(std::io::Error::other(format!(
                    "statement failed: {sql}"
                ))));
            }
        }

        let lower = sql.trim_start().to_ascii_lowercase();
        if lower.starts_with("select") {
            return Ok(RawResult::Rows(self.select(sql)));
        }
        // One affected row per bound parameter.
        let is_write = ["insert", "update", "delete"]
            .iter()
            .any(|kw| lower.starts_with(kw));
        if is_write && !params.is_empty() {
            return Ok(RawResult::Command {
                rows: Vec::new(),
                changes: params.len() as u64,
            });
        }
        Ok(RawResult::Rows(Vec::new()))
    }

    fn release(self) {
        self.recorder.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn discard(self) {
        self.recorder.discards.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FakeClient {
    db_type: DatabaseType,
    recorder: Recorder,
    rows: Vec<Row>,
    exhausted: bool,
}

impl FakeClient {
    pub fn new(db_type: DatabaseType) -> Self {
        Self {
            db_type,
            recorder: Recorder::default(),
            rows: Vec::new(),
            exhausted: false,
        }
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    /// Make every `reserve` fail as if the pool timed out.
    pub fn exhausted(mut self) -> Self {
        self.exhausted = true;
        self
    }

    pub fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }
}

#[async_trait]
impl SqlClient for FakeClient {
    type Reserved = FakeConnection;

    fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    async fn reserve(&self) -> DbResult<FakeConnection> {
        if self.exhausted {
            return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        Ok(FakeConnection::new(self.recorder.clone()).with_rows(self.rows.clone()))
    }

    async fn close(&self) {
        self.recorder.closes.fetch_add(1, Ordering::SeqCst);
    }
}

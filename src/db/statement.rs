//! Lightweight statement classification.
//!
//! Classification is deliberately shallow: the first keyword decides whether a
//! statement modifies data, and a plain substring search for `limit`/`offset`
//! decides whether it already bounds its rows. Keywords inside string literals,
//! identifiers or subqueries are not told apart from real clauses. A
//! misclassified read only loses bounded-memory streaming (it is executed once
//! and chunked in memory), it never changes the rows returned.

/// Keywords that start a data-modification statement.
const DML_KEYWORDS: &[&str] = &["insert", "update", "delete"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementKind {
    pub data_modification: bool,
    pub row_limited: bool,
}

impl StatementKind {
    /// Classify SQL text (case-insensitive, surrounding whitespace ignored).
    pub fn classify(sql: &str) -> Self {
        let lower = sql.trim().to_ascii_lowercase();
        let first = lower
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or_default();

        Self {
            data_modification: DML_KEYWORDS.contains(&first),
            row_limited: lower.contains("limit") || lower.contains("offset"),
        }
    }

    /// Whether paging by appending `LIMIT/OFFSET` would change the statement's meaning.
    pub fn must_execute_once(&self) -> bool {
        self.data_modification || self.row_limited
    }
}

/// Append a page clause to `sql`, dropping any trailing statement terminator.
///
/// The clause goes on its own line so a trailing `--` comment cannot swallow it.
pub fn paginate(sql: &str, limit: usize, offset: usize) -> String {
    let base = sql.trim_end().trim_end_matches(';').trim_end();
    format!("{base}\nLIMIT {limit} OFFSET {offset}")
}

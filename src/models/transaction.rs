//! Transaction settings.

use crate::error::DbError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// Dirty reads allowed.
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    /// Strictest isolation.
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling used after `isolation level`.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "read uncommitted",
            Self::ReadCommitted => "read committed",
            Self::RepeatableRead => "repeatable read",
            Self::Serializable => "serializable",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for IsolationLevel {
    type Err = DbError;

    /// Accepts the SQL spelling in any case, with a single space, dash or
    /// underscore between words. Anything else is rejected rather than passed
    /// through.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_ascii_lowercase();

        [
            Self::ReadUncommitted,
            Self::ReadCommitted,
            Self::RepeatableRead,
            Self::Serializable,
        ]
        .into_iter()
        .find(|level| {
            let sql = level.as_sql();
            input == sql || input == sql.replace(' ', "_") || input == sql.replace(' ', "-")
        })
        .ok_or_else(|| DbError::invalid_input(format!("Unrecognized isolation level: {s:?}")))
    }
}

/// Settings consumed once when a transaction begins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolation_level: Option<IsolationLevel>,
}

impl TransactionSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the isolation level.
    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = Some(level);
        self
    }

    /// Parse and set the isolation level from its textual form.
    pub fn with_isolation_level_str(self, level: &str) -> Result<Self, DbError> {
        Ok(self.with_isolation_level(level.parse()?))
    }
}

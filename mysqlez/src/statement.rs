//! Statement classification, prepared-statement metadata and outcomes.

use std::str::FromStr;

use serde::Deserialize;
use strum::{Display, EnumString};

use crate::row::Row;

/// Leading SQL keyword of a statement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(try_from = "String")]
pub enum Verb {
    /// `SELECT`
    #[default]
    Select,
    /// `DESCRIBE`
    Describe,
    /// `INSERT`
    Insert,
    /// `UPDATE`
    Update,
    /// `DELETE`
    Delete,
    /// `REPLACE`
    Replace,
}

impl TryFrom<String> for Verb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(value.trim()).map_err(|_| format!("unknown statement operation `{value}`"))
    }
}

impl Verb {
    /// Classifies `sql` by its first word. Returns `None` for keywords this
    /// crate does not distinguish (`SET`, `CREATE`, `SHOW`, ...).
    #[must_use]
    pub fn of(sql: &str) -> Option<Self> {
        let sql = sql.trim_start();
        let end = sql
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(sql.len());
        Self::from_str(&sql[..end]).ok()
    }

    /// Result shape produced by [`Client::execute`](crate::Client::execute).
    #[must_use]
    pub const fn shape(verb: Option<Self>) -> Shape {
        match verb {
            Some(Self::Select | Self::Describe) => Shape::Rows,
            Some(Self::Insert) => Shape::Insert,
            _ => Shape::Affected,
        }
    }
}

/// What a statement returns, decided from its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Result rows.
    Rows,
    /// Generated id or an inserted flag.
    Insert,
    /// Affected-row count.
    Affected,
}

/// Metadata reported by the server when a statement is prepared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementMeta {
    /// Result column names in declared order; empty for statements without
    /// a result set.
    pub columns: Vec<String>,
    /// Number of `?` placeholders.
    pub param_count: usize,
}

impl StatementMeta {
    /// Returns `true` when the statement produces a result set.
    #[must_use]
    pub fn has_result_set(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// Counters reported after executing a statement without a result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Execution {
    /// Rows inserted, updated or deleted.
    pub rows_affected: u64,
    /// Id generated by an `AUTO_INCREMENT` column, zero if none.
    pub last_insert_id: u64,
}

/// Typed result of [`Client::execute`](crate::Client::execute) and
/// [`Client::run_batch`](crate::Client::run_batch).
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Rows of a `SELECT` / `DESCRIBE`.
    Rows(Vec<Row>),
    /// The single id generated by an INSERT.
    InsertId(u64),
    /// Ids generated by a batched INSERT, in execution order.
    InsertIds(Vec<u64>),
    /// An INSERT changed rows without generating an id.
    Inserted,
    /// Rows affected by any other statement (may be zero).
    Affected(u64),
}

impl QueryOutcome {
    /// Returns the rows, if this is a row result.
    #[must_use]
    pub fn into_rows(self) -> Option<Vec<Row>> {
        match self {
            Self::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// Returns the single generated id, if any.
    #[must_use]
    pub const fn insert_id(&self) -> Option<u64> {
        match self {
            Self::InsertId(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the affected-row count, if this is a count.
    #[must_use]
    pub const fn affected(&self) -> Option<u64> {
        match self {
            Self::Affected(n) => Some(*n),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("SELECT * FROM t", Some(Verb::Select))]
    #[test_case("  select 1", Some(Verb::Select))]
    #[test_case("describe t", Some(Verb::Describe))]
    #[test_case("Insert INTO t VALUES (1)", Some(Verb::Insert))]
    #[test_case("UPDATE t SET a = 1", Some(Verb::Update))]
    #[test_case("SELECT(1)", Some(Verb::Select))]
    #[test_case("SHOW TABLES", None)]
    #[test_case("", None)]
    fn verb_from_leading_keyword(sql: &str, expected: Option<Verb>) {
        assert_eq!(Verb::of(sql), expected);
    }

    #[test_case("select 1", Shape::Rows)]
    #[test_case("DESCRIBE t", Shape::Rows)]
    #[test_case("INSERT INTO t VALUES (1)", Shape::Insert)]
    #[test_case("DELETE FROM t", Shape::Affected)]
    #[test_case("REPLACE INTO t VALUES (1)", Shape::Affected)]
    #[test_case("SET @a = 1", Shape::Affected)]
    fn shape_follows_verb(sql: &str, expected: Shape) {
        assert_eq!(Verb::shape(Verb::of(sql)), expected);
    }

    #[test]
    fn verb_deserializes_case_insensitively() {
        let verb: Verb = serde_json::from_str(r#""insert""#).unwrap();
        assert_eq!(verb, Verb::Insert);
        assert!(serde_json::from_str::<Verb>(r#""merge""#).is_err());
    }
}

//! Error types for the `MySQL` convenience layer.
//!
//! Two kinds of failure are kept apart:
//!
//! * [`ConfigError`] -- the caller handed us something unusable (missing table
//!   name, `*` as an INSERT column list, a bad charset). Returned immediately
//!   and never sent to the server.
//! * [`DbError`] -- the server or the connection failed (connect, prepare,
//!   bind, execute, timeout). Recoverable; returned to the caller and, when a
//!   [`Diagnostics`](crate::Diagnostics) sink is attached, also recorded there.

use std::fmt;

use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;

/// Step of the client workflow that produced a [`DbError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    /// Opening the connection.
    Connect,
    /// Setting the connection character set.
    Charset,
    /// Preparing a statement on the server.
    Prepare,
    /// Matching and coercing parameters against the prepared statement.
    Bind,
    /// Executing a statement.
    Execute,
    /// Reading result rows.
    Fetch,
    /// `START TRANSACTION`, `COMMIT` or `ROLLBACK`.
    Transaction,
    /// A statement exceeded the configured deadline.
    Timeout,
    /// The connection was closed or discarded earlier.
    Closed,
}

/// Server error number, when the server reported one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DbErrorCode(pub u16);

impl fmt::Display for DbErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operational error returned by database operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbError {
    /// Workflow step that failed.
    pub operation: Operation,
    /// `MySQL` error number (`ER_*`), if the failure came from the server.
    pub code: Option<DbErrorCode>,
    /// Human-readable error message.
    pub message: String,
}

impl DbError {
    /// Creates a new error without a server error number.
    pub(crate) fn new(operation: Operation, message: impl Into<String>) -> Self {
        Self {
            operation,
            code: None,
            message: message.into(),
        }
    }

    /// Creates an error carrying a server error number.
    pub(crate) fn with_code(
        operation: Operation,
        code: u16,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            code: Some(DbErrorCode(code)),
            message: message.into(),
        }
    }

    /// Error returned once the connection is gone.
    pub(crate) fn closed() -> Self {
        Self::new(Operation::Closed, "connection is closed")
    }

    /// Re-attributes the error to `operation`. Timeouts and closed
    /// connections keep their own operation.
    pub(crate) const fn during(mut self, operation: Option<Operation>) -> Self {
        if let Some(operation) = operation {
            if !matches!(self.operation, Operation::Timeout | Operation::Closed) {
                self.operation = operation;
            }
        }
        self
    }

    /// Maps a driver error, keeping the `MySQL` error number when present.
    pub(crate) fn from_sqlx(operation: Operation, err: &sqlx::Error) -> Self {
        let code = err
            .as_database_error()
            .and_then(|db| db.try_downcast_ref::<MySqlDatabaseError>())
            .map(MySqlDatabaseError::number);
        match (err, code) {
            (sqlx::Error::Database(db), Some(code)) => {
                Self::with_code(operation, code, db.message())
            }
            _ => Self::new(operation, err.to_string()),
        }
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => {
                write!(f, "mysql {} error {code}: {}", self.operation, self.message)
            }
            None => write!(f, "mysql {} error: {}", self.operation, self.message),
        }
    }
}

impl std::error::Error for DbError {}

/// Result type for operational database calls.
pub type DbResult<T> = std::result::Result<T, DbError>;

/// Invalid input caught before anything reaches the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required connection setting is absent.
    #[error("missing connection setting `{0}`")]
    MissingKey(&'static str),

    /// A connection setting is present but unusable.
    #[error("invalid connection setting `{key}`: {reason}")]
    InvalidSetting {
        /// Setting name.
        key: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// No table name was given.
    #[error("a table name is required")]
    MissingTable,

    /// An INSERT needs an explicit column list.
    #[error("expecting a list of columns for {0}")]
    MissingColumns(&'static str),

    /// `*` cannot be expanded into named columns.
    #[error("cannot compile '*' as a column list")]
    WildcardColumns,

    /// A column name was empty after trimming.
    #[error("column names cannot be empty")]
    EmptyColumn,

    /// A bulk insert was given no rows.
    #[error("bulk insert needs at least one row of values")]
    NoRows,

    /// A bulk insert row does not match the column list.
    #[error("row {row} has {actual} values, expected {expected}")]
    RowWidth {
        /// Zero-based row index.
        row: usize,
        /// Number of columns.
        expected: usize,
        /// Number of values in the row.
        actual: usize,
    },
}

/// Any error produced by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Programmer or configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Operational error reported by the server or connection.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl Error {
    /// Returns `true` for errors that came from the server or connection
    /// rather than from invalid input.
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        matches!(self, Self::Db(_))
    }

    /// Returns the operational error, if this is one.
    #[must_use]
    pub const fn as_db(&self) -> Option<&DbError> {
        match self {
            Self::Db(err) => Some(err),
            Self::Config(_) => None,
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_operation_and_code() {
        let err = DbError::with_code(Operation::Prepare, 1064, "syntax error");
        assert_eq!(err.to_string(), "mysql prepare error 1064: syntax error");

        let err = DbError::new(Operation::Bind, "expected 3 parameters, got 2");
        assert_eq!(
            err.to_string(),
            "mysql bind error: expected 3 parameters, got 2"
        );
    }

    #[test]
    fn db_result_holds_a_db_error() {
        let result: DbResult<u64> = Err(DbError::closed());
        let err: Error = result.unwrap_err().into();
        assert!(err.is_operational());
    }

    #[test]
    fn config_errors_are_not_operational() {
        let err = Error::from(ConfigError::WildcardColumns);
        assert!(!err.is_operational());
        assert!(err.as_db().is_none());

        let err = Error::from(DbError::closed());
        assert!(err.is_operational());
        assert_eq!(err.as_db().map(|e| e.operation), Some(Operation::Closed));
    }
}

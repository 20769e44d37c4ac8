//! Driver seam between [`Client`](crate::Client) and the wire protocol.
//!
//! [`Client`](crate::Client) owns all the convenience logic (result shapes,
//! batching, binding rules); a backend only has to prepare, execute and
//! fetch. [`MySqlBackend`](crate::MySqlBackend) is the production
//! implementation.

use async_trait::async_trait;

use crate::error::DbResult;
use crate::statement::{Execution, StatementMeta};
use crate::value::Value;

/// One live database session.
///
/// Methods take `&mut self`: a session serves one statement at a time.
#[async_trait]
pub trait Backend: Send {
    /// Prepares `sql` and reports its result columns and placeholder count.
    ///
    /// # Errors
    ///
    /// Returns a prepare error if the server rejects the statement.
    async fn prepare(&mut self, sql: &str) -> DbResult<StatementMeta>;

    /// Executes a prepared statement and returns every record, each in
    /// column order.
    ///
    /// # Errors
    ///
    /// Returns an execute or fetch error from the server.
    async fn fetch(&mut self, sql: &str, params: &[Value]) -> DbResult<Vec<Vec<Value>>>;

    /// Executes a prepared statement that produces no result set.
    ///
    /// # Errors
    ///
    /// Returns an execute error from the server.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> DbResult<Execution>;

    /// Sends `sql` as plain text, without preparing it. Used for transaction
    /// control, `SET NAMES` and the bulk insert path.
    ///
    /// # Errors
    ///
    /// Returns an execute error from the server.
    async fn execute_raw(&mut self, sql: &str) -> DbResult<Execution>;

    /// Closes the session. Later calls fail with a closed error.
    ///
    /// # Errors
    ///
    /// Returns an error if the goodbye handshake fails.
    async fn close(&mut self) -> DbResult<()>;
}

//! The convenience client.
//!
//! [`Client`] prepares every statement first, checks the parameters against
//! the server-reported placeholder count, binds a fresh argument list, and
//! shapes the result from the statement's leading keyword. Every operational
//! failure is returned to the caller, logged, and handed to the attached
//! [`Diagnostics`] sink; nothing is kept on the client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::builder::{quote_table, ColumnList};
use crate::bulk::render_bulk_insert;
use crate::config::ConnectionConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{ConfigError, DbError, DbResult, Error, Operation, Result};
use crate::mysql::MySqlBackend;
use crate::row::Row;
use crate::statement::{QueryOutcome, Shape, StatementMeta, Verb};
use crate::transaction::{BatchInput, BatchResult, Transaction};
use crate::value::{bind_row, Params, TypeCode, Value};

/// Runs one backend call under the statement deadline and reports failures.
macro_rules! call_backend {
    ($client:expr, $backend:ident => $call:expr) => {
        call_backend!($client, $backend => $call, during None)
    };
    ($client:expr, $backend:ident => $call:expr, during $op:expr) => {{
        let deadline = $client.statement_timeout;
        let result = match $client.backend.as_mut() {
            Some($backend) => with_deadline(deadline, $call)
                .await
                .map_err(|err| err.during($op)),
            None => Err(DbError::closed()),
        };
        $client.observe(result)
    }};
}

/// A `MySQL` connection with convenience helpers.
///
/// Created by [`Client::connect`]; a failed connect never yields a client.
/// Closed explicitly with [`Client::close`] or when dropped. All methods take
/// `&mut self`, so one client serves one statement at a time.
pub struct Client<B: Backend = MySqlBackend> {
    backend: Option<B>,
    statement_timeout: Option<Duration>,
    diagnostics: Option<Arc<dyn Diagnostics>>,
    pub(crate) pending_rollback: bool,
}

impl Client<MySqlBackend> {
    /// Connects to `MySQL` and applies the configured character set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid settings and [`Error::Db`] with
    /// [`Operation::Connect`] if the server cannot be reached or refuses the
    /// credentials. A failing `SET NAMES` is not an error; see
    /// [`with_backend`](Client::with_backend).
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        Self::connect_with_diagnostics(config, None).await
    }

    /// Like [`connect`](Self::connect), reporting errors to `diagnostics`
    /// from the connection attempt onwards.
    ///
    /// # Errors
    ///
    /// Same as [`connect`](Self::connect).
    pub async fn connect_with_diagnostics(
        config: &ConnectionConfig,
        diagnostics: Option<Arc<dyn Diagnostics>>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            target: "mysqlez",
            host = %config.host,
            port = config.port,
            user = %config.user,
            database = %config.name,
            "connecting"
        );
        let backend =
            match with_deadline(config.statement_timeout, MySqlBackend::connect(config)).await {
                Ok(backend) => backend,
                Err(err) => {
                    let err = err.during(Some(Operation::Connect));
                    report(diagnostics.as_deref(), &err);
                    return Err(err.into());
                }
            };
        Self::with_backend(backend, config, diagnostics).await
    }
}

impl<B: Backend> Client<B> {
    /// Wraps an already open session and applies `config.charset` with
    /// `SET NAMES`.
    ///
    /// A charset failure is logged and reported to `diagnostics` as
    /// [`Operation::Charset`], and the client is still returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` does not validate.
    pub async fn with_backend(
        backend: B,
        config: &ConnectionConfig,
        diagnostics: Option<Arc<dyn Diagnostics>>,
    ) -> Result<Self> {
        config.validate()?;
        let mut client = Self {
            backend: Some(backend),
            statement_timeout: config.statement_timeout,
            diagnostics,
            pending_rollback: false,
        };

        let set_names = format!("SET NAMES {}", config.charset);
        let applied = call_backend!(
            client,
            backend => backend.execute_raw(&set_names),
            during Some(Operation::Charset)
        );
        if applied.is_ok() {
            debug!(target: "mysqlez", charset = %config.charset, "character set applied");
        }
        Ok(client)
    }

    /// Attaches a diagnostics sink, replacing any previous one.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Sets the per-statement deadline. `None` waits indefinitely.
    ///
    /// When a deadline expires the connection is discarded: its state on the
    /// server is unknown, so every later call fails with
    /// [`Operation::Closed`].
    pub fn set_statement_timeout(&mut self, timeout: Option<Duration>) {
        self.statement_timeout = timeout;
    }

    /// Current per-statement deadline.
    #[must_use]
    pub const fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout
    }

    /// Returns `true` until the client is closed or its connection discarded.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    /// Prepares, binds and executes one statement.
    ///
    /// `params` may be a single scalar or a list. Without `type_codes` every
    /// parameter binds as a string. The trimmed statement's first word picks
    /// the result: rows for `SELECT`/`DESCRIBE`, the generated id (or
    /// [`QueryOutcome::Inserted`]) for `INSERT`, otherwise the affected-row
    /// count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Db`] on prepare, bind or execute failure, including
    /// a parameter count that differs from the placeholder count, and an
    /// INSERT that neither generated an id nor changed a row.
    pub async fn execute(
        &mut self,
        sql: &str,
        params: impl Into<Params>,
        type_codes: Option<&str>,
    ) -> Result<QueryOutcome> {
        let sql = sql.trim();
        let params = params.into();
        debug!(target: "mysqlez", sql, params = params.len(), "execute");

        self.settle().await?;
        let meta = call_backend!(self, backend => backend.prepare(sql))?;
        if meta.param_count != params.len() {
            return Err(self.reject(DbError::new(
                Operation::Bind,
                format!(
                    "statement has {} placeholders but {} parameters were given",
                    meta.param_count,
                    params.len()
                ),
            )));
        }
        let values = params.bind(type_codes).map_err(|err| self.reject(err))?;

        match Verb::shape(Verb::of(sql)) {
            Shape::Rows => {
                let records = call_backend!(self, backend => backend.fetch(sql, &values))?;
                Ok(QueryOutcome::Rows(Row::from_records(&meta.columns, records)))
            }
            Shape::Insert => {
                let done = call_backend!(self, backend => backend.execute(sql, &values))?;
                if done.last_insert_id != 0 {
                    Ok(QueryOutcome::InsertId(done.last_insert_id))
                } else if done.rows_affected > 0 {
                    Ok(QueryOutcome::Inserted)
                } else {
                    Err(self.reject(DbError::new(Operation::Execute, "no rows inserted")))
                }
            }
            Shape::Affected => {
                let done = call_backend!(self, backend => backend.execute(sql, &values))?;
                Ok(QueryOutcome::Affected(done.rows_affected))
            }
        }
    }

    /// Runs a read statement and returns its rows; statements that do not
    /// produce rows yield an empty list.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute).
    pub async fn query_rows(
        &mut self,
        sql: &str,
        params: impl Into<Params>,
        type_codes: Option<&str>,
    ) -> Result<Vec<Row>> {
        let outcome = self.execute(sql, params, type_codes).await?;
        Ok(outcome.into_rows().unwrap_or_default())
    }

    /// Column names of `table`, from `DESCRIBE`. A `schema.table` name is
    /// quoted part by part.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingTable`] for an empty name and
    /// [`Error::Db`] if the statement fails.
    pub async fn table_fields(&mut self, table: &str) -> Result<Vec<String>> {
        let table = table.trim();
        if table.is_empty() {
            return Err(ConfigError::MissingTable.into());
        }
        let rows = self
            .query_rows(&format!("DESCRIBE {}", quote_table(table)), (), None)
            .await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("Field").and_then(Value::as_str))
            .map(str::to_owned)
            .collect())
    }

    /// Runs one prepared statement once per parameter row inside
    /// `START TRANSACTION` / `COMMIT`.
    ///
    /// `rows` may be a scalar, a flat list or a list of rows; see
    /// [`BatchInput`]. Without `type_codes`, or with an empty string, the
    /// statement runs once with no parameters and no transaction.
    ///
    /// Returns the generated id when exactly one was produced, all of them in
    /// order when several were, otherwise the rows of the last execution for
    /// a statement with a result set, or the affected rows summed over all
    /// executions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Db`] if preparing fails, a row does not match the
    /// type codes, or any execution fails; in the last two cases the
    /// transaction is rolled back first.
    pub async fn run_batch(
        &mut self,
        sql: &str,
        type_codes: Option<&str>,
        rows: impl Into<BatchInput>,
    ) -> Result<QueryOutcome> {
        let sql = sql.trim();
        self.settle().await?;
        let meta = call_backend!(self, backend => backend.prepare(sql))?;
        let mut batch = BatchResult::default();

        let Some(type_codes) = type_codes.filter(|codes| !codes.is_empty()) else {
            debug!(target: "mysqlez", sql, "batch without parameters");
            self.batch_step(sql, &meta, &[], &mut batch).await?;
            return Ok(batch.finish(&meta));
        };

        let codes = TypeCode::parse_all(type_codes).map_err(|err| self.reject(err))?;
        if meta.param_count != codes.len() {
            return Err(self.reject(DbError::new(
                Operation::Bind,
                format!(
                    "statement has {} placeholders but {} type codes were given",
                    meta.param_count,
                    codes.len()
                ),
            )));
        }
        let rows = rows.into().normalize(codes.len());
        debug!(target: "mysqlez", sql, rows = rows.len(), "batch");

        self.control("START TRANSACTION").await?;
        for values in rows {
            let step = match bind_row(&codes, values) {
                Ok(values) => self.batch_step(sql, &meta, &values, &mut batch).await,
                Err(err) => {
                    self.report(&err);
                    Err(err)
                }
            };
            if let Err(err) = step {
                if self.is_open() {
                    let _ = self.control("ROLLBACK").await;
                }
                return Err(err.into());
            }
        }
        self.control("COMMIT").await?;
        Ok(batch.finish(&meta))
    }

    async fn batch_step(
        &mut self,
        sql: &str,
        meta: &StatementMeta,
        values: &[Value],
        batch: &mut BatchResult,
    ) -> DbResult<()> {
        if meta.has_result_set() {
            let records = call_backend!(self, backend => backend.fetch(sql, values))?;
            batch.records = Some(records);
        } else {
            let done = call_backend!(self, backend => backend.execute(sql, values))?;
            batch.record(done);
        }
        Ok(())
    }

    /// Begins an explicit transaction.
    ///
    /// The guard must be finished with
    /// [`commit`](Transaction::commit) or [`rollback`](Transaction::rollback);
    /// a guard dropped unfinished makes the client issue `ROLLBACK` before its
    /// next statement.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Db`] if `START TRANSACTION` fails.
    pub async fn transaction(&mut self) -> Result<Transaction<'_, B>> {
        Transaction::begin(self).await
    }

    /// Inserts `rows` with one multi-row INSERT carrying inline, escaped
    /// literal values. Returns the affected-row count.
    ///
    /// Table and column names are interpolated into the SQL text; never pass
    /// untrusted input for them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty table, column list or row
    /// list, and [`Error::Db`] if the statement fails.
    pub async fn bulk_insert(
        &mut self,
        table: &str,
        columns: impl Into<ColumnList>,
        rows: &[Vec<Value>],
        update_on_duplicate: bool,
    ) -> Result<u64> {
        let sql = render_bulk_insert(table, &columns.into(), rows, update_on_duplicate)?;
        debug!(target: "mysqlez", table, rows = rows.len(), "bulk insert");

        self.settle().await?;
        let done = call_backend!(self, backend => backend.execute_raw(&sql))?;
        Ok(done.rows_affected)
    }

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Db`] if the server does not acknowledge the close.
    /// The connection is released either way.
    pub async fn close(mut self) -> Result<()> {
        let Some(mut backend) = self.backend.take() else {
            return Ok(());
        };
        info!(target: "mysqlez", "closing connection");
        backend.close().await.map_err(|err| self.reject(err))
    }

    /// Issues a transaction-control statement over the text protocol.
    pub(crate) async fn control(&mut self, sql: &'static str) -> DbResult<()> {
        debug!(target: "mysqlez", sql, "transaction control");
        call_backend!(
            self,
            backend => backend.execute_raw(sql),
            during Some(Operation::Transaction)
        )
        .map(|_| ())
    }

    /// Rolls back a transaction whose guard was dropped unfinished.
    pub(crate) async fn settle(&mut self) -> DbResult<()> {
        if self.pending_rollback {
            self.pending_rollback = false;
            warn!(target: "mysqlez", "rolling back abandoned transaction");
            self.control("ROLLBACK").await?;
        }
        Ok(())
    }

    /// Reports a failed backend call. A timed-out connection is discarded.
    fn observe<T>(&mut self, result: DbResult<T>) -> DbResult<T> {
        if let Err(err) = &result {
            if err.operation == Operation::Timeout {
                self.backend = None;
            }
            self.report(err);
        }
        result
    }

    fn reject(&self, err: DbError) -> Error {
        self.report(&err);
        err.into()
    }

    fn report(&self, err: &DbError) {
        report(self.diagnostics.as_deref(), err);
    }
}

impl<B: Backend> std::fmt::Debug for Client<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("open", &self.is_open())
            .field("statement_timeout", &self.statement_timeout)
            .finish_non_exhaustive()
    }
}

fn report(diagnostics: Option<&dyn Diagnostics>, err: &DbError) {
    warn!(
        target: "mysqlez",
        operation = %err.operation,
        code = ?err.code.map(|code| code.0),
        "{}",
        err.message
    );
    if let Some(sink) = diagnostics {
        sink.record(err);
    }
}

async fn with_deadline<T>(
    deadline: Option<Duration>,
    call: impl Future<Output = DbResult<T>>,
) -> DbResult<T> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
            Err(DbError::new(
                Operation::Timeout,
                format!("statement exceeded {} ms", limit.as_millis()),
            ))
        }),
        None => call.await,
    }
}

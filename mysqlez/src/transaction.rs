//! Explicit transactions and batch parameter rows.

use crate::backend::Backend;
use crate::client::Client;
use crate::error::Result;
use crate::row::Row;
use crate::statement::{Execution, QueryOutcome, StatementMeta};
use crate::value::{Params, Value};

/// An open transaction on a [`Client`].
///
/// Finish it with [`commit`](Self::commit) or [`rollback`](Self::rollback).
/// Dropping it unfinished cannot run async code, so the client instead
/// issues `ROLLBACK` before its next statement.
pub struct Transaction<'c, B: Backend> {
    client: &'c mut Client<B>,
    finished: bool,
}

impl<'c, B: Backend> Transaction<'c, B> {
    pub(crate) async fn begin(client: &'c mut Client<B>) -> Result<Self> {
        client.settle().await?;
        client.control("START TRANSACTION").await?;
        Ok(Self {
            client,
            finished: false,
        })
    }

    /// Runs a statement inside the transaction; see [`Client::execute`].
    ///
    /// # Errors
    ///
    /// Same as [`Client::execute`]. The transaction stays open.
    pub async fn execute(
        &mut self,
        sql: &str,
        params: impl Into<Params>,
        type_codes: Option<&str>,
    ) -> Result<QueryOutcome> {
        self.client.execute(sql, params, type_codes).await
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if `COMMIT` fails; the transaction is then rolled
    /// back before the client's next statement.
    pub async fn commit(mut self) -> Result<()> {
        self.client.control("COMMIT").await?;
        self.finished = true;
        Ok(())
    }

    /// Rolls the transaction back.
    ///
    /// # Errors
    ///
    /// Returns an error if `ROLLBACK` fails.
    pub async fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.client.control("ROLLBACK").await?;
        Ok(())
    }
}

impl<B: Backend> Drop for Transaction<'_, B> {
    fn drop(&mut self) {
        if !self.finished {
            self.client.pending_rollback = true;
        }
    }
}

impl<B: Backend> std::fmt::Debug for Transaction<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

/// Parameter rows for [`Client::run_batch`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchInput {
    /// One value, run as a single one-column row.
    Scalar(Value),
    /// A flat list: one row per value for a single type code, otherwise a
    /// single row.
    Flat(Vec<Value>),
    /// Explicit rows.
    Rows(Vec<Vec<Value>>),
}

impl BatchInput {
    /// Turns the input into rows for a statement with `width` parameters.
    #[must_use]
    pub fn normalize(self, width: usize) -> Vec<Vec<Value>> {
        match self {
            Self::Scalar(value) => vec![vec![value]],
            Self::Flat(values) if width == 1 => {
                values.into_iter().map(|value| vec![value]).collect()
            }
            Self::Flat(values) => vec![values],
            Self::Rows(rows) => rows,
        }
    }
}

impl From<Value> for BatchInput {
    fn from(value: Value) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<Value>> for BatchInput {
    fn from(values: Vec<Value>) -> Self {
        Self::Flat(values)
    }
}

impl From<Vec<Vec<Value>>> for BatchInput {
    fn from(rows: Vec<Vec<Value>>) -> Self {
        Self::Rows(rows)
    }
}

impl From<()> for BatchInput {
    fn from((): ()) -> Self {
        Self::Rows(Vec::new())
    }
}

/// Accumulates the results of one batch run.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub records: Option<Vec<Vec<Value>>>,
    insert_ids: Vec<u64>,
    affected: u64,
}

impl BatchResult {
    pub fn record(&mut self, done: Execution) {
        if done.last_insert_id != 0 {
            self.insert_ids.push(done.last_insert_id);
        }
        self.affected += done.rows_affected;
    }

    pub fn finish(self, meta: &StatementMeta) -> QueryOutcome {
        match self.insert_ids.len() {
            0 if meta.has_result_set() => QueryOutcome::Rows(Row::from_records(
                &meta.columns,
                self.records.unwrap_or_default(),
            )),
            0 => QueryOutcome::Affected(self.affected),
            1 => QueryOutcome::InsertId(self.insert_ids[0]),
            _ => QueryOutcome::InsertIds(self.insert_ids),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn flat_list_for_several_codes_is_one_row() {
        let rows = BatchInput::from(params![1_i64, "a"]).normalize(2);
        assert_eq!(rows, vec![params![1_i64, "a"]]);
    }

    #[test]
    fn flat_list_of_single_values_becomes_many_rows() {
        let rows = BatchInput::from(params![1_i64, 2_i64, 3_i64]).normalize(1);
        assert_eq!(rows, vec![params![1_i64], params![2_i64], params![3_i64]]);
    }

    #[test]
    fn scalar_is_one_row() {
        let rows = BatchInput::from(Value::from("x")).normalize(1);
        assert_eq!(rows, vec![params!["x"]]);
    }

    #[test]
    fn several_ids_are_kept_in_order() {
        let mut batch = BatchResult::default();
        for id in [5, 6, 7] {
            batch.record(Execution {
                rows_affected: 1,
                last_insert_id: id,
            });
        }
        assert_eq!(
            batch.finish(&StatementMeta::default()),
            QueryOutcome::InsertIds(vec![5, 6, 7])
        );
    }

    #[test]
    fn affected_rows_are_summed_without_ids() {
        let mut batch = BatchResult::default();
        batch.record(Execution {
            rows_affected: 2,
            last_insert_id: 0,
        });
        batch.record(Execution {
            rows_affected: 3,
            last_insert_id: 0,
        });
        assert_eq!(
            batch.finish(&StatementMeta::default()),
            QueryOutcome::Affected(5)
        );
    }
}

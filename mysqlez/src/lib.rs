//! Convenience layer over a single `MySQL` connection.
//!
//! [`Client`] wraps one session and adds:
//!
//! * prepared execution with result shapes chosen by the leading keyword
//!   (rows for `SELECT`/`DESCRIBE`, the generated id for `INSERT`, the
//!   affected-row count otherwise),
//! * per-parameter type codes (`i`, `d`, `s`, `b`) with string binding by
//!   default,
//! * batched execution of one statement over many parameter rows inside a
//!   transaction,
//! * INSERT text builders ([`StatementSpec`]) and a multi-row bulk insert
//!   with escaped inline literals.
//!
//! The wire protocol lives behind the [`Backend`] trait; [`MySqlBackend`]
//! implements it on `sqlx`. Invalid input fails fast with [`ConfigError`];
//! server and connection failures come back as [`DbError`] and are also
//! handed to an optional [`Diagnostics`] sink.
//!
//! ```no_run
//! # async fn demo() -> mysqlez::Result<()> {
//! use mysqlez::{params, Client, ConnectionConfig};
//!
//! let config = ConnectionConfig::new("localhost", "app", "secret", "shop");
//! let mut client = Client::connect(&config).await?;
//! let rows = client
//!     .query_rows("SELECT id, name FROM users WHERE id = ?", 7_i64, Some("i"))
//!     .await?;
//! let ids = client
//!     .run_batch(
//!         "INSERT INTO users (name) VALUES (?)",
//!         Some("s"),
//!         vec![params!["ann"], params!["bob"]],
//!     )
//!     .await?;
//! # let _ = (rows, ids);
//! client.close().await
//! # }
//! ```

mod backend;
pub mod builder;
pub mod bulk;
mod client;
pub mod config;
mod diagnostics;
pub mod error;
mod logger;
mod mysql;
mod row;
mod statement;
mod transaction;
pub mod value;

pub use backend::Backend;
pub use builder::{column_list, quote_identifier, quote_table, ColumnList, StatementSpec};
pub use bulk::{escape_string, render_bulk_insert};
pub use client::Client;
pub use config::ConnectionConfig;
pub use diagnostics::{Diagnostics, ErrorLog};
pub use error::{ConfigError, DbError, DbErrorCode, DbResult, Error, Operation, Result};
pub use logger::init_tracing;
pub use mysql::MySqlBackend;
pub use row::Row;
pub use statement::{Execution, QueryOutcome, Shape, StatementMeta, Verb};
pub use transaction::{BatchInput, Transaction};
pub use value::{Params, TypeCode, Value};

//! [`Backend`] over a single `sqlx` `MySQL` connection.
//!
//! This is the only file that touches `sqlx` query, row and type APIs. Rows
//! are decoded column by column into [`Value`]s using the type name the
//! server reported, so callers never deal with driver types.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::mysql::types::MySqlTime;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::types::chrono::{NaiveDate, NaiveDateTime};
use sqlx::{
    Column as _, ConnectOptions as _, Connection as _, Either, Executor as _, Row as _,
    Statement as _, TypeInfo as _, ValueRef as _,
};

use crate::backend::Backend;
use crate::config::ConnectionConfig;
use crate::error::{DbError, DbResult, Operation};
use crate::statement::{Execution, StatementMeta};
use crate::value::Value;

/// A live `MySQL` session.
///
/// Released when dropped or on [`Backend::close`].
pub struct MySqlBackend {
    conn: Option<MySqlConnection>,
}

impl MySqlBackend {
    /// Opens a connection with the credentials in `config`.
    ///
    /// # Errors
    ///
    /// Returns a connect error (with the server error number when the server
    /// answered) if the connection cannot be established.
    pub async fn connect(config: &ConnectionConfig) -> DbResult<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(config.pass.expose_secret())
            .database(&config.name)
            .charset(&config.charset);
        let conn = options
            .connect()
            .await
            .map_err(|e| DbError::from_sqlx(Operation::Connect, &e))?;
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> DbResult<&mut MySqlConnection> {
        self.conn.as_mut().ok_or_else(DbError::closed)
    }
}

#[async_trait]
impl Backend for MySqlBackend {
    async fn prepare(&mut self, sql: &str) -> DbResult<StatementMeta> {
        let conn = self.conn()?;
        let stmt = conn
            .prepare(sql)
            .await
            .map_err(|e| DbError::from_sqlx(Operation::Prepare, &e))?;
        let columns = stmt
            .columns()
            .iter()
            .map(|column| column.name().to_owned())
            .collect();
        let param_count = match stmt.parameters() {
            Some(Either::Left(types)) => types.len(),
            Some(Either::Right(count)) => count,
            None => 0,
        };
        Ok(StatementMeta {
            columns,
            param_count,
        })
    }

    async fn fetch(&mut self, sql: &str, params: &[Value]) -> DbResult<Vec<Vec<Value>>> {
        let conn = self.conn()?;
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| DbError::from_sqlx(Operation::Execute, &e))?;
        rows.iter().map(decode_row).collect()
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> DbResult<Execution> {
        let conn = self.conn()?;
        let result = bind_all(sqlx::query(sql), params)
            .execute(&mut *conn)
            .await
            .map_err(|e| DbError::from_sqlx(Operation::Execute, &e))?;
        Ok(Execution {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_id(),
        })
    }

    async fn execute_raw(&mut self, sql: &str) -> DbResult<Execution> {
        let conn = self.conn()?;
        let result = conn
            .execute(sql)
            .await
            .map_err(|e| DbError::from_sqlx(Operation::Execute, &e))?;
        Ok(Execution {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_id(),
        })
    }

    async fn close(&mut self) -> DbResult<()> {
        match self.conn.take() {
            Some(conn) => conn
                .close()
                .await
                .map_err(|e| DbError::from_sqlx(Operation::Connect, &e)),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for MySqlBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlBackend")
            .field("open", &self.conn.is_some())
            .finish_non_exhaustive()
    }
}

/// Binds every value positionally. Each call gets its own argument list.
fn bind_all<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [Value],
) -> Query<'q, MySql, MySqlArguments> {
    for value in params {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Integer(v) => query.bind(*v),
            Value::Double(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.as_str()),
            Value::Blob(v) => query.bind(v.as_slice()),
        };
    }
    query
}

fn decode_row(row: &MySqlRow) -> DbResult<Vec<Value>> {
    (0..row.len())
        .map(|idx| {
            decode_column(row, idx).map_err(|e| DbError::from_sqlx(Operation::Fetch, &e))
        })
        .collect()
}

fn decode_column(row: &MySqlRow, idx: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_owned();

    let value = match type_name.as_str() {
        "BOOLEAN" => Value::Integer(i64::from(row.try_get::<bool, _>(idx)?)),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            Value::Integer(row.try_get_unchecked::<i64, _>(idx)?)
        }
        name if name.ends_with(" UNSIGNED") => {
            let v = row.try_get_unchecked::<u64, _>(idx)?;
            // BIGINT UNSIGNED above i64::MAX keeps its exact digits as text.
            i64::try_from(v).map_or_else(|_| Value::Text(v.to_string()), Value::Integer)
        }
        "FLOAT" => Value::Double(f64::from(row.try_get::<f32, _>(idx)?)),
        "DOUBLE" => Value::Double(row.try_get::<f64, _>(idx)?),
        "DECIMAL" => Value::Text(row.try_get_unchecked::<String, _>(idx)?),
        "DATE" => match row.try_get::<NaiveDate, _>(idx) {
            Ok(date) => Value::Text(date.to_string()),
            Err(_) => Value::Text(temporal_text(row, idx, false)?),
        },
        "TIME" => Value::Text(row.try_get::<MySqlTime, _>(idx)?.to_string()),
        "DATETIME" | "TIMESTAMP" => match row.try_get::<NaiveDateTime, _>(idx) {
            Ok(stamp) => Value::Text(stamp.to_string()),
            Err(_) => Value::Text(temporal_text(row, idx, true)?),
        },
        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => Value::Blob(row.try_get_unchecked::<Vec<u8>, _>(idx)?),
        _ => match String::from_utf8(row.try_get_unchecked::<Vec<u8>, _>(idx)?) {
            Ok(text) => Value::Text(text),
            Err(err) => Value::Blob(err.into_bytes()),
        },
    };
    Ok(value)
}

/// Text form of a date the calendar types reject, such as `0000-00-00`.
fn temporal_text(row: &MySqlRow, idx: usize, with_time: bool) -> Result<String, sqlx::Error> {
    let bytes = row.try_get_unchecked::<Vec<u8>, _>(idx)?;
    Ok(render_temporal(&bytes, with_time))
}

/// Renders a raw DATE/DATETIME value. Binary-protocol values start with a
/// length byte followed by little-endian year, month, day, hour, minute,
/// second and microseconds; text-protocol values are returned as sent.
fn render_temporal(bytes: &[u8], with_time: bool) -> String {
    if bytes.first().is_some_and(u8::is_ascii_digit) {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    let field = |i: usize| bytes.get(i).copied().unwrap_or(0);
    let year = u16::from_le_bytes([field(1), field(2)]);
    let date = format!("{year:04}-{:02}-{:02}", field(3), field(4));
    if !with_time {
        return date;
    }
    let micros = u32::from_le_bytes([field(8), field(9), field(10), field(11)]);
    let time = format!("{:02}:{:02}:{:02}", field(5), field(6), field(7));
    if micros == 0 {
        format!("{date} {time}")
    } else {
        format!("{date} {time}.{micros:06}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_backend<B: Backend + Send>() {}

    #[test]
    fn mysql_backend_is_a_sendable_backend() {
        assert_backend::<MySqlBackend>();
    }

    #[test]
    fn zero_dates_render_as_zeros() {
        assert_eq!(render_temporal(&[0], false), "0000-00-00");
        assert_eq!(render_temporal(&[0], true), "0000-00-00 00:00:00");
    }

    #[test]
    fn binary_dates_keep_their_fields() {
        let bytes = [7, 0xe8, 0x07, 2, 30, 13, 5, 9];
        assert_eq!(render_temporal(&bytes, false), "2024-02-30");
        assert_eq!(render_temporal(&bytes, true), "2024-02-30 13:05:09");

        let mut with_micros = bytes.to_vec();
        with_micros[0] = 11;
        with_micros.extend_from_slice(&1500_u32.to_le_bytes());
        assert_eq!(
            render_temporal(&with_micros, true),
            "2024-02-30 13:05:09.001500"
        );
    }

    #[test]
    fn text_dates_pass_through() {
        assert_eq!(render_temporal(b"0000-00-00", false), "0000-00-00");
    }
}

//! Multi-row INSERT with inline literal values.
//!
//! Unlike every other path in this crate the values are not bound to
//! placeholders: they are escaped and written into the SQL text. Table and
//! column names, and the allow-listed SQL expressions, are interpolated as
//! they are. Never feed untrusted text in as a table or column name.

use crate::builder::{column_list, quote_table, ColumnList};
use crate::error::ConfigError;
use crate::value::Value;

/// Text values emitted verbatim instead of quoted (compared
/// case-insensitively after trimming).
pub const SAFE_EXPRESSIONS: &[&str] = &[
    "NOW()",
    "CURRENT_TIMESTAMP",
    "CURRENT_TIMESTAMP()",
    "CURRENT_DATE",
    "CURRENT_DATE()",
    "CURRENT_TIME",
    "CURRENT_TIME()",
    "UTC_TIMESTAMP()",
    "UUID()",
];

/// Renders `INSERT INTO ... VALUES (...),(...)` for `rows`.
///
/// A `*` column list is taken literally: the statement is rendered without a
/// column list and every row must have the same width.
///
/// # Errors
///
/// Returns a [`ConfigError`] for an empty table or column list, no rows, a
/// row of the wrong width, or `update_on_duplicate` with `*` columns.
pub fn render_bulk_insert(
    table: &str,
    columns: &ColumnList,
    rows: &[Vec<Value>],
    update_on_duplicate: bool,
) -> Result<String, ConfigError> {
    let table = table.trim();
    if table.is_empty() {
        return Err(ConfigError::MissingTable);
    }
    if columns.is_empty() || columns.0.iter().all(String::is_empty) {
        return Err(ConfigError::MissingColumns("bulk INSERT"));
    }
    let first = rows.first().ok_or(ConfigError::NoRows)?;

    let wildcard = columns.is_wildcard();
    let width = if wildcard { first.len() } else { columns.len() };
    if let Some((row, values)) = rows
        .iter()
        .enumerate()
        .find(|(_, values)| values.len() != width || values.is_empty())
    {
        return Err(ConfigError::RowWidth {
            row,
            expected: width,
            actual: values.len(),
        });
    }

    let mut sql = format!("INSERT INTO {}", quote_table(table));
    if !wildcard {
        sql.push_str(" (");
        sql.push_str(&column_list(&columns.0, false)?);
        sql.push(')');
    }
    sql.push_str(" VALUES ");
    let tuples: Vec<String> = rows
        .iter()
        .map(|values| {
            let literals: Vec<String> = values.iter().map(render_literal).collect();
            format!("({})", literals.join(","))
        })
        .collect();
    sql.push_str(&tuples.join(","));

    if update_on_duplicate {
        if wildcard {
            return Err(ConfigError::WildcardColumns);
        }
        sql.push_str(" ON DUPLICATE KEY UPDATE ");
        sql.push_str(&column_list(&columns.0, true)?);
    }
    Ok(sql)
}

/// Renders one value as an inline SQL literal.
#[must_use]
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Text(text) if is_safe_expression(text) => text.trim().to_string(),
        Value::Blob(bytes) => format!("X'{}'", hex::encode(bytes)),
        other => format!("'{}'", escape_string(&other.to_string())),
    }
}

fn is_safe_expression(text: &str) -> bool {
    let text = text.trim();
    SAFE_EXPRESSIONS
        .iter()
        .any(|safe| safe.eq_ignore_ascii_case(text))
}

/// Escapes text for use inside a single-quoted `MySQL` string literal,
/// following `mysql_real_escape_string` (backslash escapes enabled).
#[must_use]
pub fn escape_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\x1a' => escaped.push_str("\\Z"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn renders_null_and_escaped_strings() {
        let sql = render_bulk_insert(
            "t",
            &ColumnList::from("a,b"),
            &[params![1_i64, "x"], params![Value::Null, "it's"]],
            false,
        )
        .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `t` (`a`,`b`) VALUES ('1','x'),(NULL,'it\\'s')"
        );
    }

    #[test]
    fn safe_expressions_pass_through() {
        let sql = render_bulk_insert(
            "log",
            &ColumnList::from("msg,at"),
            &[params!["hello", "now()"]],
            true,
        )
        .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `log` (`msg`,`at`) VALUES ('hello',now()) \
             ON DUPLICATE KEY UPDATE `msg`=VALUES(`msg`),`at`=VALUES(`at`)"
        );
    }

    #[test]
    fn wildcard_columns_are_accepted_literally() {
        let sql = render_bulk_insert(
            "t",
            &ColumnList::from("*"),
            &[params![1_i64, 2.5], params![2_i64, 3.5]],
            false,
        )
        .unwrap();
        assert_eq!(sql, "INSERT INTO `t` VALUES ('1','2.5'),('2','3.5')");
    }

    #[test]
    fn blobs_render_as_hex() {
        assert_eq!(render_literal(&Value::Blob(vec![0xde, 0xad])), "X'dead'");
    }

    #[test]
    fn escape_covers_control_characters() {
        assert_eq!(
            escape_string("a\0b\nc\rd\\e\"f\x1a"),
            "a\\0b\\nc\\rd\\\\e\\\"f\\Z"
        );
    }

    #[test]
    fn rejects_bad_input() {
        let cols = ColumnList::from("a,b");
        assert_eq!(
            render_bulk_insert(" ", &cols, &[params![1_i64, 2_i64]], false),
            Err(ConfigError::MissingTable)
        );
        assert_eq!(
            render_bulk_insert("t", &ColumnList::default(), &[params![1_i64]], false),
            Err(ConfigError::MissingColumns("bulk INSERT"))
        );
        assert_eq!(
            render_bulk_insert("t", &cols, &[], false),
            Err(ConfigError::NoRows)
        );
        assert_eq!(
            render_bulk_insert("t", &cols, &[params![1_i64, 2_i64], params![3_i64]], false),
            Err(ConfigError::RowWidth {
                row: 1,
                expected: 2,
                actual: 1
            })
        );
    }
}

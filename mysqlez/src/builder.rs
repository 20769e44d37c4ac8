//! SQL text builders for INSERT statements.
//!
//! Table and column names are interpolated into the SQL text (quoted with
//! backticks, never parameterized). Callers must not pass untrusted text as
//! table or column names. Values always go through `?` placeholders.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::statement::Verb;

/// Ordered list of column names.
///
/// A string converts by splitting on commas; each name is trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawColumns")]
pub struct ColumnList(pub Vec<String>);

impl ColumnList {
    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no columns were given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` for the single-column list `*`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self.0.as_slice(), [only] if only == "*")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawColumns {
    One(String),
    Many(Vec<String>),
}

impl From<RawColumns> for ColumnList {
    fn from(raw: RawColumns) -> Self {
        match raw {
            RawColumns::One(text) => Self::from(text.as_str()),
            RawColumns::Many(list) => Self::from(list),
        }
    }
}

impl From<&str> for ColumnList {
    fn from(text: &str) -> Self {
        Self(text.split(',').map(|c| c.trim().to_string()).collect())
    }
}

impl From<String> for ColumnList {
    fn from(text: String) -> Self {
        Self::from(text.as_str())
    }
}

impl From<Vec<String>> for ColumnList {
    fn from(list: Vec<String>) -> Self {
        Self(list.into_iter().map(|c| c.trim().to_string()).collect())
    }
}

impl From<Vec<&str>> for ColumnList {
    fn from(list: Vec<&str>) -> Self {
        Self(list.into_iter().map(|c| c.trim().to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ColumnList {
    fn from(list: [&str; N]) -> Self {
        Self(list.iter().map(|c| c.trim().to_string()).collect())
    }
}

/// Declarative description of a statement to render.
///
/// Only [`Verb::Insert`] is rendered; every other operation builds an empty
/// string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatementSpec {
    /// Statement operation, `SELECT` when omitted.
    pub op: Verb,
    /// Target table.
    pub table: Option<String>,
    /// Columns to insert.
    pub columns: Option<ColumnList>,
    /// Emit `INSERT IGNORE`.
    #[serde(alias = "ignore")]
    pub ignore_duplicates: bool,
    /// Append `ON DUPLICATE KEY UPDATE` for every column.
    #[serde(alias = "update")]
    pub update_on_duplicate: bool,
}

impl StatementSpec {
    /// An INSERT spec for `table` and `columns`.
    #[must_use]
    pub fn insert(table: impl Into<String>, columns: impl Into<ColumnList>) -> Self {
        Self {
            op: Verb::Insert,
            table: Some(table.into()),
            columns: Some(columns.into()),
            ..Self::default()
        }
    }

    /// Sets [`ignore_duplicates`](Self::ignore_duplicates).
    #[must_use]
    pub const fn ignore_duplicates(mut self, yes: bool) -> Self {
        self.ignore_duplicates = yes;
        self
    }

    /// Sets [`update_on_duplicate`](Self::update_on_duplicate).
    #[must_use]
    pub const fn update_on_duplicate(mut self, yes: bool) -> Self {
        self.update_on_duplicate = yes;
        self
    }

    /// Renders the SQL text.
    ///
    /// ```
    /// use mysqlez::StatementSpec;
    ///
    /// let sql = StatementSpec::insert("t", ["a", "b"]).build().unwrap();
    /// assert_eq!(sql, "INSERT INTO `t` (`a`,`b`) VALUES (?,?)");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for a missing table, a missing or `*`
    /// column list on INSERT, or an empty column name.
    pub fn build(&self) -> Result<String, ConfigError> {
        let table = self
            .table
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingTable)?;

        match self.op {
            Verb::Insert => {
                let columns = self
                    .columns
                    .as_ref()
                    .filter(|c| !c.is_empty())
                    .ok_or(ConfigError::MissingColumns("INSERT"))?;

                let mut sql = Vec::with_capacity(4);
                if self.ignore_duplicates {
                    sql.push(format!("INSERT IGNORE INTO {}", quote_table(table)));
                } else {
                    sql.push(format!("INSERT INTO {}", quote_table(table)));
                }
                sql.push(format!("({})", column_list(&columns.0, false)?));
                sql.push(format!("VALUES ({})", vec!["?"; columns.len()].join(",")));
                if self.update_on_duplicate {
                    sql.push(format!(
                        "ON DUPLICATE KEY UPDATE {}",
                        column_list(&columns.0, true)?
                    ));
                }
                Ok(sql.join(" "))
            }
            _ => Ok(String::new()),
        }
    }
}

/// Renders a comma-joined list of quoted column names, or of
/// `` `c`=VALUES(`c`) `` assignments when `as_update` is set.
///
/// # Errors
///
/// Rejects the single-column list `*` and empty names.
pub fn column_list(columns: &[String], as_update: bool) -> Result<String, ConfigError> {
    if matches!(columns, [only] if only == "*") {
        return Err(ConfigError::WildcardColumns);
    }
    let rendered = columns
        .iter()
        .map(|column| {
            if column.is_empty() {
                return Err(ConfigError::EmptyColumn);
            }
            let quoted = quote_identifier(column);
            Ok(if as_update {
                format!("{quoted}=VALUES({quoted})")
            } else {
                quoted
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rendered.join(","))
}

/// Quotes a table name that may be qualified by a schema (`shop.users`),
/// each dot-separated part on its own.
#[must_use]
pub fn quote_table(name: &str) -> String {
    name.split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

/// Backtick-quotes an identifier, doubling embedded backticks.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_with_column_list() {
        let sql = StatementSpec::insert("t", vec!["a", "b"]).build().unwrap();
        assert_eq!(sql, "INSERT INTO `t` (`a`,`b`) VALUES (?,?)");
    }

    #[test]
    fn insert_ignore_with_upsert_from_comma_string() {
        let sql = StatementSpec::insert("t", "a,b")
            .ignore_duplicates(true)
            .update_on_duplicate(true)
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "INSERT IGNORE INTO `t` (`a`,`b`) VALUES (?,?) \
             ON DUPLICATE KEY UPDATE `a`=VALUES(`a`),`b`=VALUES(`b`)"
        );
    }

    #[test]
    fn wildcard_column_list_is_rejected() {
        let err = StatementSpec::insert("t", vec!["*"]).build().unwrap_err();
        assert_eq!(err, ConfigError::WildcardColumns);
    }

    #[test]
    fn missing_table_fails_fast() {
        let spec = StatementSpec {
            op: Verb::Insert,
            columns: Some(ColumnList::from("a")),
            ..StatementSpec::default()
        };
        assert_eq!(spec.build().unwrap_err(), ConfigError::MissingTable);
    }

    #[test]
    fn insert_without_columns_fails_fast() {
        let spec = StatementSpec {
            op: Verb::Insert,
            table: Some("t".into()),
            ..StatementSpec::default()
        };
        assert_eq!(
            spec.build().unwrap_err(),
            ConfigError::MissingColumns("INSERT")
        );
    }

    #[test]
    fn non_insert_operations_render_nothing() {
        let spec = StatementSpec {
            table: Some("t".into()),
            ..StatementSpec::default()
        };
        assert_eq!(spec.op, Verb::Select);
        assert_eq!(spec.build().unwrap(), "");
    }

    #[test]
    fn single_column_string_and_spaces() {
        let sql = StatementSpec::insert("t", "a").build().unwrap();
        assert_eq!(sql, "INSERT INTO `t` (`a`) VALUES (?)");

        let sql = StatementSpec::insert("t", " a , b ").build().unwrap();
        assert_eq!(sql, "INSERT INTO `t` (`a`,`b`) VALUES (?,?)");
    }

    #[test]
    fn empty_column_name_is_rejected() {
        let err = StatementSpec::insert("t", "a,,b").build().unwrap_err();
        assert_eq!(err, ConfigError::EmptyColumn);
    }

    #[test]
    fn schema_qualified_tables_quote_each_part() {
        assert_eq!(quote_table("shop.users"), "`shop`.`users`");
        assert_eq!(quote_table("users"), "`users`");
        let sql = StatementSpec::insert("shop.t", "a").build().unwrap();
        assert_eq!(sql, "INSERT INTO `shop`.`t` (`a`) VALUES (?)");
    }

    #[test]
    fn backticks_in_names_are_doubled() {
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn deserializes_legacy_keys() {
        let spec: StatementSpec = serde_json::from_str(
            r#"{"op":"insert","table":"t","columns":"a,b","ignore":true,"update":true}"#,
        )
        .unwrap();
        assert!(spec.ignore_duplicates);
        assert!(spec.update_on_duplicate);
        assert_eq!(spec.columns, Some(ColumnList::from(vec!["a", "b"])));

        let spec: StatementSpec =
            serde_json::from_str(r#"{"op":"INSERT","table":"t","columns":["x"]}"#).unwrap();
        assert_eq!(spec.build().unwrap(), "INSERT INTO `t` (`x`) VALUES (?)");
    }
}

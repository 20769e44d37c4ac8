//! Result rows with a schema discovered at runtime.

use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::value::Value;

/// One result row: column name to [`Value`], in the statement's column order.
///
/// All rows of one result share the same column list; each row owns its
/// values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Pairs a shared column list with one record of values.
    ///
    /// Missing trailing values are filled with NULL, extra values dropped, so
    /// every row of a result has exactly the same keys.
    pub(crate) fn new(columns: Arc<[String]>, mut values: Vec<Value>) -> Self {
        values.resize(columns.len(), Value::Null);
        Self { columns, values }
    }

    /// Builds rows from raw records, all sharing `columns`.
    pub(crate) fn from_records(columns: &[String], records: Vec<Vec<Value>>) -> Vec<Self> {
        let columns: Arc<[String]> = columns.into();
        records
            .into_iter()
            .map(|values| Self::new(Arc::clone(&columns), values))
            .collect()
    }

    /// Looks up a value by column name. With duplicate names the first wins.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    /// Looks up a value by position.
    #[must_use]
    pub fn get_index(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in column order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` for a row without columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Consumes the row, returning its values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        vec!["id".to_string(), "name".to_string()]
    }

    #[test]
    fn rows_share_columns_but_own_values() {
        let rows = Row::from_records(
            &columns(),
            vec![
                vec![Value::Integer(1), Value::from("a")],
                vec![Value::Integer(2), Value::from("b")],
            ],
        );
        assert_eq!(rows.len(), 2);
        assert!(std::ptr::eq(
            rows[0].columns().as_ptr(),
            rows[1].columns().as_ptr()
        ));
        assert_eq!(rows[0].get("name"), Some(&Value::from("a")));
        assert_eq!(rows[1].get("name"), Some(&Value::from("b")));
    }

    #[test]
    fn short_record_is_padded_with_null() {
        let rows = Row::from_records(&columns(), vec![vec![Value::Integer(1)]]);
        assert_eq!(rows[0].get("name"), Some(&Value::Null));
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn serializes_in_column_order() {
        let rows = Row::from_records(
            &["z".to_string(), "a".to_string()],
            vec![vec![Value::Null, Value::Double(1.5)]],
        );
        let json = serde_json::to_string(&rows[0]).unwrap();
        assert_eq!(json, r#"{"z":null,"a":1.5}"#);
    }
}

//! Parameter and column value types.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::{DbError, DbResult, Operation};

/// A value that can be bound to a statement placeholder or read from a
/// result column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// Double-precision float.
    Double(f64),
    /// UTF-8 text.
    Text(String),
    /// Binary blob.
    Blob(Vec<u8>),
}

impl Value {
    /// Returns `true` for SQL NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the integer, if this is one.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the float, if this is one.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the bytes, if this is a blob.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Blob(v) => write!(f, "x'{}'", hex::encode(v)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Integer(v) => serializer.serialize_i64(*v),
            Self::Double(v) => serializer.serialize_f64(*v),
            Self::Text(v) => serializer.serialize_str(v),
            Self::Blob(v) => serializer.serialize_bytes(v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Self::Blob(v.to_vec())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Parameter type tag, one character per placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    /// `i`: integer.
    Integer,
    /// `d`: double.
    Double,
    /// `s`: string.
    String,
    /// `b`: blob.
    Blob,
}

impl TypeCode {
    /// Parses a type-code string such as `"isd"`.
    ///
    /// # Errors
    ///
    /// Returns a bind error naming the first character outside `i`, `d`,
    /// `s`, `b`.
    pub fn parse_all(codes: &str) -> DbResult<Vec<Self>> {
        codes.chars().map(Self::try_from).collect()
    }

    /// Coerces `value` into the representation this code binds as.
    ///
    /// NULL always stays NULL.
    ///
    /// # Errors
    ///
    /// Returns a bind error when text cannot be read as the requested
    /// number, or a blob is bound as a number.
    pub fn coerce(self, value: Value) -> DbResult<Value> {
        let coerced = match (self, value) {
            (_, Value::Null) => Value::Null,

            (Self::Integer, Value::Integer(v)) => Value::Integer(v),
            #[allow(clippy::cast_possible_truncation)]
            (Self::Integer, Value::Double(v)) => Value::Integer(v.trunc() as i64),
            (Self::Integer, Value::Text(v)) => {
                Value::Integer(v.trim().parse().map_err(|_| not_a_number(self, &v))?)
            }

            (Self::Double, Value::Double(v)) => Value::Double(v),
            #[allow(clippy::cast_precision_loss)]
            (Self::Double, Value::Integer(v)) => Value::Double(v as f64),
            (Self::Double, Value::Text(v)) => {
                Value::Double(v.trim().parse().map_err(|_| not_a_number(self, &v))?)
            }

            (Self::Integer | Self::Double, Value::Blob(_)) => {
                return Err(DbError::new(
                    Operation::Bind,
                    format!("cannot bind a blob as '{}'", self.as_char()),
                ));
            }

            (Self::String | Self::Blob, Value::Blob(v)) => Value::Blob(v),
            (Self::String, other) => Value::Text(other.to_string()),
            (Self::Blob, Value::Text(v)) => Value::Blob(v.into_bytes()),
            (Self::Blob, other) => Value::Blob(other.to_string().into_bytes()),
        };
        Ok(coerced)
    }

    /// The one-character code.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Integer => 'i',
            Self::Double => 'd',
            Self::String => 's',
            Self::Blob => 'b',
        }
    }
}

impl TryFrom<char> for TypeCode {
    type Error = DbError;

    fn try_from(c: char) -> DbResult<Self> {
        match c {
            'i' => Ok(Self::Integer),
            'd' => Ok(Self::Double),
            's' => Ok(Self::String),
            'b' => Ok(Self::Blob),
            other => Err(DbError::new(
                Operation::Bind,
                format!("unknown parameter type code '{other}'"),
            )),
        }
    }
}

fn not_a_number(code: TypeCode, text: &str) -> DbError {
    DbError::new(
        Operation::Bind,
        format!("cannot bind {text:?} as '{}'", code.as_char()),
    )
}

/// Ordered parameter list for one statement execution.
///
/// A single scalar converts into a one-element list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(pub Vec<Value>);

impl Params {
    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Binds the list against optional type codes, producing the values sent
    /// to the server. Without codes every parameter binds as a string.
    ///
    /// # Errors
    ///
    /// Returns a bind error when the code count differs from the parameter
    /// count or a value cannot be coerced.
    pub fn bind(self, type_codes: Option<&str>) -> DbResult<Vec<Value>> {
        let codes = match type_codes {
            Some(codes) => TypeCode::parse_all(codes)?,
            None => vec![TypeCode::String; self.len()],
        };
        bind_row(&codes, self.0)
    }
}

/// Coerces one row of values against already parsed type codes.
pub(crate) fn bind_row(codes: &[TypeCode], values: Vec<Value>) -> DbResult<Vec<Value>> {
    if codes.len() != values.len() {
        return Err(DbError::new(
            Operation::Bind,
            format!(
                "number of type codes ({}) does not match number of parameters ({})",
                codes.len(),
                values.len()
            ),
        ));
    }
    codes
        .iter()
        .zip(values)
        .map(|(code, value)| code.coerce(value))
        .collect()
}

impl From<Vec<Value>> for Params {
    fn from(v: Vec<Value>) -> Self {
        Self(v)
    }
}

impl From<&[Value]> for Params {
    fn from(v: &[Value]) -> Self {
        Self(v.to_vec())
    }
}

impl From<()> for Params {
    fn from((): ()) -> Self {
        Self::default()
    }
}

macro_rules! scalar_params {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Params {
                fn from(v: $ty) -> Self {
                    Self(vec![Value::from(v)])
                }
            }
        )*
    };
}

scalar_params!(Value, i64, i32, u32, bool, f64, String, &str);

/// Convenience macro for building parameter lists.
///
/// Usage: `params![1_i64, "text", 2.5]`
#[macro_export]
macro_rules! params {
    ($($val:expr),* $(,)?) => {
        vec![$($crate::Value::from($val)),*]
    };
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case('i', TypeCode::Integer)]
    #[test_case('d', TypeCode::Double)]
    #[test_case('s', TypeCode::String)]
    #[test_case('b', TypeCode::Blob)]
    fn type_code_round_trips_through_char(c: char, code: TypeCode) {
        assert_eq!(TypeCode::try_from(c).unwrap(), code);
        assert_eq!(code.as_char(), c);
    }

    #[test]
    fn unknown_type_code_is_a_bind_error() {
        let err = TypeCode::parse_all("isx").unwrap_err();
        assert_eq!(err.operation, Operation::Bind);
        assert!(err.message.contains("'x'"));
    }

    #[test]
    fn text_under_integer_code_is_parsed() {
        let v = TypeCode::Integer.coerce(Value::from(" 42 ")).unwrap();
        assert_eq!(v, Value::Integer(42));
    }

    #[test]
    fn non_numeric_text_under_double_code_fails() {
        let err = TypeCode::Double.coerce(Value::from("abc")).unwrap_err();
        assert_eq!(err.operation, Operation::Bind);
    }

    #[test]
    fn null_binds_as_null_under_every_code() {
        for code in [TypeCode::Integer, TypeCode::Double, TypeCode::String, TypeCode::Blob] {
            assert_eq!(code.coerce(Value::Null).unwrap(), Value::Null);
        }
    }

    #[test]
    fn params_default_to_string_binding() {
        let bound = Params::from(params![7_i64, "x", 1.5]).bind(None).unwrap();
        assert_eq!(
            bound,
            vec![
                Value::Text("7".into()),
                Value::Text("x".into()),
                Value::Text("1.5".into())
            ]
        );
    }

    #[test]
    fn scalar_param_becomes_one_element_list() {
        let params = Params::from(5_i64);
        assert_eq!(params.0, vec![Value::Integer(5)]);
    }

    #[test]
    fn code_count_mismatch_is_a_bind_error() {
        let err = Params::from(params![1_i64, 2_i64]).bind(Some("iii")).unwrap_err();
        assert_eq!(err.operation, Operation::Bind);
    }

    #[test]
    fn option_none_is_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("a")), Value::Text("a".into()));
    }
}

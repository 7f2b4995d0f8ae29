//! Runtime literal values carried by expressions and result rows.
//!
//! `Value` is the bridge between typed Rust data and SQL text: predicate
//! constants carry a `Value`, generated SQL inlines its literal form, and
//! result rows hand values back to entity `set` implementations through the
//! typed accessors.

use crate::error::{OrmError, OrmResult};
use chrono::NaiveDateTime;
use uuid::Uuid;

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// A runtime scalar (or captured collection) used in predicates and rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL / absent value
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Char(char),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
    /// A captured collection, used for `IN (...)` translation
    List(Vec<Value>),
}

impl Value {
    /// Check whether this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render the inline SQL literal form.
    ///
    /// Returns `None` for NULL: an absent fragment, which the binary rule of
    /// the predicate compiler turns into `IS NULL` / `IS NOT NULL`.
    /// Strings, chars, date-times and UUIDs are single-quoted, booleans render
    /// as `1`/`0`, numbers in plain decimal form.
    pub fn literal(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(if *b { "1".into() } else { "0".into() }),
            Value::Int(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::Str(s) => Some(format!("'{s}'")),
            Value::Char(c) => Some(format!("'{c}'")),
            Value::DateTime(dt) => Some(format!("'{}'", dt.format(DATETIME_FMT))),
            Value::Uuid(u) => Some(format!("'{u}'")),
            Value::List(_) => Some(self.in_list_text()),
        }
    }

    /// Render the unquoted text form, used inside `LIKE '%...%'` patterns.
    pub fn raw_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Str(s) => s.clone(),
            Value::Char(c) => c.to_string(),
            Value::DateTime(dt) => dt.format(DATETIME_FMT).to_string(),
            Value::Uuid(u) => u.to_string(),
            Value::List(items) => items
                .iter()
                .map(Value::raw_text)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Render the comma-joined element list used inside `IN (...)`.
    ///
    /// An empty collection renders as `''` so the clause degenerates to a
    /// no-match instead of invalid SQL.
    pub fn in_list_text(&self) -> String {
        match self {
            Value::List(items) => {
                if items.is_empty() {
                    return "''".to_string();
                }
                items
                    .iter()
                    .map(|v| v.literal().unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join(",")
            }
            other => other.literal().unwrap_or_default(),
        }
    }

    // ==================== Typed accessors ====================
    //
    // Used by `Entity::set` implementations when materializing rows. Each
    // accessor converts with the widening/parsing rules of the materializer
    // contract and reports a `Decode` error naming the offending column.

    /// Read as a 64-bit integer.
    pub fn to_i64(&self, column: &str) -> OrmResult<i64> {
        match self {
            Value::Int(v) => Ok(*v),
            Value::Bool(b) => Ok(i64::from(*b)),
            other => Err(OrmError::decode(
                column,
                format!("expected integer, found {other:?}"),
            )),
        }
    }

    /// Read as a 32-bit integer.
    pub fn to_i32(&self, column: &str) -> OrmResult<i32> {
        let v = self.to_i64(column)?;
        i32::try_from(v).map_err(|_| OrmError::decode(column, format!("{v} out of i32 range")))
    }

    /// Read as a double, widening from integers.
    pub fn to_f64(&self, column: &str) -> OrmResult<f64> {
        match self {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            other => Err(OrmError::decode(
                column,
                format!("expected number, found {other:?}"),
            )),
        }
    }

    /// Read as a boolean; integer `0`/`1` are accepted.
    pub fn to_bool(&self, column: &str) -> OrmResult<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            other => Err(OrmError::decode(
                column,
                format!("expected boolean, found {other:?}"),
            )),
        }
    }

    /// Read as text.
    pub fn to_text(&self, column: &str) -> OrmResult<String> {
        match self {
            Value::Str(s) => Ok(s.clone()),
            Value::Char(c) => Ok(c.to_string()),
            other => Err(OrmError::decode(
                column,
                format!("expected text, found {other:?}"),
            )),
        }
    }

    /// Read as a date-time, parsing the stored text form when needed.
    pub fn to_datetime(&self, column: &str) -> OrmResult<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Ok(*dt),
            Value::Str(s) => NaiveDateTime::parse_from_str(s, DATETIME_FMT)
                .map_err(|e| OrmError::decode(column, e.to_string())),
            other => Err(OrmError::decode(
                column,
                format!("expected date-time, found {other:?}"),
            )),
        }
    }

    /// Read as a UUID, parsing the stored text form when needed.
    pub fn to_uuid(&self, column: &str) -> OrmResult<Uuid> {
        match self {
            Value::Uuid(u) => Ok(*u),
            Value::Str(s) => Uuid::parse_str(s).map_err(|e| OrmError::decode(column, e.to_string())),
            other => Err(OrmError::decode(
                column,
                format!("expected uuid, found {other:?}"),
            )),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int(v.into())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<char> for Value {
    fn from(v: char) -> Self {
        Value::Char(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

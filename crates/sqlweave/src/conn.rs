//! Connection seam.
//!
//! Physical drivers live outside this crate: callers register a
//! [`ConnectionSource`] per logical database name, and every statement opens
//! a fresh scoped [`Connection`] that is dropped when the statement finishes.

use crate::dialect::DatabaseKind;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::collections::HashMap;

/// One result row: column names to values, order and case preserved.
#[derive(Debug, Clone, Default)]
pub struct RowData {
    columns: Vec<(String, Value)>,
}

impl RowData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.push((column.into(), value));
    }

    /// Look up a value by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// The first column's value, used by scalar reads.
    pub fn first(&self) -> Option<&Value> {
        self.columns.first().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, Value)> for RowData {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

/// Forward-only result cursor. Single pass, not restartable.
pub trait RowCursor {
    fn next_row(&mut self) -> OrmResult<Option<RowData>>;
}

/// A scoped physical connection, opened per statement and dropped after it.
///
/// `params` carries named statement parameters, spelled without the dialect
/// prefix; the statement text references them with the prefix applied.
pub trait Connection {
    fn query(&mut self, sql: &str, params: &[(String, Value)]) -> OrmResult<Box<dyn RowCursor>>;

    /// Run a statement and return the affected-row count.
    fn execute(&mut self, sql: &str, params: &[(String, Value)]) -> OrmResult<u64>;

    /// Run a statement and return the first column of the first row,
    /// `Value::Null` when the result set is empty.
    fn execute_scalar(&mut self, sql: &str, params: &[(String, Value)]) -> OrmResult<Value> {
        let mut cursor = self.query(sql, params)?;
        match cursor.next_row()? {
            Some(row) => Ok(row.first().cloned().unwrap_or(Value::Null)),
            None => Ok(Value::Null),
        }
    }
}

impl std::fmt::Debug for dyn Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Connection")
    }
}

type Opener = Box<dyn Fn() -> OrmResult<Box<dyn Connection>>>;

/// How to reach one logical database: its engine and a connection factory.
pub struct ConnectionSource {
    kind: DatabaseKind,
    opener: Opener,
}

impl ConnectionSource {
    pub fn new<F>(kind: DatabaseKind, opener: F) -> Self
    where
        F: Fn() -> OrmResult<Box<dyn Connection>> + 'static,
    {
        Self {
            kind,
            opener: Box::new(opener),
        }
    }

    pub fn kind(&self) -> DatabaseKind {
        self.kind
    }
}

impl std::fmt::Debug for ConnectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSource")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Named-database registry, insertion ordered.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    sources: HashMap<String, ConnectionSource>,
    order: Vec<String>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the source of a logical database name.
    pub fn register(&mut self, name: impl Into<String>, source: ConnectionSource) {
        let name = name.into();
        if !self.sources.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.sources.insert(name, source);
    }

    /// Registered database names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn kind(&self, name: &str) -> OrmResult<DatabaseKind> {
        Ok(self.source(name)?.kind)
    }

    /// Open a fresh scoped connection to the named database.
    pub fn open(&self, name: &str) -> OrmResult<(DatabaseKind, Box<dyn Connection>)> {
        let source = self.source(name)?;
        let conn = (source.opener)()?;
        Ok((source.kind, conn))
    }

    fn source(&self, name: &str) -> OrmResult<&ConnectionSource> {
        self.sources.get(name).ok_or_else(|| {
            OrmError::ConnectionConfig(format!("database '{name}' is not configured"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyCursor;

    impl RowCursor for EmptyCursor {
        fn next_row(&mut self) -> OrmResult<Option<RowData>> {
            Ok(None)
        }
    }

    struct NullConnection;

    impl Connection for NullConnection {
        fn query(&mut self, _: &str, _: &[(String, Value)]) -> OrmResult<Box<dyn RowCursor>> {
            Ok(Box::new(EmptyCursor))
        }
        fn execute(&mut self, _: &str, _: &[(String, Value)]) -> OrmResult<u64> {
            Ok(0)
        }
    }

    #[test]
    fn unknown_database_is_a_config_error() {
        let registry = ConnectionRegistry::new();
        let err = registry.open("nope").unwrap_err();
        assert!(matches!(err, OrmError::ConnectionConfig(_)));
    }

    #[test]
    fn registered_source_opens_with_its_kind() {
        let mut registry = ConnectionRegistry::new();
        registry.register(
            "app",
            ConnectionSource::new(DatabaseKind::Sqlite, || Ok(Box::new(NullConnection))),
        );
        let (kind, _) = registry.open("app").unwrap();
        assert_eq!(kind, DatabaseKind::Sqlite);
        assert_eq!(registry.names(), ["app"]);
    }

    #[test]
    fn default_scalar_reads_first_column() {
        let mut conn = NullConnection;
        assert_eq!(conn.execute_scalar("SELECT 1", &[]).unwrap(), Value::Null);
    }

    #[test]
    fn row_lookup_is_case_preserving() {
        let mut row = RowData::new();
        row.push("Name", Value::from("Ann"));
        assert_eq!(row.get("Name"), Some(&Value::from("Ann")));
        assert_eq!(row.get("name"), None);
        assert_eq!(row.first(), Some(&Value::from("Ann")));
    }
}

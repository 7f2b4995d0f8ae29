//! Database entry point.
//!
//! A `Database` owns the connection registry and exposes everything callers
//! do with it: single-entity CRUD, paged queries, counting, truncation,
//! schema introspection, raw SQL escape hatches and the staged query entry
//! points `from`..`from4`.
//!
//! Filter and join predicates inline literal values into the statement text;
//! write paths (INSERT/UPDATE) use named statement parameters. Callers must
//! not feed untrusted input through predicate literals.

use crate::condition::Condition;
use crate::conn::{ConnectionRegistry, ConnectionSource, RowCursor, RowData};
use crate::dialect::{DatabaseKind, DeleteStmt, InsertStmt, Page, SelectStmt, UpdateStmt};
use crate::error::{OrmError, OrmResult};
use crate::expr::{compile, Expr};
use crate::query::{self, materialize_entity, SourceStage};
use crate::schema::{mapping, Entity, TableMapping};
use crate::value::Value;

#[derive(Debug, Default)]
pub struct Database {
    registry: ConnectionRegistry,
}

/// Named write parameters from an entity's writable columns, spelled without
/// the dialect prefix.
fn write_params<T: Entity>(entity: &T, mapping: &TableMapping) -> Vec<(String, Value)> {
    mapping
        .writable_columns()
        .map(|c| (c.column.clone(), entity.get(&c.property)))
        .collect()
}

/// Primary-key WHERE text with inlined values, e.g. `Id='5'`.
fn pk_where<T: Entity>(entity: &T, mapping: &TableMapping) -> String {
    mapping
        .primary_key_columns()
        .map(|c| format!("{}='{}'", c.column, entity.get(&c.property).raw_text()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Paging key: primary-key columns joined by commas, or the first mapped
/// column when the table has no primary key.
fn page_key(mapping: &TableMapping) -> String {
    let keys = mapping
        .primary_key_columns()
        .map(|c| c.column.as_str())
        .collect::<Vec<_>>()
        .join(",");
    if keys.is_empty() {
        mapping
            .columns
            .first()
            .map(|c| c.column.clone())
            .unwrap_or_default()
    } else {
        keys
    }
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the connection source of a logical database name.
    pub fn register(&mut self, name: impl Into<String>, source: ConnectionSource) {
        self.registry.register(name, source);
    }

    // ==================== staged query entry points ====================

    pub fn from<T0: Entity>(&self) -> OrmResult<SourceStage<'_, (T0,)>> {
        query::source(self)
    }

    pub fn from2<T0: Entity, T1: Entity>(&self) -> OrmResult<SourceStage<'_, (T0, T1)>> {
        query::source(self)
    }

    pub fn from3<T0: Entity, T1: Entity, T2: Entity>(
        &self,
    ) -> OrmResult<SourceStage<'_, (T0, T1, T2)>> {
        query::source(self)
    }

    pub fn from4<T0: Entity, T1: Entity, T2: Entity, T3: Entity>(
        &self,
    ) -> OrmResult<SourceStage<'_, (T0, T1, T2, T3)>> {
        query::source(self)
    }

    // ==================== write paths ====================

    /// Insert one entity and write the database-assigned id back into its
    /// auto-id property. Returns the new id, `0` when the driver reported
    /// none.
    pub fn insert<T: Entity>(&self, entity: &mut T) -> OrmResult<i64> {
        let mapping = mapping::<T>()?;
        let (kind, mut conn) = self.registry.open(&mapping.database)?;
        let dialect = kind.dialect();
        let columns = mapping
            .writable_columns()
            .map(|c| c.column.clone())
            .collect();
        let sql = dialect.insert(&InsertStmt {
            table: mapping.table.clone(),
            columns,
        })?;
        let params = write_params(entity, &mapping);
        tracing::debug!(database = %mapping.database, %sql, "insert");
        let id = conn.execute_scalar(&sql, &params)?;
        if id.is_null() {
            return Ok(0);
        }
        if let Some(auto) = mapping.auto_id_column() {
            entity.set(&auto.property, &id)?;
        }
        id.to_i64("AutoId")
    }

    pub fn insert_many<T: Entity>(&self, entities: &mut [T]) -> OrmResult<()> {
        for entity in entities {
            self.insert(entity)?;
        }
        Ok(())
    }

    /// Update one entity's writable columns, keyed by its primary-key values.
    /// Returns the affected-row count.
    pub fn update<T: Entity>(&self, entity: &T) -> OrmResult<u64> {
        let mapping = mapping::<T>()?;
        let (kind, mut conn) = self.registry.open(&mapping.database)?;
        let dialect = kind.dialect();
        let columns = mapping
            .writable_columns()
            .map(|c| c.column.clone())
            .collect();
        let sql = dialect.update(&UpdateStmt {
            table: mapping.table.clone(),
            columns,
            where_clause: pk_where(entity, &mapping),
        })?;
        let params = write_params(entity, &mapping);
        tracing::debug!(database = %mapping.database, %sql, "update");
        conn.execute(&sql, &params)
    }

    pub fn update_many<T: Entity>(&self, entities: &[T]) -> OrmResult<u64> {
        let mut affected = 0;
        for entity in entities {
            affected += self.update(entity)?;
        }
        Ok(affected)
    }

    /// Delete one entity, keyed by its primary-key values.
    pub fn delete<T: Entity>(&self, entity: &T) -> OrmResult<u64> {
        let mapping = mapping::<T>()?;
        self.delete_with_where(&mapping, Some(pk_where(entity, &mapping)))
    }

    pub fn delete_many<T: Entity>(&self, entities: &[T]) -> OrmResult<u64> {
        let mut affected = 0;
        for entity in entities {
            affected += self.delete(entity)?;
        }
        Ok(affected)
    }

    /// Delete every row matching a predicate.
    pub fn delete_where<T: Entity>(&self, predicate: &Expr) -> OrmResult<u64> {
        let mapping = mapping::<T>()?;
        let scope = [mapping.clone()];
        let where_clause = compile(predicate, &scope, false)?;
        self.delete_with_where(&mapping, Some(where_clause))
    }

    fn delete_with_where(
        &self,
        mapping: &TableMapping,
        where_clause: Option<String>,
    ) -> OrmResult<u64> {
        let (kind, mut conn) = self.registry.open(&mapping.database)?;
        let sql = kind.dialect().delete(&DeleteStmt {
            table: mapping.table.clone(),
            where_clause,
        })?;
        tracing::debug!(database = %mapping.database, %sql, "delete");
        conn.execute(&sql, &[])
    }

    /// Remove every row and reset identity state, with the engine's own
    /// truncation statement.
    pub fn truncate<T: Entity>(&self) -> OrmResult<u64> {
        let mapping = mapping::<T>()?;
        let (kind, mut conn) = self.registry.open(&mapping.database)?;
        let sql = kind.dialect().truncate(&mapping.table)?;
        tracing::debug!(database = %mapping.database, %sql, "truncate");
        conn.execute(&sql, &[])
    }

    // ==================== single-entity reads ====================

    /// Query one entity type, optionally filtered.
    pub fn query<T: Entity>(&self, predicate: Option<&Expr>) -> OrmResult<Vec<T>> {
        let mapping = mapping::<T>()?;
        let where_clause = match predicate {
            Some(p) => {
                let scope = [mapping.clone()];
                Some(compile(p, &scope, false)?)
            }
            None => None,
        };
        self.select_rows::<T>(&mapping, where_clause, None)
    }

    /// Query with an accumulated [`Condition`].
    pub fn query_by<T: Entity>(&self, condition: &Condition<T>) -> OrmResult<Vec<T>> {
        let mapping = mapping::<T>()?;
        let where_clause = (!condition.is_empty()).then(|| condition.to_sql());
        self.select_rows::<T>(&mapping, where_clause, None)
    }

    /// Paged query; `page_index` is 1-based. Rows are windowed over the
    /// primary-key columns, or the first mapped column without a key.
    pub fn query_page<T: Entity>(
        &self,
        predicate: Option<&Expr>,
        page_size: i64,
        page_index: i64,
    ) -> OrmResult<Vec<T>> {
        let mapping = mapping::<T>()?;
        let where_clause = match predicate {
            Some(p) => {
                let scope = [mapping.clone()];
                Some(compile(p, &scope, false)?)
            }
            None => None,
        };
        let page = Page {
            key_column: page_key(&mapping),
            size: page_size,
            index: page_index,
        };
        self.select_rows::<T>(&mapping, where_clause, Some(page))
    }

    /// `SELECT COUNT(*)`, optionally filtered.
    pub fn count<T: Entity>(&self, predicate: Option<&Expr>) -> OrmResult<i64> {
        let mapping = mapping::<T>()?;
        let where_clause = match predicate {
            Some(p) => {
                let scope = [mapping.clone()];
                Some(compile(p, &scope, false)?)
            }
            None => None,
        };
        self.count_rows(&mapping, where_clause)
    }

    pub fn count_by<T: Entity>(&self, condition: &Condition<T>) -> OrmResult<i64> {
        let mapping = mapping::<T>()?;
        let where_clause = (!condition.is_empty()).then(|| condition.to_sql());
        self.count_rows(&mapping, where_clause)
    }

    fn select_rows<T: Entity>(
        &self,
        mapping: &TableMapping,
        where_clause: Option<String>,
        page: Option<Page>,
    ) -> OrmResult<Vec<T>> {
        let (kind, mut conn) = self.registry.open(&mapping.database)?;
        let sql = kind.dialect().select(&SelectStmt {
            select: "*".to_string(),
            table: mapping.table.clone(),
            where_clause,
            page,
        })?;
        tracing::debug!(database = %mapping.database, %sql, "query");
        let mut cursor = conn.query(&sql, &[])?;
        let mut out = Vec::new();
        while let Some(row) = cursor.next_row()? {
            out.push(materialize_entity::<T>(&row)?);
        }
        Ok(out)
    }

    fn count_rows(&self, mapping: &TableMapping, where_clause: Option<String>) -> OrmResult<i64> {
        let (kind, mut conn) = self.registry.open(&mapping.database)?;
        let sql = kind.dialect().select(&SelectStmt {
            select: "COUNT(*)".to_string(),
            table: mapping.table.clone(),
            where_clause,
            page: None,
        })?;
        tracing::debug!(database = %mapping.database, %sql, "count");
        match conn.execute_scalar(&sql, &[])? {
            Value::Null => Ok(0),
            value => value.to_i64("COUNT(*)"),
        }
    }

    // ==================== introspection ====================

    /// Registered logical database names, in registration order.
    pub fn database_names(&self) -> Vec<String> {
        self.registry.names().into_iter().map(String::from).collect()
    }

    pub fn database_kind(&self, name: &str) -> OrmResult<DatabaseKind> {
        self.registry.kind(name)
    }

    /// Table names of a database, read from the engine's schema query.
    pub fn table_names(&self, database: &str) -> OrmResult<Vec<String>> {
        let (kind, mut conn) = self.registry.open(database)?;
        let sql = kind.dialect().tables_query()?;
        tracing::debug!(database, %sql, "tables");
        read_name_column(conn.query(&sql, &[])?)
    }

    pub fn table_names_of<T: Entity>(&self) -> OrmResult<Vec<String>> {
        let mapping = mapping::<T>()?;
        self.table_names(&mapping.database)
    }

    /// Column names of a table, read from the engine's schema query.
    pub fn column_names(&self, database: &str, table: &str) -> OrmResult<Vec<String>> {
        let (kind, mut conn) = self.registry.open(database)?;
        let sql = kind.dialect().columns_query(table)?;
        tracing::debug!(database, %sql, "columns");
        read_name_column(conn.query(&sql, &[])?)
    }

    pub fn column_names_of<T: Entity>(&self) -> OrmResult<Vec<String>> {
        let mapping = mapping::<T>()?;
        self.column_names(&mapping.database, &mapping.table)
    }

    // ==================== raw escape hatches ====================

    /// Run arbitrary SQL and project each row through `f`.
    pub fn execute_reader<R, F>(&self, database: &str, sql: &str, mut f: F) -> OrmResult<Vec<R>>
    where
        F: FnMut(&RowData) -> R,
    {
        let (_, mut conn) = self.registry.open(database)?;
        tracing::debug!(database, sql, "execute_reader");
        let mut cursor = conn.query(sql, &[])?;
        let mut out = Vec::new();
        while let Some(row) = cursor.next_row()? {
            out.push(f(&row));
        }
        Ok(out)
    }

    /// Run arbitrary SQL, returning the affected-row count.
    pub fn execute(&self, database: &str, sql: &str) -> OrmResult<u64> {
        let (_, mut conn) = self.registry.open(database)?;
        tracing::debug!(database, sql, "execute");
        conn.execute(sql, &[])
    }

    /// Run arbitrary SQL as a scalar read.
    pub fn execute_scalar(&self, database: &str, sql: &str) -> OrmResult<Value> {
        let (_, mut conn) = self.registry.open(database)?;
        tracing::debug!(database, sql, "execute_scalar");
        conn.execute_scalar(sql, &[])
    }

    // ==================== staged execution plumbing ====================

    pub(crate) fn run_rows(&self, database: &str, sql: &str) -> OrmResult<Vec<RowData>> {
        let (_, mut conn) = self.registry.open(database)?;
        tracing::debug!(database, sql, "query");
        let mut cursor = conn.query(sql, &[])?;
        let mut rows = Vec::new();
        while let Some(row) = cursor.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    pub(crate) fn run_scalar(&self, database: &str, sql: &str) -> OrmResult<Value> {
        let (_, mut conn) = self.registry.open(database)?;
        tracing::debug!(database, sql, "scalar");
        conn.execute_scalar(sql, &[])
    }
}

fn read_name_column(mut cursor: Box<dyn RowCursor>) -> OrmResult<Vec<String>> {
    let mut names = Vec::new();
    while let Some(row) = cursor.next_row()? {
        let value = row
            .get("name")
            .ok_or_else(|| OrmError::decode("name", "schema row has no 'name' column"))?;
        names.push(value.to_text("name")?);
    }
    Ok(names)
}

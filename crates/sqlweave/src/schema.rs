//! Entity-to-table mapping.
//!
//! Types describe their own mapping once through [`Entity::table`]; the first
//! use validates it and caches it process-wide, keyed by `TypeId`. After that
//! the mapping is immutable and column order is fixed at declaration order.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// One mapped column of an entity.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    /// Column name in the table
    pub column: String,
    /// Property name on the entity, defaults to the column name
    pub property: String,
    /// Part of the primary key
    pub primary_key: bool,
    /// Database-assigned identity column, excluded from INSERT column lists
    pub auto_id: bool,
    /// Mapped for reads but never written
    pub not_saved: bool,
}

/// Declarative table mapping, built fluently inside [`Entity::table`].
///
/// ```
/// use sqlweave::schema::TableDef;
///
/// let def = TableDef::new("main", "people")
///     .column("Id").primary_key().auto_id()
///     .column("Name")
///     .column("Age");
/// assert_eq!(def.columns.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct TableDef {
    pub database: String,
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            columns: Vec::new(),
        }
    }

    /// Declare a column; the property name defaults to the column name.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        self.columns.push(ColumnDef {
            property: column.clone(),
            column,
            primary_key: false,
            auto_id: false,
            not_saved: false,
        });
        self
    }

    /// Override the property name of the most recent column.
    pub fn property(mut self, property: impl Into<String>) -> Self {
        if let Some(last) = self.columns.last_mut() {
            last.property = property.into();
        }
        self
    }

    /// Mark the most recent column as part of the primary key.
    pub fn primary_key(mut self) -> Self {
        if let Some(last) = self.columns.last_mut() {
            last.primary_key = true;
        }
        self
    }

    /// Mark the most recent column as a database-assigned identity.
    pub fn auto_id(mut self) -> Self {
        if let Some(last) = self.columns.last_mut() {
            last.auto_id = true;
        }
        self
    }

    /// Mark the most recent column as read-only.
    pub fn not_saved(mut self) -> Self {
        if let Some(last) = self.columns.last_mut() {
            last.not_saved = true;
        }
        self
    }
}

/// A type that maps to a database table.
///
/// `get`/`set` move property values across the untyped boundary: `get` feeds
/// write parameters and predicate fallbacks, `set` is called by the
/// materializer for every mapped column present in a result row.
pub trait Entity: Default + 'static {
    /// The table mapping, declared once; validated and cached on first use.
    fn table() -> TableDef;

    /// Read a property by name. Unknown names return [`Value::Null`].
    fn get(&self, property: &str) -> Value;

    /// Write a property by name from a row value.
    fn set(&mut self, property: &str, value: &Value) -> OrmResult<()>;
}

/// A validated, cached mapping.
#[derive(Debug)]
pub struct TableMapping {
    /// Short entity type name, used in error messages
    pub entity: &'static str,
    pub database: String,
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

impl TableMapping {
    /// Find the column bound to a property name.
    pub fn column_for(&self, property: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.property == property)
    }

    pub fn primary_key_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    pub fn auto_id_column(&self) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.auto_id)
    }

    /// Columns that participate in INSERT/UPDATE statements.
    pub fn writable_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| !c.auto_id && !c.not_saved)
    }
}

fn cache() -> &'static RwLock<HashMap<TypeId, Arc<TableMapping>>> {
    static CACHE: OnceLock<RwLock<HashMap<TypeId, Arc<TableMapping>>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Short type name without the module path.
pub(crate) fn entity_name<T: 'static>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Look up (and on first use validate and cache) the mapping of `T`.
pub fn mapping<T: Entity>() -> OrmResult<Arc<TableMapping>> {
    let key = TypeId::of::<T>();
    if let Some(found) = cache()
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(&key)
    {
        return Ok(Arc::clone(found));
    }

    let def = T::table();
    let entity = entity_name::<T>();
    if def.table.is_empty() {
        return Err(OrmError::schema(format!("{entity}: empty table name")));
    }
    if def.columns.is_empty() {
        return Err(OrmError::schema(format!("{entity}: no columns declared")));
    }
    if def.columns.iter().filter(|c| c.auto_id).count() > 1 {
        return Err(OrmError::schema(format!(
            "{entity}: more than one auto-id column"
        )));
    }

    let built = Arc::new(TableMapping {
        entity,
        database: def.database,
        table: def.table,
        columns: def.columns,
    });
    let mut map = cache().write().unwrap_or_else(|e| e.into_inner());
    // a racing thread may have inserted the same mapping; both are equivalent
    Ok(Arc::clone(map.entry(key).or_insert(built)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Person {
        id: i64,
        name: String,
    }

    impl Entity for Person {
        fn table() -> TableDef {
            TableDef::new("main", "people")
                .column("Id")
                .primary_key()
                .auto_id()
                .column("Name")
        }

        fn get(&self, property: &str) -> Value {
            match property {
                "Id" => self.id.into(),
                "Name" => self.name.clone().into(),
                _ => Value::Null,
            }
        }

        fn set(&mut self, property: &str, value: &Value) -> OrmResult<()> {
            match property {
                "Id" => self.id = value.to_i64(property)?,
                "Name" => self.name = value.to_text(property)?,
                _ => {}
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct NoTable;

    impl Entity for NoTable {
        fn table() -> TableDef {
            TableDef::new("main", "")
        }
        fn get(&self, _: &str) -> Value {
            Value::Null
        }
        fn set(&mut self, _: &str, _: &Value) -> OrmResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct TwoIdentities;

    impl Entity for TwoIdentities {
        fn table() -> TableDef {
            TableDef::new("main", "t")
                .column("A")
                .auto_id()
                .column("B")
                .auto_id()
        }
        fn get(&self, _: &str) -> Value {
            Value::Null
        }
        fn set(&mut self, _: &str, _: &Value) -> OrmResult<()> {
            Ok(())
        }
    }

    #[test]
    fn mapping_is_cached() {
        let a = mapping::<Person>().unwrap();
        let b = mapping::<Person>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.table, "people");
        assert_eq!(a.entity, "Person");
    }

    #[test]
    fn empty_table_name_is_rejected() {
        let err = mapping::<NoTable>().unwrap_err();
        assert!(matches!(err, OrmError::Schema(_)));
    }

    #[test]
    fn duplicate_auto_id_is_rejected() {
        let err = mapping::<TwoIdentities>().unwrap_err();
        assert!(matches!(err, OrmError::Schema(_)));
    }

    #[test]
    fn writable_columns_skip_identity() {
        let m = mapping::<Person>().unwrap();
        let writable: Vec<_> = m.writable_columns().map(|c| c.column.as_str()).collect();
        assert_eq!(writable, ["Name"]);
        assert_eq!(m.auto_id_column().unwrap().column, "Id");
    }

    #[test]
    fn property_defaults_to_column_name() {
        let def = TableDef::new("d", "t").column("X").column("Y").property("y_prop");
        assert_eq!(def.columns[0].property, "X");
        assert_eq!(def.columns[1].property, "y_prop");
    }
}

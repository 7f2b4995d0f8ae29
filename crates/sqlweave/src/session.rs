//! Per-query session state.
//!
//! One `Session` lives behind exactly one builder chain. It pins the query to
//! a single database, tracks which entity types are bound (at most four, each
//! once), and accumulates SQL fragments in an append-only buffer.

use crate::error::{OrmError, OrmResult};
use crate::schema::{mapping, Entity, TableMapping};
use std::any::TypeId;
use std::sync::Arc;

/// Upper bound on entity types per query, matching the widest `from` arity.
pub const MAX_BOUND_TYPES: usize = 4;

#[derive(Debug, Default)]
pub struct Session {
    database: Option<String>,
    types: Vec<TypeId>,
    bound: Vec<Arc<TableMapping>>,
    script: Vec<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an entity type to this session.
    ///
    /// The first bind pins the session database. A type from a different
    /// database fails with `CrossDatabase`; a type already bound in this
    /// session fails with `DuplicateRegistration`. The cross-database check
    /// runs first.
    pub fn bind<T: Entity>(&mut self) -> OrmResult<Arc<TableMapping>> {
        let mapping = mapping::<T>()?;
        match &self.database {
            None => self.database = Some(mapping.database.clone()),
            Some(database) if *database != mapping.database => {
                return Err(OrmError::CrossDatabase {
                    entity: mapping.entity,
                    table: mapping.table.clone(),
                    database: database.clone(),
                });
            }
            Some(_) => {}
        }
        if self.types.contains(&TypeId::of::<T>()) {
            return Err(OrmError::DuplicateRegistration {
                entity: mapping.entity,
                table: mapping.table.clone(),
            });
        }
        if self.bound.len() >= MAX_BOUND_TYPES {
            return Err(OrmError::compilation(format!(
                "a query binds at most {MAX_BOUND_TYPES} entity types"
            )));
        }
        self.types.push(TypeId::of::<T>());
        self.bound.push(Arc::clone(&mapping));
        Ok(mapping)
    }

    /// Bind a joined entity type. Same checks as [`bind`](Self::bind): a type
    /// cannot join against itself or a previously joined type.
    pub fn bind_join<T: Entity>(&mut self) -> OrmResult<Arc<TableMapping>> {
        self.bind::<T>()
    }

    /// The bound mappings in registration order, for the predicate compiler.
    pub fn scope(&self) -> &[Arc<TableMapping>] {
        &self.bound
    }

    /// Number of bound entity types.
    pub fn arity(&self) -> usize {
        self.bound.len()
    }

    /// Column references qualify with the table name whenever more than one
    /// entity participates.
    pub fn qualify(&self) -> bool {
        self.bound.len() > 1
    }

    /// The database this session is pinned to.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Append a SQL fragment. Fragments are never edited or removed.
    pub fn push(&mut self, fragment: String) {
        self.script.push(fragment);
    }

    /// The accumulated statement text.
    pub fn sql(&self) -> String {
        self.script.concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableDef;
    use crate::value::Value;

    macro_rules! test_entity {
        ($name:ident, $db:literal, $table:literal) => {
            #[derive(Default)]
            struct $name;

            impl Entity for $name {
                fn table() -> TableDef {
                    TableDef::new($db, $table).column("Id").primary_key()
                }
                fn get(&self, _: &str) -> Value {
                    Value::Null
                }
                fn set(&mut self, _: &str, _: &Value) -> OrmResult<()> {
                    Ok(())
                }
            }
        };
    }

    test_entity!(Customer, "app", "customers");
    test_entity!(Invoice, "app", "invoices");
    test_entity!(AuditRow, "audit", "audit_rows");

    #[test]
    fn first_bind_pins_the_database() {
        let mut session = Session::new();
        session.bind::<Customer>().unwrap();
        assert_eq!(session.database(), Some("app"));
        assert_eq!(session.arity(), 1);
        assert!(!session.qualify());
    }

    #[test]
    fn rebinding_the_same_type_fails() {
        let mut session = Session::new();
        session.bind::<Customer>().unwrap();
        let err = session.bind_join::<Customer>().unwrap_err();
        assert!(err.is_duplicate_registration());
    }

    #[test]
    fn cross_database_bind_fails() {
        let mut session = Session::new();
        session.bind::<Customer>().unwrap();
        let err = session.bind_join::<AuditRow>().unwrap_err();
        assert!(err.is_cross_database());
        // nothing was emitted before the failure
        assert_eq!(session.sql(), "");
    }

    #[test]
    fn two_types_switch_to_qualified_mode() {
        let mut session = Session::new();
        session.bind::<Customer>().unwrap();
        session.bind_join::<Invoice>().unwrap();
        assert!(session.qualify());
        assert_eq!(session.arity(), 2);
    }

    #[test]
    fn script_is_append_only_concat() {
        let mut session = Session::new();
        session.push(" FROM customers".to_string());
        session.push(" WHERE (Id = 1)".to_string());
        assert_eq!(session.sql(), " FROM customers WHERE (Id = 1)");
    }
}

//! Shared test fixtures: an in-memory recording connection and a few mapped
//! entities.
#![allow(dead_code)]

use sqlweave::{
    Connection, ConnectionSource, Database, DatabaseKind, Entity, OrmResult, RowCursor, RowData,
    TableDef, Value,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Backing store behind a registered memory database: records every
/// statement and hands out canned rows.
#[derive(Default)]
pub struct MemoryStore {
    pub statements: RefCell<Vec<String>>,
    pub params: RefCell<Vec<Vec<(String, Value)>>>,
    pub rows: RefCell<Vec<RowData>>,
}

impl MemoryStore {
    pub fn set_rows(&self, rows: Vec<RowData>) {
        *self.rows.borrow_mut() = rows;
    }

    pub fn last_statement(&self) -> String {
        self.statements.borrow().last().cloned().unwrap_or_default()
    }

    pub fn last_params(&self) -> Vec<(String, Value)> {
        self.params.borrow().last().cloned().unwrap_or_default()
    }
}

struct MemoryConnection {
    store: Rc<MemoryStore>,
}

struct VecCursor {
    rows: std::vec::IntoIter<RowData>,
}

impl RowCursor for VecCursor {
    fn next_row(&mut self) -> OrmResult<Option<RowData>> {
        Ok(self.rows.next())
    }
}

impl Connection for MemoryConnection {
    fn query(&mut self, sql: &str, params: &[(String, Value)]) -> OrmResult<Box<dyn RowCursor>> {
        self.store.statements.borrow_mut().push(sql.to_string());
        self.store.params.borrow_mut().push(params.to_vec());
        Ok(Box::new(VecCursor {
            rows: self.store.rows.borrow().clone().into_iter(),
        }))
    }

    fn execute(&mut self, sql: &str, params: &[(String, Value)]) -> OrmResult<u64> {
        self.store.statements.borrow_mut().push(sql.to_string());
        self.store.params.borrow_mut().push(params.to_vec());
        Ok(1)
    }
}

/// Register an in-memory database under `name` and return its store.
pub fn register_memory(db: &mut Database, name: &str, kind: DatabaseKind) -> Rc<MemoryStore> {
    let store = Rc::new(MemoryStore::default());
    let opener_store = Rc::clone(&store);
    db.register(
        name,
        ConnectionSource::new(kind, move || {
            Ok(Box::new(MemoryConnection {
                store: Rc::clone(&opener_store),
            }))
        }),
    );
    store
}

pub fn row(pairs: &[(&str, Value)]) -> RowData {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Person {
    pub id: i64,
    pub name: String,
}

impl Entity for Person {
    fn table() -> TableDef {
        TableDef::new("app", "people")
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

#[derive(Debug, Default, Clone, PartialEq)]
pub struct OrderRec {
    pub id: i64,
    pub person_id: i64,
    pub total: i64,
}

impl Entity for OrderRec {
    fn table() -> TableDef {
        TableDef::new("app", "orders")
            .column("Id")
            .primary_key()
            .auto_id()
            .column("PersonId")
            .column("Total")
    }

    fn get(&self, property: &str) -> Value {
        match property {
            "Id" => self.id.into(),
            "PersonId" => self.person_id.into(),
            "Total" => self.total.into(),
            _ => Value::Null,
        }
    }

    fn set(&mut self, property: &str, value: &Value) -> OrmResult<()> {
        match property {
            "Id" => self.id = value.to_i64(property)?,
            "PersonId" => self.person_id = value.to_i64(property)?,
            "Total" => self.total = value.to_i64(property)?,
            _ => {}
        }
        Ok(())
    }
}

/// Lives in a different logical database than `Person`/`OrderRec`.
#[derive(Debug, Default)]
pub struct AuditEntry {
    pub id: i64,
}

impl Entity for AuditEntry {
    fn table() -> TableDef {
        TableDef::new("audit", "audit_log").column("Id").primary_key()
    }

    fn get(&self, property: &str) -> Value {
        match property {
            "Id" => self.id.into(),
            _ => Value::Null,
        }
    }

    fn set(&mut self, property: &str, value: &Value) -> OrmResult<()> {
        if property == "Id" {
            self.id = value.to_i64(property)?;
        }
        Ok(())
    }
}

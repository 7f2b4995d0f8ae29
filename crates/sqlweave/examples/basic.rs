//! Basic usage: mapping, CRUD and single-entity queries.
//!
//! Run with: cargo run --example basic -p sqlweave
//!
//! sqlweave is driver-agnostic, so this example registers a tiny in-memory
//! connection that records every statement and replays canned rows. A real
//! application would register a `ConnectionSource` backed by an actual
//! driver instead.

use sqlweave::expr::col;
use sqlweave::{
    Condition, Connection, ConnectionSource, Database, DatabaseKind, Entity, OrmError, OrmResult,
    RowCursor, RowData, TableDef, Value,
};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Person {
    id: i64,
    name: String,
    age: i64,
}

impl Entity for Person {
    fn table() -> TableDef {
        TableDef::new("app", "people")
            .column("Id")
            .primary_key()
            .auto_id()
            .column("Name")
            .column("Age")
    }

    fn get(&self, property: &str) -> Value {
        match property {
            "Id" => self.id.into(),
            "Name" => self.name.clone().into(),
            "Age" => self.age.into(),
            _ => Value::Null,
        }
    }

    fn set(&mut self, property: &str, value: &Value) -> OrmResult<()> {
        match property {
            "Id" => self.id = value.to_i64(property)?,
            "Name" => self.name = value.to_text(property)?,
            "Age" => self.age = value.to_i64(property)?,
            _ => {}
        }
        Ok(())
    }
}

#[derive(Default)]
struct MemoryStore {
    rows: RefCell<Vec<RowData>>,
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
    fn query(&mut self, sql: &str, _: &[(String, Value)]) -> OrmResult<Box<dyn RowCursor>> {
        println!("  -> {sql}");
        Ok(Box::new(VecCursor {
            rows: self.store.rows.borrow().clone().into_iter(),
        }))
    }

    fn execute(&mut self, sql: &str, _: &[(String, Value)]) -> OrmResult<u64> {
        println!("  -> {sql}");
        Ok(1)
    }
}

fn main() -> Result<(), OrmError> {
    tracing_subscriber::fmt::init();

    let store = Rc::new(MemoryStore::default());
    let mut db = Database::new();
    let opener_store = Rc::clone(&store);
    db.register(
        "app",
        ConnectionSource::new(DatabaseKind::Sqlite, move || {
            Ok(Box::new(MemoryConnection {
                store: Rc::clone(&opener_store),
            }))
        }),
    );

    // ============================================
    // Insert: the assigned id is written back
    // ============================================
    println!("=== Insert ===");
    *store.rows.borrow_mut() = vec![[("AutoId".to_string(), Value::Int(1))]
        .into_iter()
        .collect()];
    let mut ann = Person {
        id: 0,
        name: "Ann".to_string(),
        age: 34,
    };
    let id = db.insert(&mut ann)?;
    println!("inserted with id {id}, entity now {ann:?}");

    // ============================================
    // Query with a predicate
    // ============================================
    println!("\n=== Query ===");
    *store.rows.borrow_mut() = vec![[
        ("Id".to_string(), Value::Int(1)),
        ("Name".to_string(), Value::from("Ann")),
        ("Age".to_string(), Value::Int(34)),
    ]
    .into_iter()
    .collect()];
    let adults: Vec<Person> = db.query(Some(&col(0, "Age").ge(18)))?;
    println!("matched: {adults:?}");

    // ============================================
    // Condition object
    // ============================================
    println!("\n=== Condition ===");
    let mut condition = Condition::<Person>::new();
    condition.and(&col(0, "Name").contains("nn"))?;
    condition.and(&col(0, "Age").lt(65))?;
    let found = db.query_by(&condition)?;
    println!("matched: {found:?}");

    // ============================================
    // Paged query and count
    // ============================================
    println!("\n=== Page and count ===");
    let _page: Vec<Person> = db.query_page(None, 10, 1)?;
    *store.rows.borrow_mut() = vec![[("COUNT(*)".to_string(), Value::Int(1))]
        .into_iter()
        .collect()];
    let count = db.count::<Person>(None)?;
    println!("count: {count}");

    // ============================================
    // Update and delete key on the primary key
    // ============================================
    println!("\n=== Update / delete ===");
    ann.age = 35;
    db.update(&ann)?;
    db.delete(&ann)?;
    db.delete_where::<Person>(&col(0, "Age").gt(100))?;

    Ok(())
}

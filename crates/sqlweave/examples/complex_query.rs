//! Staged multi-entity queries: joins, qualified columns, ordering.
//!
//! Run with: cargo run --example complex_query -p sqlweave
//!
//! Uses the same in-memory connection trick as the `basic` example; the
//! interesting part here is the SQL each stage produces.

use sqlweave::expr::col;
use sqlweave::{
    Connection, ConnectionSource, Database, DatabaseKind, Entity, OrmError, OrmResult, RowCursor,
    RowData, TableDef, Value,
};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Person {
    id: i64,
    name: String,
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

#[derive(Debug, Default)]
struct Order {
    id: i64,
    person_id: i64,
    total: i64,
}

impl Entity for Order {
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
    fn query(&mut self, _: &str, _: &[(String, Value)]) -> OrmResult<Box<dyn RowCursor>> {
        Ok(Box::new(VecCursor {
            rows: self.store.rows.borrow().clone().into_iter(),
        }))
    }

    fn execute(&mut self, _: &str, _: &[(String, Value)]) -> OrmResult<u64> {
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
    // Single entity: columns render bare
    // ============================================
    println!("=== Single entity ===");
    let stage = db.from::<Person>()?.filter(&col(0, "Name").eq("Ann"))?;
    println!("{}", stage.to_sql());

    // ============================================
    // Join: every column qualifies with its table
    // ============================================
    println!("\n=== Inner join ===");
    let stage = db
        .from::<Person>()?
        .inner_join::<Order>(&col(0, "Id").eq(col(1, "PersonId")))?
        .filter(&col(1, "Total").gt(100))?
        .order_by_asc(&col(0, "Id"))?;
    println!("{}", stage.to_sql());

    *store.rows.borrow_mut() = vec![[
        ("Id".to_string(), Value::Int(1)),
        ("Name".to_string(), Value::from("Ann")),
        ("PersonId".to_string(), Value::Int(1)),
        ("Total".to_string(), Value::Int(250)),
    ]
    .into_iter()
    .collect()];
    let pairs = stage.query_map(|(person, order): (Person, Order)| {
        format!("{} spent {}", person.name, order.total)
    })?;
    for line in pairs {
        println!("{line}");
    }

    // ============================================
    // Cartesian source: two types in one FROM
    // ============================================
    println!("\n=== Two-entity FROM ===");
    let stage = db
        .from2::<Person, Order>()?
        .filter(&col(0, "Id").eq(col(1, "PersonId")))?;
    println!("{}", stage.to_sql());

    // ============================================
    // Guard rails
    // ============================================
    println!("\n=== Guard rails ===");
    let err = db
        .from::<Person>()?
        .inner_join::<Person>(&col(0, "Id").eq(col(1, "Id")))
        .unwrap_err();
    println!("rejoining the same type: {err}");

    Ok(())
}

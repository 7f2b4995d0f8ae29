//! # sqlweave
//!
//! A typed multi-entity SQL query layer.
//!
//! ## Features
//!
//! - **Declarative mapping**: each type states its table once via [`Entity`],
//!   validated and cached process-wide
//! - **Value-carrying predicates**: expression trees built from [`col`] /
//!   [`lit`] compile deterministically to SQL fragments
//! - **Staged queries**: `FROM` → `INNER JOIN` → `WHERE` → `ORDER BY`, up to
//!   four entity types per query, each registered exactly once
//! - **Per-engine SQL**: statement templates for SQL Server, SQLite, Oracle,
//!   MySQL and OLE DB, with honest `UnsupportedDialect` gaps
//! - **Driver-agnostic**: synchronous [`Connection`] / [`RowCursor`] seam;
//!   physical drivers live outside the crate
//!
//! ## Staged query
//!
//! ```ignore
//! use sqlweave::{col, Database};
//!
//! let people = db
//!     .from::<Person>()?
//!     .filter(&col(0, "Name").eq("Ann"))?
//!     .query()?;
//!
//! let pairs = db
//!     .from::<Person>()?
//!     .inner_join::<Order>(&col(0, "Id").eq(col(1, "PersonId")))?
//!     .filter(&col(1, "Total").gt(100))?
//!     .order_by_asc(&col(0, "Id"))?
//!     .query()?;
//! ```

pub mod condition;
pub mod conn;
pub mod db;
pub mod dialect;
pub mod error;
pub mod expr;
pub mod query;
pub mod schema;
pub mod session;
pub mod value;

pub use condition::Condition;
pub use conn::{Connection, ConnectionRegistry, ConnectionSource, RowCursor, RowData};
pub use db::Database;
pub use dialect::{
    DatabaseKind, DeleteStmt, InsertStmt, Page, SelectStmt, SqlDialect, UpdateStmt,
};
pub use error::{OrmError, OrmResult};
pub use expr::{col, lit, BinOp, Expr, UnaryOp};
pub use query::{EntitySet, FilterStage, JoinStage, OrderStage, SourceStage};
pub use schema::{ColumnDef, Entity, TableDef, TableMapping};
pub use session::Session;
pub use value::Value;

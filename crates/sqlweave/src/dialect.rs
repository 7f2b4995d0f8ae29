//! Per-engine SQL statement templates.
//!
//! Each supported engine implements [`SqlDialect`] over fixed parameter
//! structs. Engine coverage is uneven on purpose: engines without a template
//! for an operation return [`OrmError::UnsupportedDialect`] instead of
//! guessing at portable SQL.

use crate::error::{OrmError, OrmResult};

/// The database engine behind a configured connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseKind {
    SqlServer,
    Oracle,
    MySql,
    Sqlite,
    OleDb,
}

impl DatabaseKind {
    /// The statement templates for this engine.
    pub fn dialect(self) -> &'static dyn SqlDialect {
        match self {
            DatabaseKind::SqlServer => &SqlServer,
            DatabaseKind::Oracle => &Oracle,
            DatabaseKind::MySql => &MySql,
            DatabaseKind::Sqlite => &Sqlite,
            DatabaseKind::OleDb => &OleDb,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DatabaseKind::SqlServer => "SqlServer",
            DatabaseKind::Oracle => "Oracle",
            DatabaseKind::MySql => "MySql",
            DatabaseKind::Sqlite => "Sqlite",
            DatabaseKind::OleDb => "OleDb",
        }
    }
}

/// Page window of a paged SELECT. `index` is 1-based.
#[derive(Debug, Clone)]
pub struct Page {
    /// ORDER BY / row-numbering key
    pub key_column: String,
    pub size: i64,
    pub index: i64,
}

#[derive(Debug, Clone)]
pub struct SelectStmt {
    /// Projection list, usually `*`
    pub select: String,
    pub table: String,
    pub where_clause: Option<String>,
    pub page: Option<Page>,
}

#[derive(Debug, Clone)]
pub struct InsertStmt {
    pub table: String,
    /// Column names, doubling as statement parameter names
    pub columns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateStmt {
    pub table: String,
    pub columns: Vec<String>,
    pub where_clause: String,
}

#[derive(Debug, Clone)]
pub struct DeleteStmt {
    pub table: String,
    pub where_clause: Option<String>,
}

/// Statement templates for one engine.
pub trait SqlDialect {
    /// Named-parameter prefix in statement text (`@`, `:` or `?`).
    fn param_prefix(&self) -> &'static str;

    fn select(&self, stmt: &SelectStmt) -> OrmResult<String>;

    /// INSERT followed by the engine's identity-retrieval statement.
    fn insert(&self, stmt: &InsertStmt) -> OrmResult<String>;

    fn update(&self, stmt: &UpdateStmt) -> OrmResult<String>;

    fn delete(&self, stmt: &DeleteStmt) -> OrmResult<String>;

    fn truncate(&self, table: &str) -> OrmResult<String>;

    /// Standalone identity-retrieval statement.
    fn identity(&self) -> OrmResult<String>;

    /// Query listing the table names of the current database.
    fn tables_query(&self) -> OrmResult<String>;

    /// Query listing the column names of a table.
    fn columns_query(&self, table: &str) -> OrmResult<String>;
}

fn unsupported(engine: &str, operation: &str) -> OrmError {
    OrmError::UnsupportedDialect(format!("{engine} has no {operation} template"))
}

/// `col1,col2` / `@col1,@col2` halves of an INSERT.
fn insert_parts(prefix: &str, columns: &[String]) -> (String, String) {
    let names = columns.join(",");
    let values = columns
        .iter()
        .map(|c| format!("{prefix}{c}"))
        .collect::<Vec<_>>()
        .join(",");
    (names, values)
}

/// `col1=@col1,col2=@col2` SET list of an UPDATE.
fn update_sets(prefix: &str, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| format!("{c}={prefix}{c}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn plain_select(stmt: &SelectStmt) -> String {
    match &stmt.where_clause {
        Some(w) if !w.is_empty() => {
            format!("SELECT {} FROM {} WHERE {w}", stmt.select, stmt.table)
        }
        _ => format!("SELECT {} FROM {}", stmt.select, stmt.table),
    }
}

fn plain_delete(stmt: &DeleteStmt) -> String {
    match &stmt.where_clause {
        Some(w) if !w.is_empty() => format!("DELETE FROM {} WHERE {w}", stmt.table),
        _ => format!("DELETE FROM {}", stmt.table),
    }
}

pub struct SqlServer;

impl SqlDialect for SqlServer {
    fn param_prefix(&self) -> &'static str {
        "@"
    }

    fn select(&self, stmt: &SelectStmt) -> OrmResult<String> {
        match &stmt.page {
            Some(page) if page.size > 0 => {
                let Page {
                    key_column,
                    size,
                    index,
                } = page;
                Ok(match &stmt.where_clause {
                    Some(w) if !w.is_empty() => format!(
                        "SELECT TOP {size} {} FROM(SELECT ROW_NUMBER() OVER(ORDER BY {key_column}) AS ROWNUMBER,* FROM {} WHERE {w}) A WHERE ROWNUMBER > {} * {size}",
                        stmt.select,
                        stmt.table,
                        index - 1
                    ),
                    _ => format!(
                        "SELECT TOP {size} {} FROM(SELECT ROW_NUMBER() OVER(ORDER BY {key_column}) AS ROWNUMBER,* FROM {}) A WHERE ROWNUMBER > {} * {size}",
                        stmt.select,
                        stmt.table,
                        index - 1
                    ),
                })
            }
            _ => Ok(plain_select(stmt)),
        }
    }

    fn insert(&self, stmt: &InsertStmt) -> OrmResult<String> {
        let (columns, values) = insert_parts(self.param_prefix(), &stmt.columns);
        Ok(format!(
            "INSERT INTO {}({columns}) VALUES({values});{}",
            stmt.table,
            self.identity()?
        ))
    }

    fn update(&self, stmt: &UpdateStmt) -> OrmResult<String> {
        Ok(format!(
            "UPDATE {} SET {} WHERE {}",
            stmt.table,
            update_sets(self.param_prefix(), &stmt.columns),
            stmt.where_clause
        ))
    }

    fn delete(&self, stmt: &DeleteStmt) -> OrmResult<String> {
        Ok(plain_delete(stmt))
    }

    fn truncate(&self, table: &str) -> OrmResult<String> {
        Ok(format!("TRUNCATE TABLE {table}"))
    }

    fn identity(&self) -> OrmResult<String> {
        Ok("SELECT SCOPE_IDENTITY() AS AutoId".to_string())
    }

    fn tables_query(&self) -> OrmResult<String> {
        Ok("SELECT name FROM SYS.TABLES".to_string())
    }

    fn columns_query(&self, table: &str) -> OrmResult<String> {
        Ok(format!(
            "SELECT * FROM SYSCOLUMNS WHERE id=OBJECT_ID('{table}')"
        ))
    }
}

pub struct Sqlite;

impl SqlDialect for Sqlite {
    fn param_prefix(&self) -> &'static str {
        "@"
    }

    fn select(&self, stmt: &SelectStmt) -> OrmResult<String> {
        match &stmt.page {
            Some(page) if page.size > 0 => {
                let Page {
                    key_column,
                    size,
                    index,
                } = page;
                let offset = size * (index - 1);
                Ok(match &stmt.where_clause {
                    Some(w) if !w.is_empty() => format!(
                        "SELECT {} FROM {} WHERE {w} ORDER BY {key_column} LIMIT {size} OFFSET {offset}",
                        stmt.select, stmt.table
                    ),
                    _ => format!(
                        "SELECT {} FROM {} ORDER BY {key_column} LIMIT {size} OFFSET {offset}",
                        stmt.select, stmt.table
                    ),
                })
            }
            _ => Ok(plain_select(stmt)),
        }
    }

    fn insert(&self, stmt: &InsertStmt) -> OrmResult<String> {
        let (columns, values) = insert_parts(self.param_prefix(), &stmt.columns);
        Ok(format!(
            "INSERT INTO {}({columns}) VALUES({values});{}",
            stmt.table,
            self.identity()?
        ))
    }

    fn update(&self, stmt: &UpdateStmt) -> OrmResult<String> {
        Ok(format!(
            "UPDATE {} SET {} WHERE {}",
            stmt.table,
            update_sets(self.param_prefix(), &stmt.columns),
            stmt.where_clause
        ))
    }

    fn delete(&self, stmt: &DeleteStmt) -> OrmResult<String> {
        Ok(plain_delete(stmt))
    }

    /// SQLite has no TRUNCATE: delete everything, reset the rowid sequence
    /// and reclaim the space.
    fn truncate(&self, table: &str) -> OrmResult<String> {
        Ok(format!(
            "DELETE FROM {table};UPDATE sqlite_sequence SET seq = 0 WHERE name ='{table}';VACUUM;"
        ))
    }

    fn identity(&self) -> OrmResult<String> {
        Ok("SELECT last_insert_rowid()".to_string())
    }

    fn tables_query(&self) -> OrmResult<String> {
        Ok("SELECT name FROM SQLITE_MASTER".to_string())
    }

    fn columns_query(&self, table: &str) -> OrmResult<String> {
        Ok(format!("PRAGMA TABLE_INFO({table})"))
    }
}

pub struct Oracle;

impl SqlDialect for Oracle {
    fn param_prefix(&self) -> &'static str {
        ":"
    }

    fn select(&self, stmt: &SelectStmt) -> OrmResult<String> {
        match &stmt.page {
            Some(page) if page.size > 0 => {
                let upper = page.size * page.index;
                let lower = page.size * page.index - 1;
                Ok(match &stmt.where_clause {
                    // the filter lands outside the ROWNUM sub-select
                    Some(w) if !w.is_empty() => format!(
                        "SELECT * FROM (SELECT A.*, ROWNUM RN FROM (SELECT * FROM {}) A WHERE ROWNUM <= {upper}) WHERE RN > {lower} AND {w}",
                        stmt.table
                    ),
                    _ => format!(
                        "SELECT * FROM (SELECT A.*, ROWNUM RN FROM (SELECT * FROM {}) A WHERE ROWNUM <= {upper}) WHERE RN > {lower}",
                        stmt.table
                    ),
                })
            }
            _ => Ok(plain_select(stmt)),
        }
    }

    /// Oracle INSERT appends the identity statement, which this engine does
    /// not have; the whole operation is unavailable.
    fn insert(&self, _: &InsertStmt) -> OrmResult<String> {
        Err(unsupported("Oracle", "identity"))
    }

    fn update(&self, stmt: &UpdateStmt) -> OrmResult<String> {
        Ok(format!(
            "UPDATE {} SET {} WHERE {}",
            stmt.table,
            update_sets(self.param_prefix(), &stmt.columns),
            stmt.where_clause
        ))
    }

    fn delete(&self, stmt: &DeleteStmt) -> OrmResult<String> {
        Ok(plain_delete(stmt))
    }

    fn truncate(&self, table: &str) -> OrmResult<String> {
        Ok(format!("TRUNCATE TABLE {table}"))
    }

    fn identity(&self) -> OrmResult<String> {
        Err(unsupported("Oracle", "identity"))
    }

    fn tables_query(&self) -> OrmResult<String> {
        Err(unsupported("Oracle", "tables"))
    }

    fn columns_query(&self, _: &str) -> OrmResult<String> {
        Err(unsupported("Oracle", "columns"))
    }
}

pub struct MySql;

impl SqlDialect for MySql {
    fn param_prefix(&self) -> &'static str {
        "?"
    }

    fn select(&self, _: &SelectStmt) -> OrmResult<String> {
        Err(unsupported("MySql", "select"))
    }

    fn insert(&self, _: &InsertStmt) -> OrmResult<String> {
        Err(unsupported("MySql", "insert"))
    }

    fn update(&self, _: &UpdateStmt) -> OrmResult<String> {
        Err(unsupported("MySql", "update"))
    }

    fn delete(&self, _: &DeleteStmt) -> OrmResult<String> {
        Err(unsupported("MySql", "delete"))
    }

    fn truncate(&self, _: &str) -> OrmResult<String> {
        Err(unsupported("MySql", "truncate"))
    }

    fn identity(&self) -> OrmResult<String> {
        Ok("SELECT @@IDENTITY".to_string())
    }

    fn tables_query(&self) -> OrmResult<String> {
        Err(unsupported("MySql", "tables"))
    }

    fn columns_query(&self, _: &str) -> OrmResult<String> {
        Err(unsupported("MySql", "columns"))
    }
}

pub struct OleDb;

impl SqlDialect for OleDb {
    fn param_prefix(&self) -> &'static str {
        "@"
    }

    fn select(&self, _: &SelectStmt) -> OrmResult<String> {
        Err(unsupported("OleDb", "select"))
    }

    fn insert(&self, _: &InsertStmt) -> OrmResult<String> {
        Err(unsupported("OleDb", "insert"))
    }

    fn update(&self, _: &UpdateStmt) -> OrmResult<String> {
        Err(unsupported("OleDb", "update"))
    }

    fn delete(&self, _: &DeleteStmt) -> OrmResult<String> {
        Err(unsupported("OleDb", "delete"))
    }

    fn truncate(&self, _: &str) -> OrmResult<String> {
        Err(unsupported("OleDb", "truncate"))
    }

    fn identity(&self) -> OrmResult<String> {
        Ok("SELECT @@IDENTITY AS AutoId".to_string())
    }

    fn tables_query(&self) -> OrmResult<String> {
        Err(unsupported("OleDb", "tables"))
    }

    fn columns_query(&self, _: &str) -> OrmResult<String> {
        Err(unsupported("OleDb", "columns"))
    }
}

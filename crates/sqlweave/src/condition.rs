//! Standalone accumulating filter.
//!
//! A `Condition` collects predicate fragments for one entity type outside of
//! any builder chain, then hands the combined `WHERE` text to
//! [`Database::query_by`](crate::db::Database::query_by) and friends.

use crate::error::OrmResult;
use crate::expr::{compile, Expr};
use crate::schema::{mapping, Entity};
use std::marker::PhantomData;

#[derive(Debug, Clone)]
pub struct Condition<T: Entity> {
    fragments: Vec<String>,
    _marker: PhantomData<T>,
}

impl<T: Entity> Condition<T> {
    pub fn new() -> Self {
        Self {
            fragments: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Compile a predicate against `T` and AND it onto the condition.
    /// Single-entity, so columns render bare.
    pub fn and(&mut self, predicate: &Expr) -> OrmResult<&mut Self> {
        let scope = [mapping::<T>()?];
        self.fragments.push(compile(predicate, &scope, false)?);
        Ok(self)
    }

    /// AND a literal SQL fragment onto the condition.
    pub fn and_raw(&mut self, sql: impl Into<String>) -> &mut Self {
        self.fragments.push(sql.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// The combined `WHERE` text, empty when nothing was added.
    pub fn to_sql(&self) -> String {
        self.fragments.join(" AND ")
    }
}

impl<T: Entity> Default for Condition<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::col;
    use crate::schema::TableDef;
    use crate::value::Value;

    #[derive(Default)]
    struct Widget {
        id: i64,
    }

    impl Entity for Widget {
        fn table() -> TableDef {
            TableDef::new("app", "widgets")
                .column("Id")
                .primary_key()
                .column("Label")
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

    #[test]
    fn fragments_join_with_and() {
        let mut condition = Condition::<Widget>::new();
        condition.and(&col(0, "Id").gt(5)).unwrap();
        condition.and(&col(0, "Label").contains("x")).unwrap();
        assert_eq!(condition.to_sql(), "(Id > 5) AND (Label LIKE '%x%')");
    }

    #[test]
    fn raw_fragments_pass_through() {
        let mut condition = Condition::<Widget>::new();
        condition.and_raw("Id IN (SELECT WidgetId FROM stock)");
        assert_eq!(condition.to_sql(), "Id IN (SELECT WidgetId FROM stock)");
    }

    #[test]
    fn empty_condition_renders_empty() {
        let condition = Condition::<Widget>::new();
        assert!(condition.is_empty());
        assert_eq!(condition.to_sql(), "");
    }
}

//! Staged multi-entity query builder.
//!
//! A query moves through four stages, each consuming the previous one:
//! Source (`FROM`), Join (`INNER JOIN … ON`), Filter (`WHERE`) and Order
//! (`ORDER BY`). Every stage can execute. The underlying [`Session`] buffer
//! is append-only, so the chain only ever moves forward.
//!
//! Arity is handled by one generic stage per clause over an [`EntitySet`]
//! tuple: `db.from::<Person>()` works with `(Person,)`,
//! `db.from2::<Person, Order>()` with `(Person, Order)`, up to four types.

use crate::conn::RowData;
use crate::db::Database;
use crate::error::{OrmError, OrmResult};
use crate::expr::{compile, Expr};
use crate::schema::{mapping, Entity};
use crate::session::Session;
use crate::value::Value;
use std::marker::PhantomData;

/// Build one entity from a result row. Mapped columns absent from the row or
/// carrying NULL leave the property at its `Default` value.
pub(crate) fn materialize_entity<T: Entity>(row: &RowData) -> OrmResult<T> {
    let mapping = mapping::<T>()?;
    let mut entity = T::default();
    for column in &mapping.columns {
        if let Some(value) = row.get(&column.column) {
            if !value.is_null() {
                entity.set(&column.property, value)?;
            }
        }
    }
    Ok(entity)
}

/// A bounded tuple of entity types participating in one query.
pub trait EntitySet {
    /// What one result row materializes into: the entity itself for a
    /// single-type query, a tuple in registration order otherwise.
    type Row;

    /// Bind every member type into the session, in order.
    fn bind(session: &mut Session) -> OrmResult<()>;

    fn materialize(row: &RowData) -> OrmResult<Self::Row>;
}

impl<T0: Entity> EntitySet for (T0,) {
    type Row = T0;

    fn bind(session: &mut Session) -> OrmResult<()> {
        session.bind::<T0>()?;
        Ok(())
    }

    fn materialize(row: &RowData) -> OrmResult<Self::Row> {
        materialize_entity::<T0>(row)
    }
}

impl<T0: Entity, T1: Entity> EntitySet for (T0, T1) {
    type Row = (T0, T1);

    fn bind(session: &mut Session) -> OrmResult<()> {
        session.bind::<T0>()?;
        session.bind::<T1>()?;
        Ok(())
    }

    fn materialize(row: &RowData) -> OrmResult<Self::Row> {
        Ok((materialize_entity::<T0>(row)?, materialize_entity::<T1>(row)?))
    }
}

impl<T0: Entity, T1: Entity, T2: Entity> EntitySet for (T0, T1, T2) {
    type Row = (T0, T1, T2);

    fn bind(session: &mut Session) -> OrmResult<()> {
        session.bind::<T0>()?;
        session.bind::<T1>()?;
        session.bind::<T2>()?;
        Ok(())
    }

    fn materialize(row: &RowData) -> OrmResult<Self::Row> {
        Ok((
            materialize_entity::<T0>(row)?,
            materialize_entity::<T1>(row)?,
            materialize_entity::<T2>(row)?,
        ))
    }
}

impl<T0: Entity, T1: Entity, T2: Entity, T3: Entity> EntitySet for (T0, T1, T2, T3) {
    type Row = (T0, T1, T2, T3);

    fn bind(session: &mut Session) -> OrmResult<()> {
        session.bind::<T0>()?;
        session.bind::<T1>()?;
        session.bind::<T2>()?;
        session.bind::<T3>()?;
        Ok(())
    }

    fn materialize(row: &RowData) -> OrmResult<Self::Row> {
        Ok((
            materialize_entity::<T0>(row)?,
            materialize_entity::<T1>(row)?,
            materialize_entity::<T2>(row)?,
            materialize_entity::<T3>(row)?,
        ))
    }
}

macro_rules! stage {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name<'a, E: EntitySet> {
            db: &'a Database,
            session: Session,
            _marker: PhantomData<E>,
        }

        impl<'a, E: EntitySet> $name<'a, E> {
            fn from_session(db: &'a Database, session: Session) -> Self {
                Self {
                    db,
                    session,
                    _marker: PhantomData,
                }
            }

            /// The full statement this stage would execute.
            pub fn to_sql(&self) -> String {
                format!("SELECT *{}", self.session.sql())
            }

            /// Execute and materialize every row.
            pub fn query(self) -> OrmResult<Vec<E::Row>> {
                self.query_map(|row| row)
            }

            /// Execute and project every materialized row through `f`.
            pub fn query_map<R, F>(self, mut f: F) -> OrmResult<Vec<R>>
            where
                F: FnMut(E::Row) -> R,
            {
                let sql = self.to_sql();
                let rows = self.db.run_rows(self.database()?, &sql)?;
                let mut out = Vec::with_capacity(rows.len());
                for row in &rows {
                    out.push(f(E::materialize(row)?));
                }
                Ok(out)
            }

            /// Execute the accumulated statement as a scalar read: the first
            /// column of the first row, `0` when the result set is empty.
            pub fn count(self) -> OrmResult<i64> {
                let sql = self.to_sql();
                match self.db.run_scalar(self.database()?, &sql)? {
                    Value::Null => Ok(0),
                    value => value.to_i64("count"),
                }
            }

            fn database(&self) -> OrmResult<&str> {
                // set by the first bind, which precedes stage construction
                self.session
                    .database()
                    .ok_or_else(|| OrmError::execution("query session has no database"))
            }
        }
    };
}

stage! {
    /// `FROM` emitted; accepts a filter or, for single-type queries, a join.
    SourceStage
}
stage! {
    /// One or more `INNER JOIN`s emitted.
    JoinStage
}
stage! {
    /// `WHERE` emitted.
    FilterStage
}
stage! {
    /// At least one `ORDER BY` emitted.
    OrderStage
}

pub(crate) fn source<'a, E: EntitySet>(db: &'a Database) -> OrmResult<SourceStage<'a, E>> {
    let mut session = Session::new();
    E::bind(&mut session)?;
    let tables = session
        .scope()
        .iter()
        .map(|m| m.table.as_str())
        .collect::<Vec<_>>()
        .join(",");
    session.push(format!(" FROM {tables}"));
    Ok(SourceStage::from_session(db, session))
}

fn join_into<J: Entity>(mut session: Session, on: &Expr) -> OrmResult<Session> {
    let joined = session.bind_join::<J>()?;
    // join predicates always qualify, two or more types are now in play
    let on_sql = compile(on, session.scope(), true)?;
    session.push(format!(" INNER JOIN {} ON {on_sql}", joined.table));
    Ok(session)
}

fn filter_into<'a, E: EntitySet>(
    db: &'a Database,
    mut session: Session,
    predicate: &Expr,
) -> OrmResult<FilterStage<'a, E>> {
    let qualify = session.qualify();
    let sql = compile(predicate, session.scope(), qualify)?;
    session.push(format!(" WHERE {sql}"));
    Ok(FilterStage::from_session(db, session))
}

impl<'a, E: EntitySet> SourceStage<'a, E> {
    pub fn filter(self, predicate: &Expr) -> OrmResult<FilterStage<'a, E>> {
        filter_into(self.db, self.session, predicate)
    }
}

impl<'a, T0: Entity> SourceStage<'a, (T0,)> {
    /// Join a second entity type. The ON predicate sees parameters
    /// positionally: `col(0, …)` is `T0`, `col(1, …)` is `T1`.
    pub fn inner_join<T1: Entity>(self, on: &Expr) -> OrmResult<JoinStage<'a, (T0, T1)>> {
        let session = join_into::<T1>(self.session, on)?;
        Ok(JoinStage::from_session(self.db, session))
    }
}

impl<'a, E: EntitySet> JoinStage<'a, E> {
    pub fn filter(self, predicate: &Expr) -> OrmResult<FilterStage<'a, E>> {
        filter_into(self.db, self.session, predicate)
    }
}

impl<'a, T0: Entity, T1: Entity> JoinStage<'a, (T0, T1)> {
    pub fn inner_join<T2: Entity>(self, on: &Expr) -> OrmResult<JoinStage<'a, (T0, T1, T2)>> {
        let session = join_into::<T2>(self.session, on)?;
        Ok(JoinStage::from_session(self.db, session))
    }
}

impl<'a, T0: Entity, T1: Entity, T2: Entity> JoinStage<'a, (T0, T1, T2)> {
    pub fn inner_join<T3: Entity>(self, on: &Expr) -> OrmResult<JoinStage<'a, (T0, T1, T2, T3)>> {
        let session = join_into::<T3>(self.session, on)?;
        Ok(JoinStage::from_session(self.db, session))
    }
}

impl<'a, E: EntitySet> FilterStage<'a, E> {
    pub fn order_by_asc(self, selector: &Expr) -> OrmResult<OrderStage<'a, E>> {
        order_into(self, selector, "ASC")
    }

    pub fn order_by_desc(self, selector: &Expr) -> OrmResult<OrderStage<'a, E>> {
        order_into(self, selector, "DESC")
    }
}

impl<'a, E: EntitySet> OrderStage<'a, E> {
    /// Appends another full `ORDER BY` clause; nothing merges sort keys.
    pub fn order_by_asc(mut self, selector: &Expr) -> OrmResult<Self> {
        push_order(&mut self.session, selector, "ASC")?;
        Ok(self)
    }

    pub fn order_by_desc(mut self, selector: &Expr) -> OrmResult<Self> {
        push_order(&mut self.session, selector, "DESC")?;
        Ok(self)
    }
}

fn order_into<'a, E: EntitySet>(
    stage: FilterStage<'a, E>,
    selector: &Expr,
    direction: &str,
) -> OrmResult<OrderStage<'a, E>> {
    let mut stage = stage;
    push_order(&mut stage.session, selector, direction)?;
    Ok(OrderStage::from_session(stage.db, stage.session))
}

fn push_order(session: &mut Session, selector: &Expr, direction: &str) -> OrmResult<()> {
    let qualify = session.qualify();
    let sql = compile(selector, session.scope(), qualify)?;
    session.push(format!(" ORDER BY {sql} {direction}"));
    Ok(())
}

//! Predicate and selector expressions.
//!
//! `Expr` is a value-carrying expression tree: constants hold their runtime
//! [`Value`] directly, and [`compile`] renders a tree into a SQL fragment
//! against the entity mappings bound in the current query session. Column
//! references name the entity by positional parameter index (`col(0, "Name")`
//! is the first bound entity's `Name` property).
//!
//! Rendering is deterministic: the same tree always produces the same text.

use crate::error::{OrmError, OrmResult};
use crate::schema::TableMapping;
use crate::value::Value;
use std::sync::Arc;

/// Binary operators, rendered with surrounding spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    And,
    Or,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    fn sql(self) -> &'static str {
        match self {
            BinOp::And => " AND ",
            BinOp::Or => " OR ",
            BinOp::Eq => " = ",
            BinOp::Ne => " != ",
            BinOp::Gt => " > ",
            BinOp::Ge => " >= ",
            BinOp::Lt => " < ",
            BinOp::Le => " <= ",
            BinOp::Add => " + ",
            BinOp::Sub => " - ",
            BinOp::Mul => " * ",
            BinOp::Div => " / ",
        }
    }
}

/// Unary operators. Both render transparently; `Not` is consumed contextually
/// by the `Contains` rule (`NOT LIKE` / `NOT IN`), never as a SQL operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Convert,
}

/// Expression node for predicates, join conditions and sort selectors.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `(left op right)`
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Property access on a bound entity, by parameter position.
    Member { param: usize, name: String },

    /// Method-style call; `Contains` and `ToString` have dedicated
    /// translations, everything else falls back to constant evaluation.
    MethodCall {
        target: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },

    /// A captured runtime value.
    Constant(Value),

    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Comma-joined element list (multi-key sort selectors).
    Array(Vec<Expr>),

    /// Comma-joined constructor arguments, same rendering as `Array`.
    Tuple(Vec<Expr>),

    /// A bare entity parameter reference.
    Param(usize),
}

/// Reference a property of the `param`-th bound entity.
pub fn col(param: usize, name: impl Into<String>) -> Expr {
    Expr::Member {
        param,
        name: name.into(),
    }
}

/// Lift a runtime value into a constant node.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Constant(value.into())
}

impl Expr {
    fn binary(self, op: BinOp, other: impl Into<Expr>) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    pub fn eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinOp::Eq, other)
    }

    pub fn ne(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinOp::Ne, other)
    }

    pub fn gt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinOp::Gt, other)
    }

    pub fn ge(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinOp::Ge, other)
    }

    pub fn lt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinOp::Lt, other)
    }

    pub fn le(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinOp::Le, other)
    }

    pub fn and(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinOp::And, other)
    }

    pub fn or(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinOp::Or, other)
    }

    pub fn add(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinOp::Add, other)
    }

    pub fn sub(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinOp::Sub, other)
    }

    pub fn mul(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinOp::Mul, other)
    }

    pub fn div(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinOp::Div, other)
    }

    /// `Contains` call: substring match on a column receiver, membership test
    /// on a collection receiver.
    pub fn contains(self, arg: impl Into<Expr>) -> Expr {
        self.method("Contains", vec![arg.into()])
    }

    /// Logical negation, consumed by the `Contains` translation.
    pub fn not(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }

    pub fn method(self, name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::MethodCall {
            target: Box::new(self),
            method: name.into(),
            args,
        }
    }

    /// Multi-key selector, e.g. `ORDER BY a,b`.
    pub fn keys(items: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Tuple(items.into_iter().collect())
    }

    pub fn array(items: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Array(items.into_iter().collect())
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Constant(v)
    }
}

macro_rules! constant_from {
    ($($ty:ty),+) => {
        $(impl From<$ty> for Expr {
            fn from(v: $ty) -> Self {
                Expr::Constant(v.into())
            }
        })+
    };
}

constant_from!(
    bool,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    &str,
    String,
    char,
    chrono::NaiveDateTime,
    uuid::Uuid
);

impl<T> From<Vec<T>> for Expr
where
    Value: From<Vec<T>>,
{
    fn from(v: Vec<T>) -> Self {
        Expr::Constant(v.into())
    }
}

/// Render `expr` into a SQL fragment over the session's bound mappings.
///
/// `scope` holds the mappings in registration order; `Member { param, .. }`
/// resolves against `scope[param]`. With `qualify` set, column references are
/// emitted as `table.column` (required whenever more than one entity
/// participates).
pub fn compile(expr: &Expr, scope: &[Arc<TableMapping>], qualify: bool) -> OrmResult<String> {
    translate(expr, None, scope, qualify)
}

fn translate(
    expr: &Expr,
    parent: Option<&Expr>,
    scope: &[Arc<TableMapping>],
    qualify: bool,
) -> OrmResult<String> {
    match expr {
        Expr::Binary { op, left, right } => {
            let left = translate(left, Some(expr), scope, qualify)?;
            let right = translate(right, Some(expr), scope, qualify)?;
            if right.is_empty() {
                // captured null on the right-hand side
                match op {
                    BinOp::Eq => Ok(format!("({left} IS NULL)")),
                    BinOp::Ne => Ok(format!("({left} IS NOT NULL)")),
                    _ => Ok(format!("({left})")),
                }
            } else {
                Ok(format!("({left}{}{right})", op.sql()))
            }
        }

        Expr::Member { param, name } => {
            let Some(mapping) = scope.get(*param) else {
                // not a bound entity: treat as a captured value
                return Ok(render_value(&eval(expr)?));
            };
            let column = mapping
                .column_for(name)
                .map(|c| c.column.as_str())
                // permissive: unmapped members pass through by name
                .unwrap_or(name.as_str());
            if qualify {
                Ok(format!("{}.{column}", mapping.table))
            } else {
                Ok(column.to_string())
            }
        }

        Expr::MethodCall {
            target,
            method,
            args,
        } => match method.as_str() {
            "Contains" => {
                let arg = args.first().ok_or_else(|| {
                    OrmError::compilation("Contains requires exactly one argument")
                })?;
                let negated = matches!(
                    parent,
                    Some(Expr::Unary {
                        op: UnaryOp::Not,
                        ..
                    })
                );
                if is_bound_member(target, scope) {
                    let column = translate(target, Some(expr), scope, qualify)?;
                    let needle = eval(arg)?.raw_text();
                    if negated {
                        Ok(format!("({column} NOT LIKE '%{needle}%')"))
                    } else {
                        Ok(format!("({column} LIKE '%{needle}%')"))
                    }
                } else {
                    let column = translate(arg, Some(expr), scope, qualify)?;
                    let list = eval(target)?.in_list_text();
                    if negated {
                        Ok(format!("({column} NOT IN ({list}))"))
                    } else {
                        Ok(format!("({column} IN ({list}))"))
                    }
                }
            }
            "ToString" => translate(target, Some(expr), scope, qualify),
            _ => Ok(render_value(&eval(expr)?)),
        },

        Expr::Constant(value) => Ok(value.literal().unwrap_or_default()),

        Expr::Unary { operand, .. } => translate(operand, Some(expr), scope, qualify),

        Expr::Array(items) | Expr::Tuple(items) => {
            let parts = items
                .iter()
                .map(|item| translate(item, Some(expr), scope, qualify))
                .collect::<OrmResult<Vec<_>>>()?;
            Ok(parts.join(","))
        }

        Expr::Param(_) => Ok(render_value(&eval(expr)?)),
    }
}

fn is_bound_member(expr: &Expr, scope: &[Arc<TableMapping>]) -> bool {
    matches!(expr, Expr::Member { param, .. } if *param < scope.len())
}

fn render_value(value: &Value) -> String {
    value.literal().unwrap_or_default()
}

/// Evaluate a parameter-free sub-tree to its runtime value.
///
/// This is the fallback path for captured scalars; anything still referencing
/// a bound entity parameter fails with a `Compilation` error.
pub(crate) fn eval(expr: &Expr) -> OrmResult<Value> {
    match expr {
        Expr::Constant(value) => Ok(value.clone()),

        Expr::Unary { op, operand } => {
            let value = eval(operand)?;
            match (op, &value) {
                (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                _ => Ok(value),
            }
        }

        Expr::Array(items) | Expr::Tuple(items) => Ok(Value::List(
            items.iter().map(eval).collect::<OrmResult<Vec<_>>>()?,
        )),

        Expr::Binary { op, left, right } => {
            let left = eval(left)?;
            let right = eval(right)?;
            fold_arithmetic(*op, &left, &right).ok_or_else(|| {
                OrmError::compilation(format!("cannot evaluate ({left:?}{}{right:?})", op.sql()))
            })
        }

        Expr::Member { param, name } => Err(OrmError::compilation(format!(
            "member '{name}' references unbound parameter {param}"
        ))),

        Expr::Param(param) => Err(OrmError::compilation(format!(
            "expression references unbound parameter {param}"
        ))),

        Expr::MethodCall { method, .. } => Err(OrmError::compilation(format!(
            "cannot evaluate method call '{method}'"
        ))),
    }
}

fn fold_arithmetic(op: BinOp, left: &Value, right: &Value) -> Option<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => match op {
            BinOp::Add => Some(Value::Int(a + b)),
            BinOp::Sub => Some(Value::Int(a - b)),
            BinOp::Mul => Some(Value::Int(a * b)),
            BinOp::Div if *b != 0 => Some(Value::Int(a / b)),
            _ => None,
        },
        (Value::Float(_) | Value::Int(_), Value::Float(_) | Value::Int(_)) => {
            let a = match left {
                Value::Float(v) => *v,
                Value::Int(v) => *v as f64,
                _ => return None,
            };
            let b = match right {
                Value::Float(v) => *v,
                Value::Int(v) => *v as f64,
                _ => return None,
            };
            match op {
                BinOp::Add => Some(Value::Float(a + b)),
                BinOp::Sub => Some(Value::Float(a - b)),
                BinOp::Mul => Some(Value::Float(a * b)),
                BinOp::Div => Some(Value::Float(a / b)),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{mapping, Entity, TableDef};

    #[derive(Default)]
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
                .column("Age")
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
    struct Order {
        id: i64,
    }

    impl Entity for Order {
        fn table() -> TableDef {
            TableDef::new("app", "orders")
                .column("Id")
                .primary_key()
                .column("PersonId")
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

    fn people_scope() -> Vec<Arc<TableMapping>> {
        vec![mapping::<Person>().unwrap()]
    }

    fn join_scope() -> Vec<Arc<TableMapping>> {
        vec![mapping::<Person>().unwrap(), mapping::<Order>().unwrap()]
    }

    #[test]
    fn equality_with_string_constant() {
        let expr = col(0, "Name").eq("Ann");
        let sql = compile(&expr, &people_scope(), false).unwrap();
        assert_eq!(sql, "(Name = 'Ann')");
    }

    #[test]
    fn null_equality_renders_is_null() {
        let expr = col(0, "Name").eq(Value::Null);
        let sql = compile(&expr, &people_scope(), false).unwrap();
        assert_eq!(sql, "(Name IS NULL)");
    }

    #[test]
    fn null_inequality_renders_is_not_null() {
        let expr = col(0, "Name").ne(Value::Null);
        let sql = compile(&expr, &people_scope(), false).unwrap();
        assert_eq!(sql, "(Name IS NOT NULL)");
    }

    #[test]
    fn null_with_other_operator_degenerates() {
        let expr = col(0, "Age").gt(Value::Null);
        let sql = compile(&expr, &people_scope(), false).unwrap();
        assert_eq!(sql, "(Age)");
    }

    #[test]
    fn conjunction_nests_parentheses() {
        let expr = col(0, "Name").eq("Ann").and(col(0, "Age").ge(18));
        let sql = compile(&expr, &people_scope(), false).unwrap();
        assert_eq!(sql, "((Name = 'Ann') AND (Age >= 18))");
    }

    #[test]
    fn qualified_mode_prefixes_table() {
        let expr = col(0, "Id").eq(col(1, "PersonId"));
        let sql = compile(&expr, &join_scope(), true).unwrap();
        assert_eq!(sql, "(people.Id = orders.PersonId)");
    }

    #[test]
    fn unmapped_member_passes_through() {
        let expr = col(0, "Nickname").eq("x");
        let sql = compile(&expr, &people_scope(), false).unwrap();
        assert_eq!(sql, "(Nickname = 'x')");
    }

    #[test]
    fn contains_on_column_renders_like() {
        let expr = col(0, "Name").contains("nn");
        let sql = compile(&expr, &people_scope(), false).unwrap();
        assert_eq!(sql, "(Name LIKE '%nn%')");
    }

    #[test]
    fn negated_contains_renders_not_like() {
        let expr = col(0, "Name").contains("nn").not();
        let sql = compile(&expr, &people_scope(), false).unwrap();
        assert_eq!(sql, "(Name NOT LIKE '%nn%')");
    }

    #[test]
    fn collection_contains_renders_in() {
        let expr = lit(vec![1i32, 2, 3]).contains(col(0, "Age"));
        let sql = compile(&expr, &people_scope(), false).unwrap();
        assert_eq!(sql, "(Age IN (1,2,3))");
    }

    #[test]
    fn negated_collection_contains_renders_not_in() {
        let expr = lit(vec![1i32, 2]).contains(col(0, "Age")).not();
        let sql = compile(&expr, &people_scope(), false).unwrap();
        assert_eq!(sql, "(Age NOT IN (1,2))");
    }

    #[test]
    fn empty_collection_renders_quoted_empty() {
        let empty: Vec<i32> = Vec::new();
        let expr = lit(empty).contains(col(0, "Age"));
        let sql = compile(&expr, &people_scope(), false).unwrap();
        assert_eq!(sql, "(Age IN (''))");
    }

    #[test]
    fn to_string_is_transparent() {
        let expr = col(0, "Age").method("ToString", Vec::new()).eq("18");
        let sql = compile(&expr, &people_scope(), false).unwrap();
        assert_eq!(sql, "(Age = '18')");
    }

    #[test]
    fn tuple_joins_with_commas() {
        let expr = Expr::keys([col(0, "Name"), col(0, "Age")]);
        let sql = compile(&expr, &people_scope(), false).unwrap();
        assert_eq!(sql, "Name,Age");
    }

    #[test]
    fn arithmetic_renders_structurally() {
        let expr = col(0, "Age").ge(lit(10).add(lit(8)));
        let sql = compile(&expr, &people_scope(), false).unwrap();
        assert_eq!(sql, "(Age >= (10 + 8))");
    }

    #[test]
    fn eval_folds_constant_arithmetic() {
        let expr = lit(10).add(lit(8));
        assert_eq!(eval(&expr).unwrap(), Value::Int(18));
    }

    #[test]
    fn out_of_scope_parameter_is_a_compilation_error() {
        let expr = col(3, "Name").eq("Ann");
        let err = compile(&expr, &people_scope(), false).unwrap_err();
        assert!(matches!(err, OrmError::Compilation(_)));
    }

    #[test]
    fn unknown_method_is_a_compilation_error() {
        let expr = col(0, "Name").method("Trim", Vec::new()).eq("x");
        let err = compile(&expr, &people_scope(), false).unwrap_err();
        assert!(matches!(err, OrmError::Compilation(_)));
    }

    #[test]
    fn compilation_is_deterministic() {
        let expr = col(0, "Name").eq("Ann").and(col(0, "Age").lt(65));
        let first = compile(&expr, &people_scope(), false).unwrap();
        let second = compile(&expr, &people_scope(), false).unwrap();
        assert_eq!(first, second);
    }
}

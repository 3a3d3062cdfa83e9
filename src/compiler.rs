//! `compiler` converts expression trees into PostgreSQL.
//!
//! Built-in node kinds (constants, columns, operators, aliases) are translated directly.
//! Calls to user-defined functions are looked up in a translation table keyed by node kind,
//! which `node::register_renderer` fills in as functions are registered.

use crate::datatype::DataType;
use crate::expr::{Constant, Expr, Op, ResultDescriptor, Shape, UdfCall};
use crate::node::NodeKindId;
use crate::sql::{Select, SqlExpr, TableRef};
use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Renders one call of a registered function into SQL.
pub type Renderer = Arc<dyn Fn(&Translator, &UdfCall) -> Result<SqlExpr> + Send + Sync>;

lazy_static::lazy_static! {
    static ref OPERATIONS: Mutex<HashMap<NodeKindId, Renderer>> = Mutex::new(HashMap::new());
}

/// Adds `renderer` to the translation table for `kind`.
pub fn add_operation(kind: &NodeKindId, renderer: Renderer) {
    OPERATIONS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(kind.clone(), renderer);
}

// The renderer is cloned out so the table is not locked while it runs;
// renderers translate their arguments, which may be calls themselves.
fn operation(kind: &NodeKindId) -> Option<Renderer> {
    OPERATIONS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(kind)
        .cloned()
}

/// The result of applying an operation to `args`: values of `dtype`, one per row if any
/// argument has one per row.
pub fn shape_like<'a>(args: impl IntoIterator<Item = &'a Expr>, dtype: DataType) -> ResultDescriptor {
    let columnar = args
        .into_iter()
        .any(|a| a.output().shape == Shape::Columnar);
    ResultDescriptor {
        dtype,
        shape: if columnar {
            Shape::Columnar
        } else {
            Shape::Scalar
        },
    }
}

#[derive(Debug, Default)]
pub struct Translator {}

impl Translator {
    pub fn new() -> Self {
        Translator {}
    }

    pub fn translate(&self, expr: &Expr) -> Result<SqlExpr> {
        match expr {
            Expr::Constant(c) => Ok(translate_constant(c)),
            Expr::Column(c) => Ok(SqlExpr::Column(c.name.clone())),
            Expr::BinOp { lhs, op, rhs } => Ok(SqlExpr::BinaryOp {
                lhs: Box::new(self.translate_operand(lhs)?),
                op: sql_operator(op),
                rhs: Box::new(self.translate_operand(rhs)?),
            }),
            Expr::Call(call) => {
                let renderer = operation(call.kind.id()).ok_or_else(|| {
                    anyhow!("No translation rule registered for {}", call.kind.id())
                })?;
                renderer(self, call)
            }
            Expr::Alias { expr, name } => Ok(SqlExpr::Label {
                expr: Box::new(self.translate_operand(expr)?),
                label: name.clone(),
            }),
        }
    }

    /// Translates an expression nested inside another one. Output names only apply at
    /// the top of a select item, so any alias here is dropped.
    pub fn translate_operand(&self, expr: &Expr) -> Result<SqlExpr> {
        match expr {
            Expr::Alias { expr, .. } => self.translate_operand(expr),
            _ => self.translate(expr),
        }
    }
}

fn translate_constant(c: &Constant) -> SqlExpr {
    match c {
        Constant::Int(i) => SqlExpr::Literal(i.to_string()),
        Constant::String(s) => SqlExpr::text(s),
        Constant::Real(f) if f.is_nan() => SqlExpr::Literal(String::from("'NaN'::float8")),
        Constant::Real(f) if f.is_infinite() => SqlExpr::Literal(format!(
            "'{}Infinity'::float8",
            if f.is_sign_negative() { "-" } else { "" }
        )),
        // Debug formatting keeps a decimal point, so the literal stays a float.
        Constant::Real(f) => SqlExpr::Literal(format!("{:?}", f)),
        Constant::Bool(b) => SqlExpr::Literal(String::from(if *b { "TRUE" } else { "FALSE" })),
        Constant::Bytes(b) => SqlExpr::bytes(b),
    }
}

fn sql_operator(op: &Op) -> &'static str {
    match op {
        Op::Add => "+",
        Op::Subtract => "-",
        Op::Multiply => "*",
        Op::Divide => "/",
        Op::Equal => "=",
        Op::And => "AND",
    }
}

/// A table with known column types, enough to build typed column expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub schema: Option<String>,
    pub name: String,
    pub columns: Vec<(String, DataType)>,
}

impl Table {
    pub fn new(schema: Option<&str>, name: &str, columns: &[(&str, DataType)]) -> Self {
        Table {
            schema: schema.map(String::from),
            name: String::from(name),
            columns: columns
                .iter()
                .map(|(n, t)| (String::from(*n), *t))
                .collect(),
        }
    }

    pub fn col(&self, name: &str) -> Result<Expr> {
        match self.columns.iter().find(|(n, _)| n == name) {
            Some((n, t)) => Ok(Expr::column(n, *t)),
            None => bail!("Table {} has no column {}", self.name, name),
        }
    }

    pub fn all_columns(&self) -> Vec<Expr> {
        self.columns
            .iter()
            .map(|(n, t)| Expr::column(n, *t))
            .collect()
    }

    pub fn select(&self, items: Vec<Expr>) -> Query {
        Query {
            table: self.clone(),
            items,
            filter: None,
        }
    }
}

/// A projection of one table, optionally filtered.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub items: Vec<Expr>,
    pub filter: Option<Expr>,
}

impl Query {
    /// Adds a predicate; successive filters are combined with `AND`.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.binop(Op::And, predicate),
            None => predicate,
        });
        self
    }
}

/// Compiles `query` into a PostgreSQL `SELECT` statement.
pub fn compile(query: &Query) -> Result<String> {
    if query.items.is_empty() {
        bail!("Cannot select no columns from {}", query.table.name);
    }
    if let Some(filter) = &query.filter {
        if filter.dtype() != DataType::Boolean {
            bail!("Filter must be boolean, found {}", filter.dtype());
        }
    }
    let t = Translator::new();
    let select = Select {
        items: query
            .items
            .iter()
            .map(|e| t.translate(e))
            .collect::<Result<Vec<_>>>()?,
        from: TableRef {
            schema: query.table.schema.clone(),
            name: query.table.name.clone(),
        },
        filter: query.filter.as_ref().map(|f| t.translate(f)).transpose()?,
    };
    Ok(select.to_string())
}

#[cfg(test)]
fn users_table() -> Table {
    Table::new(
        Some("udf_test"),
        "udf_test_users",
        &[
            ("user_id", DataType::Int32),
            ("user_name", DataType::String),
            ("name_length", DataType::Int32),
        ],
    )
}

#[test]
fn test_compile_query() {
    let t = users_table();
    struct Case {
        desc: &'static str,
        query: Query,
        expected: Result<&'static str, ()>,
    }
    let cases = vec![
        Case {
            desc: "all columns",
            query: t.select(t.all_columns()),
            expected: Ok("SELECT user_id, user_name, name_length FROM udf_test.udf_test_users"),
        },
        Case {
            desc: "filtered expression",
            query: t
                .select(vec![t
                    .col("user_id")
                    .unwrap()
                    .binop(Op::Multiply, t.col("name_length").unwrap())
                    .name("product")])
                .filter(t.col("user_id").unwrap().equals(Expr::from(Constant::Int(2)))),
            expected: Ok("SELECT (user_id * name_length) AS product FROM udf_test.udf_test_users WHERE (user_id = 2)"),
        },
        Case {
            desc: "two filters",
            query: t
                .select(vec![t.col("user_name").unwrap()])
                .filter(t.col("user_id").unwrap().equals(Expr::from(Constant::Int(2))))
                .filter(
                    t.col("user_name")
                        .unwrap()
                        .equals(Expr::from(Constant::String(String::from("Judy")))),
                ),
            expected: Ok("SELECT user_name FROM udf_test.udf_test_users WHERE ((user_id = 2) AND (user_name = 'Judy'))"),
        },
        Case {
            desc: "non-boolean filter",
            query: t
                .select(vec![t.col("user_name").unwrap()])
                .filter(t.col("user_id").unwrap()),
            expected: Err(()),
        },
        Case {
            desc: "empty projection",
            query: t.select(vec![]),
            expected: Err(()),
        },
    ];
    for case in cases {
        println!("Running case: {}", case.desc);
        let actual = compile(&case.query);
        match case.expected {
            Ok(sql) => assert_eq!(actual.unwrap(), sql),
            Err(()) => assert!(actual.is_err()),
        }
    }
}

#[test]
fn test_nested_aliases_are_dropped() {
    let t = users_table();
    let query = t.select(vec![t
        .col("user_id")
        .unwrap()
        .name("a")
        .binop(Op::Add, Expr::from(Constant::Int(1)).name("one"))
        .name("b")
        .name("c")]);
    assert_eq!(
        compile(&query).unwrap(),
        "SELECT (user_id + 1) AS c FROM udf_test.udf_test_users"
    );
}

#[test]
fn test_unknown_column() {
    assert!(users_table().col("nope").is_err());
}

#[test]
fn test_translate_constants() {
    let t = Translator::new();
    let cases = vec![
        (Constant::Int(-3), "-3"),
        (Constant::Real(2.0), "2.0"),
        (Constant::Real(f64::NAN), "'NaN'::float8"),
        (Constant::Real(f64::INFINITY), "'Infinity'::float8"),
        (Constant::Real(f64::NEG_INFINITY), "'-Infinity'::float8"),
        (Constant::Bool(true), "TRUE"),
        (Constant::String(String::from("O'Hara")), "'O''Hara'"),
        (Constant::Bytes(vec![1, 255]), "'\\x01ff'::bytea"),
    ];
    for case in cases {
        println!("Case: {}", case.0);
        let actual = t.translate(&Expr::from(case.0)).unwrap();
        assert_eq!(actual.to_string(), case.1);
    }
}

#[test]
fn test_shape_like() {
    let scalar = Expr::from(Constant::Int(1));
    let column = Expr::column("a", DataType::Int32);
    assert_eq!(
        shape_like([&scalar], DataType::String),
        ResultDescriptor {
            dtype: DataType::String,
            shape: Shape::Scalar
        }
    );
    assert_eq!(
        shape_like([&scalar, &column], DataType::Boolean).shape,
        Shape::Columnar
    );
    assert_eq!(
        shape_like(Vec::<Expr>::new().iter(), DataType::Int64).shape,
        Shape::Scalar
    );
}

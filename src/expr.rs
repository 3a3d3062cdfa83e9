//! This module defines the expression tree that queries are built from.
//! User-defined functions appear in it as `Expr::Call` nodes whose kind was minted by `node`.

use crate::compiler::shape_like;
use crate::datatype::DataType;
use crate::node::NodeKind;
use enum_as_inner::EnumAsInner;
use itertools::Itertools;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    String(String),
    Real(f64),
    Bool(bool),
    Bytes(Vec<u8>),
}

impl std::fmt::Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::Int(x) => x.fmt(f),
            Constant::String(x) => write!(f, "'{}'", x),
            Constant::Real(x) => x.fmt(f),
            Constant::Bool(x) => match x {
                true => "TRUE".fmt(f),
                false => "FALSE".fmt(f),
            },
            Constant::Bytes(x) => write!(f, "<{} bytes>", x.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub dtype: DataType,
}

/// Whether an expression yields one value or one value per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Columnar,
}

/// The type and shape of the values an expression produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultDescriptor {
    pub dtype: DataType,
    pub shape: Shape,
}

/// One application of a registered function to arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct UdfCall {
    pub kind: Arc<NodeKind>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Expr {
    Constant(Constant),
    Column(Column),
    BinOp {
        lhs: Box<Expr>,
        op: Op,
        rhs: Box<Expr>,
    },
    Call(UdfCall),
    Alias {
        expr: Box<Expr>,
        name: String,
    },
}

impl Expr {
    pub fn column(name: &str, dtype: DataType) -> Expr {
        Expr::Column(Column {
            name: String::from(name),
            dtype,
        })
    }

    pub fn binop(self, op: Op, rhs: Expr) -> Expr {
        Expr::BinOp {
            lhs: Box::new(self),
            op,
            rhs: Box::new(rhs),
        }
    }

    pub fn equals(self, rhs: Expr) -> Expr {
        self.binop(Op::Equal, rhs)
    }

    /// Gives the expression an output name.
    pub fn name(self, name: &str) -> Expr {
        Expr::Alias {
            expr: Box::new(self),
            name: String::from(name),
        }
    }

    pub fn output(&self) -> ResultDescriptor {
        match self {
            Expr::Constant(c) => ResultDescriptor {
                dtype: constant_dtype(c),
                shape: Shape::Scalar,
            },
            Expr::Column(c) => ResultDescriptor {
                dtype: c.dtype,
                shape: Shape::Columnar,
            },
            Expr::BinOp { lhs, op, rhs } => {
                let (l, r) = (lhs.dtype(), rhs.dtype());
                let dtype = match op {
                    Op::Equal | Op::And => DataType::Boolean,
                    _ => l.promote(&r).unwrap_or(l),
                };
                shape_like([lhs.as_ref(), rhs.as_ref()], dtype)
            }
            Expr::Call(call) => call.kind.output_type(&call.args),
            Expr::Alias { expr, .. } => expr.output(),
        }
    }

    pub fn dtype(&self) -> DataType {
        self.output().dtype
    }
}

fn constant_dtype(c: &Constant) -> DataType {
    match c {
        Constant::Int(i) => DataType::for_int_literal(*i),
        Constant::String(_) => DataType::String,
        Constant::Real(_) => DataType::Float64,
        Constant::Bool(_) => DataType::Boolean,
        Constant::Bytes(_) => DataType::Binary,
    }
}

impl From<Constant> for Expr {
    fn from(c: Constant) -> Self {
        Expr::Constant(c)
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Constant(x) => x.fmt(f),
            Expr::Column(x) => x.name.fmt(f),
            Expr::BinOp { lhs, op, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            Expr::Call(call) => write!(f, "{}({})", call.kind.id(), call.args.iter().join(", ")),
            Expr::Alias { expr, name } => write!(f, "{} AS {}", expr, name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    And,
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Op::*;
        match self {
            Add => "+".fmt(f),
            Subtract => "-".fmt(f),
            Multiply => "*".fmt(f),
            Divide => "/".fmt(f),
            Equal => "=".fmt(f),
            And => "AND".fmt(f),
        }
    }
}

#[test]
fn test_expr_output() {
    let user_id = Expr::column("user_id", DataType::Int32);
    let cases = vec![
        (
            Expr::from(Constant::Int(2)),
            DataType::Int8,
            Shape::Scalar,
        ),
        (user_id.clone(), DataType::Int32, Shape::Columnar),
        (
            user_id.clone().binop(Op::Multiply, Expr::from(Constant::Real(1.5))),
            DataType::Float64,
            Shape::Columnar,
        ),
        (
            user_id.clone().equals(Expr::from(Constant::Int(2))),
            DataType::Boolean,
            Shape::Columnar,
        ),
        (
            Expr::from(Constant::Int(1)).binop(Op::Add, Expr::from(Constant::Int(1000))),
            DataType::Int16,
            Shape::Scalar,
        ),
        (
            Expr::from(Constant::String(String::from("x"))).name("label"),
            DataType::String,
            Shape::Scalar,
        ),
    ];
    for case in cases {
        println!("Case: {}", case.0);
        let out = case.0.output();
        assert_eq!(out.dtype, case.1);
        assert_eq!(out.shape, case.2);
    }
}

#[test]
fn test_expr_display() {
    let e = Expr::column("a", DataType::Int32)
        .binop(Op::Add, Expr::from(Constant::Int(1)))
        .name("b");
    assert_eq!(e.to_string(), "(a + 1) AS b");
    assert!(e.as_alias().is_some());
}

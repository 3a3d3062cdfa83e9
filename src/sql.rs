//! `sql` defines the target-side expression tree that the compiler renders to PostgreSQL text.
//!
//! Expressions are built by `compiler::Translator` from `expr::Expr` trees. Rendering is
//! done through `Display`, so `format!("{}", select)` yields a runnable statement.

use itertools::Itertools;
use std::borrow::Cow;

/// A reference to a callable function, optionally qualified by its schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionRef {
    pub schema: Option<String>,
    pub name: String,
}

impl std::fmt::Display for FunctionRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.", quote_identifier(schema))?;
        }
        quote_identifier(&self.name).fmt(f)
    }
}

/// A table reference, optionally qualified by its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{}.", quote_identifier(schema))?;
        }
        quote_identifier(&self.name).fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    /// Literal text, already escaped.
    Literal(String),
    Column(String),
    BinaryOp {
        lhs: Box<SqlExpr>,
        op: &'static str,
        rhs: Box<SqlExpr>,
    },
    Call {
        func: FunctionRef,
        args: Vec<SqlExpr>,
    },
    Label {
        expr: Box<SqlExpr>,
        label: String,
    },
}

impl SqlExpr {
    pub fn text(s: &str) -> SqlExpr {
        SqlExpr::Literal(format!("'{}'", s.replace('\'', "''")))
    }

    pub fn bytes(b: &[u8]) -> SqlExpr {
        SqlExpr::Literal(format!("'\\x{}'::bytea", hex::encode(b)))
    }
}

impl std::fmt::Display for SqlExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlExpr::Literal(x) => x.fmt(f),
            SqlExpr::Column(x) => quote_identifier(x).fmt(f),
            SqlExpr::BinaryOp { lhs, op, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            SqlExpr::Call { func, args } => write!(f, "{}({})", func, args.iter().join(", ")),
            SqlExpr::Label { expr, label } => write!(f, "{} AS {}", expr, quote_identifier(label)),
        }
    }
}

/// A single-table `SELECT`.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub items: Vec<SqlExpr>,
    pub from: TableRef,
    pub filter: Option<SqlExpr>,
}

impl std::fmt::Display for Select {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SELECT {} FROM {}", self.items.iter().join(", "), self.from)?;
        if let Some(filter) = &self.filter {
            write!(f, " WHERE {}", filter)?;
        }
        Ok(())
    }
}

// Not exhaustive: only the reserved words likely to show up as column, function or
// parameter names. Argument modes are included so a parameter is never read as one.
const RESERVED: &[&str] = &[
    "all", "and", "as", "case", "cast", "check", "column", "create", "default", "desc", "distinct",
    "do", "else", "end", "false", "for", "from", "function", "grant", "group", "having", "in",
    "inout", "limit", "not", "null", "offset", "on", "or", "order", "out", "select", "table",
    "then", "to", "true", "union", "user", "using", "variadic", "when", "where", "with",
];

/// Double-quotes `ident` unless PostgreSQL would read it back unchanged without quotes.
pub fn quote_identifier(ident: &str) -> Cow<'_, str> {
    let mut chars = ident.chars();
    let starts_plain = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_');
    let plain = starts_plain
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
        && !RESERVED.contains(&ident);
    if plain {
        Cow::Borrowed(ident)
    } else {
        Cow::Owned(format!("\"{}\"", ident.replace('"', "\"\"")))
    }
}

#[test]
fn test_quote_identifier() {
    let cases = vec![
        ("custom_len", "custom_len"),
        ("udf_test_1", "udf_test_1"),
        ("_x$", "_x$"),
        ("CamelCase", "\"CamelCase\""),
        ("user", "\"user\""),
        ("out", "\"out\""),
        ("inout", "\"inout\""),
        ("variadic", "\"variadic\""),
        ("1abc", "\"1abc\""),
        ("has space", "\"has space\""),
        ("quo\"te", "\"quo\"\"te\""),
        ("", "\"\""),
    ];
    for case in cases {
        println!("Case: {}", case.0);
        assert_eq!(quote_identifier(case.0), case.1);
    }
}

#[test]
fn test_render_call_and_select() {
    let call = SqlExpr::Call {
        func: FunctionRef {
            schema: Some(String::from("udf_test")),
            name: String::from("custom_len"),
        },
        args: vec![SqlExpr::Column(String::from("user_name"))],
    };
    assert_eq!(call.to_string(), "udf_test.custom_len(user_name)");

    let select = Select {
        items: vec![
            SqlExpr::Column(String::from("user_id")),
            SqlExpr::Label {
                expr: Box::new(call),
                label: String::from("custom_len"),
            },
        ],
        from: TableRef {
            schema: Some(String::from("udf_test")),
            name: String::from("users"),
        },
        filter: Some(SqlExpr::BinaryOp {
            lhs: Box::new(SqlExpr::Column(String::from("user_id"))),
            op: "=",
            rhs: Box::new(SqlExpr::Literal(String::from("2"))),
        }),
    };
    assert_eq!(
        select.to_string(),
        "SELECT user_id, udf_test.custom_len(user_name) AS custom_len FROM udf_test.users WHERE (user_id = 2)"
    );
}

#[test]
fn test_render_literals() {
    assert_eq!(SqlExpr::text("it's").to_string(), "'it''s'");
    assert_eq!(SqlExpr::bytes(&[0xde, 0xad]).to_string(), "'\\xdead'::bytea");
}

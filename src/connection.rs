//! Defines `Connection`, the narrow interface this crate needs from a database session.
//!
//! Statements are executed synchronously. Implementations report failures with the
//! server's SQLSTATE code where one is available; callers pass the error on unchanged.

use crate::sql_value::SqlValue;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}{}", .code.as_ref().map(|c| format!(" (SQLSTATE {c})")).unwrap_or_default())]
pub struct Error {
    /// SQLSTATE reported by the server, e.g. `42723` for a duplicate function.
    pub code: Option<String>,
    pub message: String,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Error {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: &str, message: impl Into<String>) -> Self {
        Error {
            code: Some(String::from(code)),
            message: message.into(),
        }
    }
}

/// One row of a query result.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub items: Vec<SqlValue>,
}

pub trait Connection {
    /// Executes one or more statements, returning the number of rows affected.
    fn execute(&mut self, statement: &str) -> Result<u64, Error>;

    /// Runs a query and returns every row.
    fn query(&mut self, statement: &str) -> Result<Vec<Row>, Error>;
}

impl<C: Connection + ?Sized> Connection for &mut C {
    fn execute(&mut self, statement: &str) -> Result<u64, Error> {
        (**self).execute(statement)
    }

    fn query(&mut self, statement: &str) -> Result<Vec<Row>, Error> {
        (**self).query(statement)
    }
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn execute(&mut self, statement: &str) -> Result<u64, Error> {
        (**self).execute(statement)
    }

    fn query(&mut self, statement: &str) -> Result<Vec<Row>, Error> {
        (**self).query(statement)
    }
}

#[test]
fn test_error_display() {
    assert_eq!(Error::new("boom").to_string(), "boom");
    assert_eq!(
        Error::with_code("42723", "function already exists").to_string(),
        "function already exists (SQLSTATE 42723)"
    );
}

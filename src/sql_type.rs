//! Defines an enum of the PostgreSQL type names used in function signatures and routines for conversion to and from string.
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// PostgreSQL types that PL/Python can exchange with Python values.
/// Notes:
///   - PostgreSQL has no one-byte integer; `SMALLINT` is the narrowest.
///   - Aliases such as `int4` or `text` are accepted when parsing, but display is always canonical.
pub enum SqlType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Real,
    DoublePrecision,
    Numeric,
    Bytea,
    Varchar,
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlType::Boolean => "BOOLEAN".fmt(f),
            SqlType::SmallInt => "SMALLINT".fmt(f),
            SqlType::Integer => "INTEGER".fmt(f),
            SqlType::BigInt => "BIGINT".fmt(f),
            SqlType::Real => "REAL".fmt(f),
            SqlType::DoublePrecision => "DOUBLE PRECISION".fmt(f),
            SqlType::Numeric => "NUMERIC".fmt(f),
            SqlType::Bytea => "BYTEA".fmt(f),
            SqlType::Varchar => "VARCHAR".fmt(f),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Unable to parse SqlType from type name: {0}.")]
    ParseSqlTypeError(String),
}

impl FromStr for SqlType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_lowercase().as_str() {
            "boolean" | "bool" => Ok(SqlType::Boolean),
            "smallint" | "int2" => Ok(SqlType::SmallInt),
            "integer" | "int" | "int4" => Ok(SqlType::Integer),
            "bigint" | "int8" => Ok(SqlType::BigInt),
            "real" | "float4" => Ok(SqlType::Real),
            "double precision" | "float8" => Ok(SqlType::DoublePrecision),
            "numeric" | "decimal" => Ok(SqlType::Numeric),
            "bytea" => Ok(SqlType::Bytea),
            "varchar" | "character varying" | "text" | "name" => Ok(SqlType::Varchar),
            x => Err(Error::ParseSqlTypeError(String::from(x))),
        }
    }
}

#[test]
fn test_sql_type_from_str() {
    let cases = vec![
        ("BOOLEAN", SqlType::Boolean),
        ("int4", SqlType::Integer),
        ("Integer", SqlType::Integer),
        ("int8", SqlType::BigInt),
        ("double   precision", SqlType::DoublePrecision),
        ("float8", SqlType::DoublePrecision),
        ("character varying", SqlType::Varchar),
        ("text", SqlType::Varchar),
        ("bytea", SqlType::Bytea),
    ];
    for case in cases {
        println!("Case: {}", case.0);
        assert_eq!(SqlType::from_str(case.0), Ok(case.1));
    }
}

#[test]
fn test_not_parse_invalid_sql_types() {
    let cases = vec!["blob", "timestamp with time zone", ""];
    for case in cases {
        assert!(SqlType::from_str(case).is_err());
    }
}

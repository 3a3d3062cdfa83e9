//! `catalog` maps between the three type spaces: Python values, abstract expression
//! types, and PostgreSQL type names.
//!
//! The mapping follows <https://www.postgresql.org/docs/current/plpython-data.html>.
//! It is fixed at compile time; there is no way to register additional types.

use crate::datatype::DataType;
use crate::py_type::PyType;
use crate::sql_type::SqlType;

/// The type name used for text-like values.
pub const SQL_DEFAULT_TYPE: SqlType = SqlType::Varchar;

/// One row of the catalog: a Python type, the abstract type it becomes, and its PostgreSQL name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMapping {
    pub host: PyType,
    pub abstract_type: DataType,
    pub sql: SqlType,
}

/// The host-facing part of the catalog, one entry per Python primitive.
pub const MAPPINGS: [TypeMapping; 6] = [
    TypeMapping {
        host: PyType::Bool,
        abstract_type: DataType::Boolean,
        sql: SqlType::Boolean,
    },
    TypeMapping {
        host: PyType::Int,
        abstract_type: DataType::Int32,
        sql: SqlType::Integer,
    },
    TypeMapping {
        host: PyType::Float,
        abstract_type: DataType::Float64,
        sql: SqlType::DoublePrecision,
    },
    TypeMapping {
        host: PyType::Decimal,
        abstract_type: DataType::Decimal,
        sql: SqlType::Numeric,
    },
    TypeMapping {
        host: PyType::Bytes,
        abstract_type: DataType::Binary,
        sql: SqlType::Bytea,
    },
    TypeMapping {
        host: PyType::Str,
        abstract_type: DataType::String,
        sql: SQL_DEFAULT_TYPE,
    },
];

pub fn abstract_type_of(host: PyType) -> DataType {
    match host {
        PyType::Bool => DataType::Boolean,
        PyType::Int => DataType::Int32,
        PyType::Float => DataType::Float64,
        PyType::Decimal => DataType::Decimal,
        PyType::Bytes => DataType::Binary,
        PyType::Str => DataType::String,
    }
}

pub fn sql_type_name_of(t: DataType) -> SqlType {
    match t {
        DataType::Boolean => SqlType::Boolean,
        DataType::Int8 | DataType::Int16 => SqlType::SmallInt,
        DataType::Int32 => SqlType::Integer,
        DataType::Int64 => SqlType::BigInt,
        DataType::Float32 => SqlType::Real,
        DataType::Float64 => SqlType::DoublePrecision,
        DataType::Decimal => SqlType::Numeric,
        DataType::Binary => SqlType::Bytea,
        DataType::String => SQL_DEFAULT_TYPE,
    }
}

/// The Python type PL/Python hands to the function body for an argument of type `t`.
/// Narrower and wider integers are still Python `int`s.
pub fn host_type_of(t: DataType) -> PyType {
    match t {
        DataType::Boolean => PyType::Bool,
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => PyType::Int,
        DataType::Float32 | DataType::Float64 => PyType::Float,
        DataType::Decimal => PyType::Decimal,
        DataType::Binary => PyType::Bytes,
        DataType::String => PyType::Str,
    }
}

pub fn abstract_type_of_sql(t: SqlType) -> DataType {
    match t {
        SqlType::Boolean => DataType::Boolean,
        SqlType::SmallInt => DataType::Int16,
        SqlType::Integer => DataType::Int32,
        SqlType::BigInt => DataType::Int64,
        SqlType::Real => DataType::Float32,
        SqlType::DoublePrecision => DataType::Float64,
        SqlType::Numeric => DataType::Decimal,
        SqlType::Bytea => DataType::Binary,
        SqlType::Varchar => DataType::String,
    }
}

#[test]
fn test_mappings_agree_with_lookups() {
    for m in MAPPINGS {
        println!("Case: {:?}", m);
        assert_eq!(abstract_type_of(m.host), m.abstract_type);
        assert_eq!(sql_type_name_of(m.abstract_type), m.sql);
        assert_eq!(host_type_of(m.abstract_type), m.host);
        assert_eq!(abstract_type_of_sql(m.sql), m.abstract_type);
    }
}

#[test]
fn test_sql_type_name_of_is_total_and_stable() {
    use DataType::*;
    for t in [
        Boolean, Int8, Int16, Int32, Int64, Float32, Float64, Decimal, Binary, String,
    ] {
        let first = sql_type_name_of(t);
        assert!(!first.to_string().is_empty());
        assert_eq!(sql_type_name_of(t), first);
        // Every SQL name comes back to a type the original type casts into.
        assert!(t.castable_to(&abstract_type_of_sql(first)));
    }
}

#[test]
fn test_text_defaults_to_varchar() {
    assert_eq!(sql_type_name_of(DataType::String).to_string(), "VARCHAR");
}

//! Defines the Python primitive types that a PL/Python function can receive or return.
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Python value types that PL/Python converts to and from SQL values.
/// See <https://www.postgresql.org/docs/current/plpython-data.html>.
pub enum PyType {
    Bool,
    Int,
    Float,
    Decimal,
    Bytes,
    Str,
}

impl std::fmt::Display for PyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PyType::Bool => "bool".fmt(f),
            PyType::Int => "int".fmt(f),
            PyType::Float => "float".fmt(f),
            PyType::Decimal => "Decimal".fmt(f),
            PyType::Bytes => "bytes".fmt(f),
            PyType::Str => "str".fmt(f),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Not a supported Python primitive type: {0}.")]
    UnsupportedPyType(String),
}

/// Parses the spelling of a type as it appears in a Python annotation.
impl FromStr for PyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "bool" => Ok(PyType::Bool),
            "int" => Ok(PyType::Int),
            "float" => Ok(PyType::Float),
            "Decimal" | "decimal.Decimal" => Ok(PyType::Decimal),
            "bytes" => Ok(PyType::Bytes),
            "str" => Ok(PyType::Str),
            x => Err(Error::UnsupportedPyType(String::from(x))),
        }
    }
}

#[test]
fn test_py_type_from_annotation() {
    let cases = vec![
        ("bool", Ok(PyType::Bool)),
        ("int", Ok(PyType::Int)),
        (" float ", Ok(PyType::Float)),
        ("decimal.Decimal", Ok(PyType::Decimal)),
        ("Decimal", Ok(PyType::Decimal)),
        ("bytes", Ok(PyType::Bytes)),
        ("str", Ok(PyType::Str)),
        (
            "List[int]",
            Err(Error::UnsupportedPyType("List[int]".to_string())),
        ),
    ];
    for case in cases {
        println!("Case: {}", case.0);
        assert_eq!(PyType::from_str(case.0), case.1);
    }
}

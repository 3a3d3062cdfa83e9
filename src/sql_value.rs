//! Defines an enum of the values a query result cell can hold.

use enum_as_inner::EnumAsInner;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
/// One cell of a result row.
/// Integers of every width are widened to `i64`, and floats to `f64`.
/// `NUMERIC` keeps its exact value.
pub enum SqlValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Decimal(Decimal),
    Text(String),
    Blob(Vec<u8>),
    Null(),
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Bool(x) => x.fmt(f),
            SqlValue::Int(x) => x.fmt(f),
            SqlValue::Real(x) => x.fmt(f),
            SqlValue::Decimal(x) => x.fmt(f),
            SqlValue::Text(x) => x.fmt(f),
            SqlValue::Blob(x) => write!(f, "\\x{}", hex::encode(x)),
            SqlValue::Null() => "NULL".fmt(f),
        }
    }
}

#[test]
fn test_display() {
    let cases = vec![
        (SqlValue::Bool(true), "true"),
        (SqlValue::Int(8), "8"),
        (SqlValue::Real(1.5), "1.5"),
        (SqlValue::Decimal(Decimal::new(1050, 2)), "10.50"),
        (SqlValue::Text(String::from("Judy")), "Judy"),
        (SqlValue::Blob(vec![0xca, 0xfe]), "\\xcafe"),
        (SqlValue::Null(), "NULL"),
    ];
    for case in cases {
        assert_eq!(case.0.to_string(), case.1);
    }
    assert_eq!(SqlValue::Int(3).as_int(), Some(&3));
    assert!(SqlValue::Null().as_null().is_some());
}

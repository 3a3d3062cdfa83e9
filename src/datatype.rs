//! Defines the abstract value types of the expression system.
//! These are independent of both Python and PostgreSQL; `catalog` maps between the three.
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The value kinds an expression can produce.
/// Notes:
///   - Integer widths are part of the type so that a signature round-trips exactly.
///   - There is no null type; nullability is not tracked.
pub enum DataType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    Binary,
    String,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Boolean => "boolean".fmt(f),
            DataType::Int8 => "int8".fmt(f),
            DataType::Int16 => "int16".fmt(f),
            DataType::Int32 => "int32".fmt(f),
            DataType::Int64 => "int64".fmt(f),
            DataType::Float32 => "float32".fmt(f),
            DataType::Float64 => "float64".fmt(f),
            DataType::Decimal => "decimal".fmt(f),
            DataType::Binary => "binary".fmt(f),
            DataType::String => "string".fmt(f),
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("Unknown data type: {0}.")]
    UnknownDataType(String),
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "boolean" | "bool" => Ok(DataType::Boolean),
            "int8" => Ok(DataType::Int8),
            "int16" => Ok(DataType::Int16),
            "int32" | "int" => Ok(DataType::Int32),
            "int64" => Ok(DataType::Int64),
            "float32" => Ok(DataType::Float32),
            "float64" | "float" | "double" => Ok(DataType::Float64),
            "decimal" => Ok(DataType::Decimal),
            "binary" | "bytes" => Ok(DataType::Binary),
            "string" | "str" => Ok(DataType::String),
            x => Err(Error::UnknownDataType(String::from(x))),
        }
    }
}

impl DataType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_floating() || *self == DataType::Decimal
    }

    /// Rank within the numeric tower, used for promotion. `None` for non-numeric types.
    fn numeric_rank(&self) -> Option<u8> {
        match self {
            DataType::Int8 => Some(0),
            DataType::Int16 => Some(1),
            DataType::Int32 => Some(2),
            DataType::Int64 => Some(3),
            DataType::Float32 => Some(4),
            DataType::Float64 => Some(5),
            DataType::Decimal => Some(6),
            _ => None,
        }
    }

    /// Whether a value of this type may be passed where `target` is expected
    /// without an explicit cast.
    /// Integers widen to wider integers, and any integer or float may flow into
    /// a float or decimal. Nothing narrows.
    pub fn castable_to(&self, target: &DataType) -> bool {
        if self == target {
            return true;
        }
        match (self.numeric_rank(), target.numeric_rank()) {
            (Some(from), Some(to)) => {
                if target.is_integer() {
                    self.is_integer() && from < to
                } else if target.is_floating() {
                    // Every integer goes to a float, but float64 does not go back to float32.
                    self.is_integer() || (self.is_floating() && from < to)
                } else {
                    true
                }
            }
            _ => false,
        }
    }

    /// The type of an arithmetic result over `self` and `other`, if both are numeric.
    pub fn promote(&self, other: &DataType) -> Option<DataType> {
        let (l, r) = (self.numeric_rank()?, other.numeric_rank()?);
        Some(if l >= r { *self } else { *other })
    }

    /// The narrowest integer type that can hold `i`.
    pub fn for_int_literal(i: i64) -> DataType {
        if i8::try_from(i).is_ok() {
            DataType::Int8
        } else if i16::try_from(i).is_ok() {
            DataType::Int16
        } else if i32::try_from(i).is_ok() {
            DataType::Int32
        } else {
            DataType::Int64
        }
    }
}

#[test]
fn test_datatype_from_str() {
    let cases = vec![
        ("boolean", DataType::Boolean),
        ("BOOL", DataType::Boolean),
        ("int8", DataType::Int8),
        ("int32", DataType::Int32),
        ("Int64", DataType::Int64),
        ("float", DataType::Float64),
        ("float32", DataType::Float32),
        ("decimal", DataType::Decimal),
        ("bytes", DataType::Binary),
        ("string", DataType::String),
    ];
    for case in cases {
        println!("Case: {}", case.0);
        assert_eq!(DataType::from_str(case.0), Ok(case.1));
    }
    assert!(DataType::from_str("timestamp").is_err());
}

#[test]
fn test_datatype_display_round_trips() {
    use DataType::*;
    for t in [
        Boolean, Int8, Int16, Int32, Int64, Float32, Float64, Decimal, Binary, String,
    ] {
        assert_eq!(DataType::from_str(&t.to_string()), Ok(t));
    }
}

#[test]
fn test_castable_to() {
    use DataType::*;
    let cases = vec![
        (Int8, Int32, true),
        (Int32, Int32, true),
        (Int64, Int32, false),
        (Int32, Float64, true),
        (Int64, Float32, true),
        (Float32, Float64, true),
        (Float64, Float32, false),
        (Float64, Decimal, true),
        (Int16, Decimal, true),
        (Decimal, Float64, false),
        (String, Binary, false),
        (Boolean, Int8, false),
        (Int8, Boolean, false),
    ];
    for case in cases {
        println!("Case: {} -> {}", case.0, case.1);
        assert_eq!(case.0.castable_to(&case.1), case.2);
    }
}

#[test]
fn test_promote() {
    use DataType::*;
    assert_eq!(Int8.promote(&Int32), Some(Int32));
    assert_eq!(Int64.promote(&Float32), Some(Float32));
    assert_eq!(Float64.promote(&Int8), Some(Float64));
    assert_eq!(String.promote(&Int8), None);
}

#[test]
fn test_for_int_literal() {
    assert_eq!(DataType::for_int_literal(2), DataType::Int8);
    assert_eq!(DataType::for_int_literal(-200), DataType::Int16);
    assert_eq!(DataType::for_int_literal(70_000), DataType::Int32);
    assert_eq!(DataType::for_int_literal(1_000_000_000_000), DataType::Int64);
}

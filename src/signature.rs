//! Defines `FunctionSignature`, the name and typed parameter list of a user-defined function.

use crate::datatype::DataType;
use crate::error::{Error, Result};
use crate::sql::FunctionRef;
use itertools::Itertools;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub dtype: DataType,
}

/// What the compiler needs to know to call a function: where it lives, what it takes and what it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub output_type: DataType,
    pub schema: Option<String>,
}

impl FunctionSignature {
    /// Builds a signature, naming the parameters `v0, v1, ...` when no names are given.
    pub fn new(
        name: &str,
        input_types: &[DataType],
        output_type: DataType,
        schema: Option<&str>,
        parameter_names: Option<Vec<String>>,
    ) -> Result<FunctionSignature> {
        if name.is_empty() {
            return Err(Error::Configuration(String::from(
                "function name must not be empty",
            )));
        }
        let names = match parameter_names {
            None => (0..input_types.len()).map(|i| format!("v{i}")).collect(),
            Some(names) if names.len() != input_types.len() => {
                return Err(Error::Configuration(format!(
                    "Length mismatch in arguments to {name}: len(input_types)={}, len(parameters)={}",
                    input_types.len(),
                    names.len()
                )));
            }
            Some(names) => names,
        };
        if let Some(dup) = names.iter().duplicates().next() {
            return Err(Error::Configuration(format!(
                "duplicate parameter name {dup} in {name}"
            )));
        }
        Ok(FunctionSignature {
            name: String::from(name),
            parameters: names
                .into_iter()
                .zip(input_types.iter())
                .map(|(name, dtype)| Parameter {
                    name,
                    dtype: *dtype,
                })
                .collect(),
            output_type,
            schema: schema.map(String::from),
        })
    }

    pub fn input_types(&self) -> Vec<DataType> {
        self.parameters.iter().map(|p| p.dtype).collect()
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    /// The possibly schema-qualified reference used to call the function from SQL.
    pub fn function_ref(&self) -> FunctionRef {
        FunctionRef {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }
}

impl std::fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({}) -> {}",
            self.function_ref(),
            self.parameters
                .iter()
                .map(|p| format!("{} {}", p.name, p.dtype))
                .join(", "),
            self.output_type
        )
    }
}

#[test]
fn test_fabricates_parameter_names() {
    let sig = FunctionSignature::new(
        "f",
        &[DataType::String, DataType::Int32],
        DataType::Int32,
        None,
        None,
    )
    .unwrap();
    assert_eq!(sig.parameter_names(), vec!["v0", "v1"]);
    assert_eq!(sig.input_types(), vec![DataType::String, DataType::Int32]);
    assert_eq!(sig.to_string(), "f(v0 string, v1 int32) -> int32");
}

#[test]
fn test_signature_validation() {
    struct Case {
        desc: &'static str,
        names: Option<Vec<&'static str>>,
        ok: bool,
    }
    let cases = vec![
        Case {
            desc: "matching names",
            names: Some(vec!["a", "b"]),
            ok: true,
        },
        Case {
            desc: "too few names",
            names: Some(vec!["a"]),
            ok: false,
        },
        Case {
            desc: "too many names",
            names: Some(vec!["a", "b", "c"]),
            ok: false,
        },
        Case {
            desc: "duplicate names",
            names: Some(vec!["a", "a"]),
            ok: false,
        },
        Case {
            desc: "no names",
            names: None,
            ok: true,
        },
    ];
    for case in cases {
        println!("Running case: {}", case.desc);
        let actual = FunctionSignature::new(
            "g",
            &[DataType::Int32, DataType::Int32],
            DataType::Int64,
            Some("s"),
            case.names
                .map(|ns| ns.into_iter().map(String::from).collect()),
        );
        match actual {
            Ok(sig) => {
                assert!(case.ok);
                assert_eq!(sig.schema.as_deref(), Some("s"));
            }
            Err(e) => {
                assert!(!case.ok);
                assert!(matches!(e, Error::Configuration(_)));
            }
        }
    }
}

//! `udf` is the user-facing entry point for registering functions.
//!
//! * `existing_udf` binds a function that already exists in the database.
//! * `func_to_udf` creates the function from Python source first, then binds it.
//!
//! Either way the result is a `Udf`, which builds expression nodes when called.

use crate::connection::Connection;
use crate::datatype::DataType;
use crate::error::Result;
use crate::expr::Expr;
use crate::node::{self, NodeKind};
use crate::remote::{self, DeployOptions};
use crate::signature::FunctionSignature;
use crate::source::PyFunction;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A registered function. Calling it yields an `Expr::Call` node.
#[derive(Debug, Clone, PartialEq)]
pub struct Udf {
    kind: Arc<NodeKind>,
}

impl Udf {
    pub fn call(&self, args: Vec<Expr>) -> Result<Expr> {
        Ok(Expr::Call(self.kind.instantiate(args)?))
    }

    pub fn kind(&self) -> &Arc<NodeKind> {
        &self.kind
    }

    pub fn signature(&self) -> &FunctionSignature {
        self.kind.signature()
    }
}

/// Binds a function that already exists in the database.
///
/// Nothing is registered unless the arguments are valid. When `parameters` is absent the
/// parameters are named `v0, v1, ...`.
#[instrument(skip_all, fields(name = name), err)]
pub fn existing_udf(
    name: &str,
    input_types: &[DataType],
    output_type: DataType,
    schema: Option<&str>,
    parameters: Option<Vec<String>>,
) -> Result<Udf> {
    let signature = FunctionSignature::new(name, input_types, output_type, schema, parameters)?;
    let kind = node::make_node_kind(signature);
    node::register_renderer(&kind);
    debug!(kind = %kind.id(), "bound existing function");
    Ok(Udf { kind })
}

/// Creates `func` in the database through `conn` and binds it.
///
/// If the database rejects the definition the error is returned and nothing is registered.
#[instrument(skip_all, fields(function = func.name()), err)]
pub fn func_to_udf<C: Connection + ?Sized>(
    conn: &mut C,
    func: &PyFunction,
    input_types: Option<&[DataType]>,
    output_type: Option<DataType>,
    options: &DeployOptions,
) -> Result<Udf> {
    let signature = remote::deploy(conn, func, input_types, output_type, options)?;
    existing_udf(
        &signature.name,
        &signature.input_types(),
        signature.output_type,
        signature.schema.as_deref(),
        Some(
            signature
                .parameter_names()
                .into_iter()
                .map(String::from)
                .collect(),
        ),
    )
}

/// Registration methods available on every connection.
pub trait UdfClient: Connection {
    /// Parses `source` as a Python function definition, creates it in the database
    /// and binds it. See `func_to_udf`.
    fn udf(
        &mut self,
        source: &str,
        input_types: &[DataType],
        output_type: DataType,
        options: &DeployOptions,
    ) -> Result<Udf> {
        let func = PyFunction::parse(source)?;
        func_to_udf(self, &func, Some(input_types), Some(output_type), options)
    }
}

impl<C: Connection + ?Sized> UdfClient for C {}

#[cfg(test)]
use crate::compiler::Translator;
#[cfg(test)]
use crate::connection::{Error as ConnectionError, Row};
#[cfg(test)]
use crate::error::Error;

#[cfg(test)]
#[derive(Default)]
struct RecordingConnection {
    statements: Vec<String>,
    fail_with: Option<ConnectionError>,
}

#[cfg(test)]
impl Connection for RecordingConnection {
    fn execute(&mut self, sql: &str) -> std::result::Result<u64, ConnectionError> {
        if let Some(e) = &self.fail_with {
            return Err(e.clone());
        }
        self.statements.push(String::from(sql));
        Ok(0)
    }

    fn query(&mut self, sql: &str) -> std::result::Result<Vec<Row>, ConnectionError> {
        self.execute(sql).map(|_| vec![])
    }
}

#[test]
fn test_existing_udf() {
    let udf = existing_udf(
        "udf_test_custom_len",
        &[DataType::String],
        DataType::Int64,
        Some("udf_test"),
        None,
    )
    .unwrap();
    assert_eq!(udf.signature().parameter_names(), vec!["v0"]);
    let expr = udf
        .call(vec![Expr::column("user_name", DataType::String)])
        .unwrap()
        .name("custom_len");
    assert_eq!(expr.dtype(), DataType::Int64);
    assert_eq!(
        Translator::new().translate(&expr).unwrap().to_string(),
        "udf_test.udf_test_custom_len(user_name) AS custom_len"
    );
}

#[test]
fn test_existing_udf_rejects_before_registering() {
    let cases = vec![
        (vec![DataType::String], Some(vec![])),
        (
            vec![DataType::String],
            Some(vec![String::from("a"), String::from("b")]),
        ),
        (
            vec![DataType::String, DataType::String],
            Some(vec![String::from("a"), String::from("a")]),
        ),
    ];
    for case in cases {
        println!("Case: {:?}", case.1);
        let actual = existing_udf(
            "udf_test_never_registered",
            &case.0,
            DataType::Int64,
            None,
            case.1,
        );
        assert!(matches!(actual, Err(Error::Configuration(_))));
    }
    assert_eq!(node::kind_count("udf_test_never_registered"), 0);
}

#[test]
fn test_func_to_udf() {
    let mut conn = RecordingConnection::default();
    let udf = conn
        .udf(
            "def udf_test_mult(a, b):\n    return a * b\n",
            &[DataType::Int32, DataType::Int32],
            DataType::Int32,
            &DeployOptions::new().schema("udf_test").replace(true),
        )
        .unwrap();
    assert_eq!(conn.statements.len(), 1);
    assert!(conn.statements[0]
        .starts_with("CREATE OR REPLACE FUNCTION udf_test.udf_test_mult(a INTEGER, b INTEGER)\n"));
    assert_eq!(udf.signature().parameter_names(), vec!["a", "b"]);
    let expr = udf
        .call(vec![
            Expr::column("user_id", DataType::Int32),
            Expr::column("name_length", DataType::Int32),
        ])
        .unwrap();
    assert_eq!(
        Translator::new().translate(&expr).unwrap().to_string(),
        "udf_test.udf_test_mult(user_id, name_length)"
    );
}

#[test]
fn test_func_to_udf_failures_register_nothing() {
    let func = PyFunction::parse("def udf_test_failing(a):\n    return a\n").unwrap();

    let mut conn = RecordingConnection::default();
    let actual = func_to_udf(&mut conn, &func, None, Some(DataType::Int32), &DeployOptions::new());
    assert!(matches!(actual, Err(Error::Unsupported(_))));
    let actual = func_to_udf(&mut conn, &func, Some(&[DataType::Int32][..]), None, &DeployOptions::new());
    assert!(matches!(actual, Err(Error::Unsupported(_))));
    let actual = func_to_udf(
        &mut conn,
        &func,
        Some(&[DataType::Int32, DataType::Int32][..]),
        Some(DataType::Int32),
        &DeployOptions::new(),
    );
    assert!(matches!(actual, Err(Error::Configuration(_))));
    assert!(conn.statements.is_empty());

    let rejected = ConnectionError::with_code("42723", "function already exists");
    let mut conn = RecordingConnection {
        statements: vec![],
        fail_with: Some(rejected.clone()),
    };
    match func_to_udf(
        &mut conn,
        &func,
        Some(&[DataType::Int32][..]),
        Some(DataType::Int32),
        &DeployOptions::new(),
    ) {
        Err(Error::RemoteExecution(e)) => assert_eq!(e, rejected),
        other => panic!("expected remote execution error, got {:?}", other),
    }
    assert_eq!(node::kind_count("udf_test_failing"), 0);
}

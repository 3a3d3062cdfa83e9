//! `node` mints new expression node kinds at runtime, one per registered function.
//!
//! A kind carries its `FunctionSignature`: one required field per parameter plus the
//! result-type rule. Kinds live in a process-wide registry for the rest of the process.
//! Registering the same name twice yields two distinct kinds, `name_0` and `name_1`, and
//! both stay callable through the `Udf` that holds them.

use crate::compiler::{self, shape_like, Translator};
use crate::datatype::DataType;
use crate::error::{Error, Result};
use crate::expr::{Expr, ResultDescriptor, UdfCall};
use crate::signature::FunctionSignature;
use crate::sql::SqlExpr;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Internal identity of a node kind: the function name plus a per-name counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKindId(String);

impl NodeKindId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeKindId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct NodeKind {
    id: NodeKindId,
    signature: FunctionSignature,
}

impl NodeKind {
    pub fn id(&self) -> &NodeKindId {
        &self.id
    }

    pub fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    /// The name the function is called by in SQL.
    pub fn resolve_name(&self) -> &str {
        &self.signature.name
    }

    /// Result-type rule: the declared output type, shaped like the arguments.
    pub fn output_type(&self, args: &[Expr]) -> ResultDescriptor {
        shape_like(args, self.signature.output_type)
    }

    /// Creates a node of this kind over `args`, checking them against the fields.
    pub fn instantiate(self: &Arc<Self>, args: Vec<Expr>) -> Result<UdfCall> {
        let params = &self.signature.parameters;
        if args.len() != params.len() {
            return Err(Error::Argument(format!(
                "{} takes {} arguments but {} were given",
                self.signature.name,
                params.len(),
                args.len()
            )));
        }
        for (param, arg) in params.iter().zip(args.iter()) {
            let dtype: DataType = arg.dtype();
            if !dtype.castable_to(&param.dtype) {
                return Err(Error::Argument(format!(
                    "argument {} of {} must be {}, found {} ({})",
                    param.name, self.signature.name, param.dtype, dtype, arg
                )));
            }
        }
        Ok(UdfCall {
            kind: Arc::clone(self),
            args,
        })
    }
}

#[derive(Default)]
struct Registry {
    // Next number to hand out for each function name.
    definitions: HashMap<String, usize>,
    kinds: HashMap<NodeKindId, Arc<NodeKind>>,
}

lazy_static::lazy_static! {
    static ref REGISTRY: Mutex<Registry> = Mutex::new(Registry::default());
}

/// Mints a new node kind for `signature`.
pub fn make_node_kind(signature: FunctionSignature) -> Arc<NodeKind> {
    let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
    let counter = registry
        .definitions
        .entry(signature.name.clone())
        .or_insert(0);
    let definition = *counter;
    *counter += 1;
    let id = NodeKindId(format!("{}_{}", signature.name, definition));
    let kind = Arc::new(NodeKind {
        id: id.clone(),
        signature,
    });
    registry.kinds.insert(id, Arc::clone(&kind));
    debug!(kind = %kind.id, signature = %kind.signature, "minted node kind");
    kind
}

/// Adds a translation rule for `kind` that calls the function by its (schema-qualified) name.
pub fn register_renderer(kind: &NodeKind) {
    let func = kind.signature.function_ref();
    debug!(kind = %kind.id, function = %func, "registering renderer");
    compiler::add_operation(
        &kind.id,
        Arc::new(move |t: &Translator, call: &UdfCall| -> anyhow::Result<SqlExpr> {
            let args = call
                .args
                .iter()
                .map(|a| t.translate_operand(a))
                .collect::<anyhow::Result<Vec<_>>>()?;
            Ok(SqlExpr::Call {
                func: func.clone(),
                args,
            })
        }),
    );
}

pub fn lookup(id: &NodeKindId) -> Option<Arc<NodeKind>> {
    REGISTRY
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .kinds
        .get(id)
        .cloned()
}

/// How many kinds have been minted under `name`.
pub fn kind_count(name: &str) -> usize {
    REGISTRY
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .definitions
        .get(name)
        .copied()
        .unwrap_or(0)
}

#[cfg(test)]
fn signature(name: &str, inputs: &[DataType], output: DataType) -> FunctionSignature {
    FunctionSignature::new(name, inputs, output, None, None).unwrap()
}

#[test]
fn test_make_node_kind_disambiguates_names() {
    let first = make_node_kind(signature("node_test_twice", &[DataType::Int32], DataType::Int32));
    let second = make_node_kind(signature("node_test_twice", &[DataType::String], DataType::Int32));
    assert_eq!(first.id().as_str(), "node_test_twice_0");
    assert_eq!(second.id().as_str(), "node_test_twice_1");
    assert_eq!(first.resolve_name(), second.resolve_name());
    assert_eq!(kind_count("node_test_twice"), 2);
    assert_eq!(lookup(first.id()), Some(Arc::clone(&first)));
    assert_eq!(lookup(second.id()), Some(second));
}

#[test]
fn test_instantiate_checks_arguments() {
    let kind = make_node_kind(signature(
        "node_test_args",
        &[DataType::Int32, DataType::Float64],
        DataType::Float64,
    ));
    let a = Expr::column("a", DataType::Int16);
    let b = Expr::column("b", DataType::Int64);
    let s = Expr::column("s", DataType::String);
    struct Case {
        desc: &'static str,
        args: Vec<Expr>,
        ok: bool,
    }
    let cases = vec![
        Case {
            desc: "widening casts",
            args: vec![a.clone(), b.clone()],
            ok: true,
        },
        Case {
            desc: "too few",
            args: vec![a.clone()],
            ok: false,
        },
        Case {
            desc: "too many",
            args: vec![a.clone(), b.clone(), b.clone()],
            ok: false,
        },
        Case {
            desc: "narrowing",
            args: vec![b.clone(), b.clone()],
            ok: false,
        },
        Case {
            desc: "wrong type",
            args: vec![a.clone(), s.clone()],
            ok: false,
        },
    ];
    for case in cases {
        println!("Running case: {}", case.desc);
        match kind.instantiate(case.args) {
            Ok(call) => {
                assert!(case.ok);
                assert_eq!(call.kind.id(), kind.id());
            }
            Err(e) => {
                assert!(!case.ok);
                assert!(matches!(e, Error::Argument(_)));
            }
        }
    }
}

#[test]
fn test_renderer_resolves_schema_and_translates_arguments() {
    let sig = FunctionSignature::new(
        "node_test_render",
        &[DataType::String],
        DataType::String,
        Some("udfs"),
        Some(vec![String::from("x")]),
    )
    .unwrap();
    let kind = make_node_kind(sig);
    register_renderer(&kind);
    let inner = Expr::Call(
        kind.instantiate(vec![Expr::column("user_name", DataType::String)])
            .unwrap(),
    );
    let outer = Expr::Call(kind.instantiate(vec![inner.name("n")]).unwrap());
    let sql = Translator::new().translate(&outer).unwrap();
    assert_eq!(
        sql.to_string(),
        "udfs.node_test_render(udfs.node_test_render(user_name))"
    );
    let aliased = Expr::Call(
        kind.instantiate(vec![Expr::column("user_name", DataType::String).name("n")])
            .unwrap(),
    );
    assert_eq!(
        Translator::new().translate(&aliased).unwrap().to_string(),
        "udfs.node_test_render(user_name)"
    );
}

#[test]
fn test_unregistered_kind_does_not_translate() {
    let kind = make_node_kind(signature("node_test_unrendered", &[], DataType::Boolean));
    let expr = Expr::Call(kind.instantiate(vec![]).unwrap());
    assert!(Translator::new().translate(&expr).is_err());
}

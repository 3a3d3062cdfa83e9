//! `remote` turns a Python function into a PL/Python routine and creates it in the database.
//!
//! The statement has this shape:
//!
//! ```sql
//! CREATE OR REPLACE FUNCTION udf_test.mult_a_b(a INTEGER, b INTEGER)
//! RETURNS INTEGER
//! LANGUAGE plpython3u
//! AS $$
//! def mult_a_b(a, b):
//!     return a * b
//! return mult_a_b(a, b)
//! $$;
//! ```
//!
//! The body holds the function *definition*, so it ends with a line that calls the
//! function with the routine's arguments and returns the result.

use crate::catalog::sql_type_name_of;
use crate::connection::Connection;
use crate::datatype::DataType;
use crate::error::{Error, Result};
use crate::signature::FunctionSignature;
use crate::source::{dedent, strip_decorators, ParamKind, PyFunction};
use crate::sql::quote_identifier;
use itertools::Itertools;
use tracing::{info, instrument, trace};

/// The procedural language the routine is created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    PlPython3u,
    /// Only on servers that still ship Python 2.
    PlPythonU,
    PlPython2u,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::PlPython3u => "plpython3u".fmt(f),
            Language::PlPythonU => "plpythonu".fmt(f),
            Language::PlPython2u => "plpython2u".fmt(f),
        }
    }
}

/// Options for creating a function in the database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOptions {
    /// Schema to create the function in; the search path decides when unset.
    pub schema: Option<String>,
    /// Emit `OR REPLACE`.
    pub replace: bool,
    /// Name of the function in the database. Defaults to the Python function's name.
    pub name: Option<String>,
    pub language: Language,
}

impl DeployOptions {
    pub fn new() -> Self {
        DeployOptions::default()
    }

    pub fn schema(mut self, schema: &str) -> Self {
        self.schema = Some(String::from(schema));
        self
    }

    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(String::from(name));
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }
}

/// A complete `CREATE FUNCTION` statement. `Display` renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDefinition {
    pub signature: FunctionSignature,
    pub replace: bool,
    pub language: Language,
    /// The Python definition, decorators removed, ending in a newline.
    pub body: String,
    /// Python expression that invokes the definition, e.g. `mult_a_b(a, b)`.
    pub call: String,
}

impl RemoteDefinition {
    /// Builds the statement for `func`. No database access happens here.
    pub fn build(
        func: &PyFunction,
        input_types: &[DataType],
        output_type: DataType,
        options: &DeployOptions,
    ) -> Result<RemoteDefinition> {
        if func.is_async() {
            return Err(Error::Configuration(format!(
                "{} is async; PL/Python cannot run coroutines",
                func.name()
            )));
        }
        let params = func.parameters();
        if let Some(p) = params
            .iter()
            .find(|p| matches!(p.kind, ParamKind::VarPositional | ParamKind::VarKeyword))
        {
            return Err(Error::Configuration(format!(
                "{} has variadic parameter {}, which has no SQL equivalent",
                func.name(),
                p.name
            )));
        }
        if params.len() != input_types.len() {
            return Err(Error::Configuration(format!(
                "{} takes {} parameters but {} input types were given",
                func.name(),
                params.len(),
                input_types.len()
            )));
        }
        let signature = FunctionSignature::new(
            options.name.as_deref().unwrap_or(func.name()),
            input_types,
            output_type,
            options.schema.as_deref(),
            Some(params.iter().map(|p| p.name.clone()).collect()),
        )?;

        // Extra indentation is an IndentationError inside the routine, and decorators
        // refer to names that do not exist there.
        let mut body = strip_decorators(&dedent(func.source()))?;
        if !body.ends_with('\n') {
            body.push('\n');
        }
        let call = format!(
            "{}({})",
            func.name(),
            params
                .iter()
                .map(|p| match p.kind {
                    ParamKind::KeywordOnly => format!("{0}={0}", p.name),
                    _ => p.name.clone(),
                })
                .join(", ")
        );
        Ok(RemoteDefinition {
            signature,
            replace: options.replace,
            language: options.language,
            body,
            call,
        })
    }

    /// A dollar-quote delimiter that does not occur in the body.
    fn dollar_tag(&self) -> String {
        let text = format!("{}return {}\n", self.body, self.call);
        let mut tag = String::from("$$");
        let mut n = 0;
        while text.contains(&tag) {
            tag = match n {
                0 => String::from("$pgudf$"),
                _ => format!("$pgudf_{n}$"),
            };
            n += 1;
        }
        tag
    }
}

impl std::fmt::Display for RemoteDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sig = &self.signature;
        let tag = self.dollar_tag();
        writeln!(
            f,
            "CREATE {}FUNCTION {}({})",
            if self.replace { "OR REPLACE " } else { "" },
            sig.function_ref(),
            sig.parameters
                .iter()
                .map(|p| format!("{} {}", quote_identifier(&p.name), sql_type_name_of(p.dtype)))
                .join(", ")
        )?;
        writeln!(f, "RETURNS {}", sql_type_name_of(sig.output_type))?;
        writeln!(f, "LANGUAGE {}", self.language)?;
        writeln!(f, "AS {}", tag)?;
        write!(f, "{}", self.body)?;
        writeln!(f, "return {}", self.call)?;
        writeln!(f, "{};", tag)
    }
}

/// Creates `func` in the database as a PL/Python routine and returns its signature.
///
/// Types cannot be inferred from the Python definition; both must be given.
/// A statement the server rejects comes back as `Error::RemoteExecution` and is not retried.
#[instrument(skip_all, fields(function = func.name()), err)]
pub fn deploy<C: Connection + ?Sized>(
    conn: &mut C,
    func: &PyFunction,
    input_types: Option<&[DataType]>,
    output_type: Option<DataType>,
    options: &DeployOptions,
) -> Result<FunctionSignature> {
    let input_types = input_types
        .ok_or_else(|| Error::Unsupported(String::from("inferring input types")))?;
    let output_type =
        output_type.ok_or_else(|| Error::Unsupported(String::from("inferring output type")))?;
    let definition = RemoteDefinition::build(func, input_types, output_type, options)?;
    let statement = definition.to_string();
    trace!(%statement, "creating function");
    conn.execute(&statement)?;
    info!(signature = %definition.signature, replace = options.replace, "created function");
    Ok(definition.signature)
}

#[cfg(test)]
const MULT_A_B: &str = "\
def mult_a_b(a, b):
    \"\"\"Test function to be defined in-database as a UDF\"\"\"
    return a * b
";

#[test]
fn test_render_definition() {
    let func = PyFunction::parse(MULT_A_B).unwrap();
    let def = RemoteDefinition::build(
        &func,
        &[DataType::Int32, DataType::Int32],
        DataType::Int32,
        &DeployOptions::new().schema("udf_test").replace(true),
    )
    .unwrap();
    let expected = "\
CREATE OR REPLACE FUNCTION udf_test.mult_a_b(a INTEGER, b INTEGER)
RETURNS INTEGER
LANGUAGE plpython3u
AS $$
def mult_a_b(a, b):
    \"\"\"Test function to be defined in-database as a UDF\"\"\"
    return a * b
return mult_a_b(a, b)
$$;
";
    assert_eq!(def.to_string(), expected);
}

#[test]
fn test_render_definition_variants() {
    struct Case {
        desc: &'static str,
        source: &'static str,
        input_types: Vec<DataType>,
        output_type: DataType,
        options: DeployOptions,
        expected: &'static str,
    }
    let cases = vec![
        Case {
            desc: "no replace, no schema, renamed, decorated and indented",
            source: "    @staticmethod\n    def pylen(x):\n        return len(x)",
            input_types: vec![DataType::String],
            output_type: DataType::Int64,
            options: DeployOptions::new().name("py_len"),
            expected: "CREATE FUNCTION py_len(x VARCHAR)\nRETURNS BIGINT\nLANGUAGE plpython3u\nAS $$\ndef pylen(x):\n    return len(x)\nreturn pylen(x)\n$$;\n",
        },
        Case {
            desc: "keyword-only parameter and legacy language",
            source: "def f(a, *, scale):\n    return a * scale\n",
            input_types: vec![DataType::Float64, DataType::Float64],
            output_type: DataType::Float64,
            options: DeployOptions::new().language(Language::PlPythonU),
            expected: "CREATE FUNCTION f(a DOUBLE PRECISION, scale DOUBLE PRECISION)\nRETURNS DOUBLE PRECISION\nLANGUAGE plpythonu\nAS $$\ndef f(a, *, scale):\n    return a * scale\nreturn f(a, scale=scale)\n$$;\n",
        },
        Case {
            desc: "body containing the default dollar quote",
            source: "def cost(x):\n    return '$$' + str(x)\n",
            input_types: vec![DataType::Decimal],
            output_type: DataType::String,
            options: DeployOptions::new(),
            expected: "CREATE FUNCTION cost(x NUMERIC)\nRETURNS VARCHAR\nLANGUAGE plpython3u\nAS $pgudf$\ndef cost(x):\n    return '$$' + str(x)\nreturn cost(x)\n$pgudf$;\n",
        },
        Case {
            desc: "reserved parameter name",
            source: "def greet(user: str) -> str:\n    return 'hi ' + user\n",
            input_types: vec![DataType::String],
            output_type: DataType::String,
            options: DeployOptions::new().schema("Mixed"),
            expected: "CREATE FUNCTION \"Mixed\".greet(\"user\" VARCHAR)\nRETURNS VARCHAR\nLANGUAGE plpython3u\nAS $$\ndef greet(user: str) -> str:\n    return 'hi ' + user\nreturn greet(user)\n$$;\n",
        },
        Case {
            desc: "parameters named like argument modes",
            source: "def f(out, variadic):\n    return out + variadic\n",
            input_types: vec![DataType::Int32, DataType::Int32],
            output_type: DataType::Int32,
            options: DeployOptions::new(),
            expected: "CREATE FUNCTION f(\"out\" INTEGER, \"variadic\" INTEGER)\nRETURNS INTEGER\nLANGUAGE plpython3u\nAS $$\ndef f(out, variadic):\n    return out + variadic\nreturn f(out, variadic)\n$$;\n",
        },
    ];
    for case in cases {
        println!("Running case: {}", case.desc);
        let func = PyFunction::parse(case.source).unwrap();
        let def =
            RemoteDefinition::build(&func, &case.input_types, case.output_type, &case.options)
                .unwrap();
        assert_eq!(def.to_string(), case.expected);
    }
}

#[test]
fn test_build_rejects_bad_definitions() {
    let cases = vec![
        ("def f(a, b):\n    return a\n", vec![DataType::Int32]),
        ("def f(a):\n    return a\n", vec![DataType::Int32, DataType::Int32]),
        ("def f(*args):\n    return 1\n", vec![DataType::Int32]),
        ("def f(a, **kw):\n    return 1\n", vec![DataType::Int32]),
        ("async def f(a):\n    return a\n", vec![DataType::Int32]),
    ];
    for case in cases {
        println!("Case: {:?}", case.0);
        let func = PyFunction::parse(case.0).unwrap();
        let actual = RemoteDefinition::build(&func, &case.1, DataType::Int32, &DeployOptions::new());
        assert!(matches!(actual, Err(Error::Configuration(_))));
    }
}

use pgudf::connection::{self, Row};
use pgudf::{
    compile, existing_udf, func_to_udf, strip_decorators, Connection, Constant, DataType,
    DeployOptions, Error, Expr, PyFunction, Table, UdfClient,
};
use std::collections::HashSet;

/// Records statements and tracks created functions the way PostgreSQL does:
/// creating an existing function without `OR REPLACE` fails with SQLSTATE 42723.
#[derive(Default)]
struct FakePostgres {
    statements: Vec<String>,
    functions: HashSet<String>,
}

impl Connection for FakePostgres {
    fn execute(&mut self, statement: &str) -> Result<u64, connection::Error> {
        let (replace, rest) = if let Some(rest) = statement.strip_prefix("CREATE OR REPLACE FUNCTION ") {
            (true, rest)
        } else if let Some(rest) = statement.strip_prefix("CREATE FUNCTION ") {
            (false, rest)
        } else {
            return Err(connection::Error::with_code(
                "42601",
                format!("syntax error at or near \"{}\"", statement),
            ));
        };
        let name = rest.split('(').next().unwrap_or_default().to_string();
        if !self.functions.insert(name.clone()) && !replace {
            return Err(connection::Error::with_code(
                "42723",
                format!("function \"{}\" already exists with same argument types", name),
            ));
        }
        self.statements.push(String::from(statement));
        Ok(0)
    }

    fn query(&mut self, statement: &str) -> Result<Vec<Row>, connection::Error> {
        self.statements.push(String::from(statement));
        Ok(vec![])
    }
}

fn users_table() -> Table {
    Table::new(
        Some("udf_test"),
        "udf_test_users",
        &[
            ("user_id", DataType::Int32),
            ("user_name", DataType::String),
            ("name_length", DataType::Int32),
        ],
    )
}

#[test]
fn test_remove_decorators() {
    let input = "\
@mydeco1(1, 3)
@mydeco2
@mydeco3(
    'dummy',
    5,
    None
)
def orig_func(x, y, z):
    return x * y + z
";
    let expected = "\
def orig_func(x, y, z):
    return x * y + z
";
    assert_eq!(strip_decorators(input).unwrap(), expected);
    assert_eq!(strip_decorators(expected).unwrap(), expected);
}

#[test]
fn test_bind_existing_function() {
    let t = users_table();
    let custom_len = existing_udf(
        "custom_len",
        &[DataType::String],
        DataType::Int32,
        Some("udf_test"),
        None,
    )
    .unwrap();
    let mut items = t.all_columns();
    items.push(
        custom_len
            .call(vec![t.col("user_name").unwrap()])
            .unwrap()
            .name("custom_len"),
    );
    assert_eq!(
        compile(&t.select(items)).unwrap(),
        "SELECT user_id, user_name, name_length, udf_test.custom_len(user_name) AS custom_len FROM udf_test.udf_test_users"
    );
}

#[test]
fn test_same_name_registered_twice() {
    let t = users_table();
    let first = existing_udf(
        "twice_len",
        &[DataType::String],
        DataType::Int32,
        Some("udf_test"),
        None,
    )
    .unwrap();
    let second = existing_udf(
        "twice_len",
        &[DataType::String],
        DataType::Int64,
        Some("udf_test"),
        Some(vec![String::from("x")]),
    )
    .unwrap();
    assert_eq!(first.kind().id().as_str(), "twice_len_0");
    assert_eq!(second.kind().id().as_str(), "twice_len_1");
    for udf in [&first, &second] {
        let query = t.select(vec![udf.call(vec![t.col("user_name").unwrap()]).unwrap()]);
        assert_eq!(
            compile(&query).unwrap(),
            "SELECT udf_test.twice_len(user_name) FROM udf_test.udf_test_users"
        );
    }
}

#[test]
fn test_mismatched_parameter_names() {
    let actual = existing_udf(
        "mismatched_names",
        &[DataType::String],
        DataType::Int32,
        None,
        Some(vec![String::from("a"), String::from("b")]),
    );
    match actual {
        Err(Error::Configuration(msg)) => assert_eq!(
            msg,
            "Length mismatch in arguments to mismatched_names: len(input_types)=1, len(parameters)=2"
        ),
        other => panic!("expected configuration error, got {:?}", other),
    }
    assert_eq!(pgudf::node::kind_count("mismatched_names"), 0);
}

#[test_log::test]
fn test_func_to_udf_smoke() {
    let mut conn = FakePostgres::default();
    let func = PyFunction::parse(
        "def mult_a_b(a, b):\n    \"\"\"Test function to be defined in-database as a UDF\n    and used via a UDF node\"\"\"\n    return a * b\n",
    )
    .unwrap();
    let mult_a_b = func_to_udf(
        &mut conn,
        &func,
        Some(&[DataType::Int32, DataType::Int32][..]),
        Some(DataType::Int32),
        &DeployOptions::new().schema("udf_test").replace(true),
    )
    .unwrap();
    assert_eq!(
        conn.statements,
        vec![String::from(
            "CREATE OR REPLACE FUNCTION udf_test.mult_a_b(a INTEGER, b INTEGER)
RETURNS INTEGER
LANGUAGE plpython3u
AS $$
def mult_a_b(a, b):
    \"\"\"Test function to be defined in-database as a UDF
    and used via a UDF node\"\"\"
    return a * b
return mult_a_b(a, b)
$$;
"
        )]
    );

    let t = users_table();
    let query = t
        .select(vec![mult_a_b
            .call(vec![t.col("user_id").unwrap(), t.col("name_length").unwrap()])
            .unwrap()
            .name("mult_result")])
        .filter(t.col("user_id").unwrap().equals(Expr::from(Constant::Int(2))));
    assert_eq!(
        compile(&query).unwrap(),
        "SELECT udf_test.mult_a_b(user_id, name_length) AS mult_result FROM udf_test.udf_test_users WHERE (user_id = 2)"
    );
}

#[test_log::test]
fn test_client_udf_api() {
    let mut conn = FakePostgres::default();
    let multiply = conn
        .udf(
            "    @con.udf([dt.int32, dt.int32], dt.int32, schema='udf_test', replace=True)\n    def multiply(a, b):\n        return a * b\n",
            &[DataType::Int32, DataType::Int32],
            DataType::Int32,
            &DeployOptions::new().schema("udf_test").replace(true),
        )
        .unwrap();
    assert_eq!(conn.statements.len(), 1);
    assert!(conn.statements[0].contains("AS $$\ndef multiply(a, b):\n    return a * b\nreturn multiply(a, b)\n$$;"));
    assert!(!conn.statements[0].contains("@con"));
    assert_eq!(multiply.signature().parameter_names(), vec!["a", "b"]);
}

#[test_log::test]
fn test_replace_semantics() {
    let mut conn = FakePostgres::default();
    let source = "def replaced_fn(x):\n    return x + 1\n";
    let replace = DeployOptions::new().schema("udf_test").replace(true);
    let first = conn
        .udf(source, &[DataType::Int64], DataType::Int64, &replace)
        .unwrap();
    let second = conn
        .udf(source, &[DataType::Int64], DataType::Int64, &replace)
        .unwrap();
    assert_ne!(first.kind().id(), second.kind().id());
    assert_eq!(conn.statements.len(), 2);

    let no_replace = DeployOptions::new().schema("udf_test");
    match conn.udf(source, &[DataType::Int64], DataType::Int64, &no_replace) {
        Err(Error::RemoteExecution(e)) => assert_eq!(e.code.as_deref(), Some("42723")),
        other => panic!("expected remote execution error, got {:?}", other),
    }
    assert_eq!(conn.statements.len(), 2);
    assert_eq!(pgudf::node::kind_count("replaced_fn"), 2);
}

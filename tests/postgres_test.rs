//! End-to-end tests against a live server. Set `PGUDF_TEST_DATABASE_URL` to run them;
//! the server needs the `plpython3u` extension available.
#![cfg(feature = "postgres")]

use pgudf::connection::Row;
use pgudf::pg::PgConnection;
use pgudf::sql_value::SqlValue;
use pgudf::{
    compile, existing_udf, Connection, Constant, DataType, DeployOptions, Error, Expr, Table,
    UdfClient,
};

const DATABASE_URL_VAR: &str = "PGUDF_TEST_DATABASE_URL";

/// Connects and creates `schema` with the users table, or returns `None` when no server is configured.
fn setup(schema: &str) -> Option<(PgConnection, Table)> {
    let url = match std::env::var(DATABASE_URL_VAR) {
        Ok(url) => url,
        Err(_) => {
            println!("{} not set, skipping", DATABASE_URL_VAR);
            return None;
        }
    };
    let mut conn = PgConnection::connect(&url).unwrap();
    conn.execute(&format!(
        "CREATE EXTENSION IF NOT EXISTS plpython3u;
DROP SCHEMA IF EXISTS {schema} CASCADE;
CREATE SCHEMA {schema};
CREATE TABLE {schema}.udf_test_users (
    user_id integer,
    user_name varchar,
    name_length integer
);
INSERT INTO {schema}.udf_test_users VALUES
(1, 'Raj', 3),
(2, 'Judy', 4),
(3, 'Jonathan', 8);
CREATE OR REPLACE FUNCTION {schema}.custom_len(x varchar)
RETURNS integer
LANGUAGE SQL
AS
$$
SELECT length(x);
$$;"
    ))
    .unwrap();
    let table = Table::new(
        Some(schema),
        "udf_test_users",
        &[
            ("user_id", DataType::Int32),
            ("user_name", DataType::String),
            ("name_length", DataType::Int32),
        ],
    );
    Some((conn, table))
}

fn teardown(mut conn: PgConnection, schema: &str) {
    conn.execute(&format!("DROP SCHEMA IF EXISTS {schema} CASCADE"))
        .unwrap();
    conn.close().unwrap();
}

fn ints(rows: &[Row], column: usize) -> Vec<i64> {
    rows.iter()
        .map(|r| *r.items[column].as_int().unwrap())
        .collect()
}

#[test_log::test]
fn test_sql_length_udf_worked() {
    let schema = "pgudf_test_existing";
    let Some((mut conn, t)) = setup(schema) else {
        return;
    };
    let custom_len =
        existing_udf("custom_len", &[DataType::String], DataType::Int32, Some(schema), None)
            .unwrap();
    let query = t.select(vec![
        t.col("name_length").unwrap(),
        custom_len
            .call(vec![t.col("user_name").unwrap()])
            .unwrap()
            .name("custom_len"),
    ]);
    let rows = conn
        .query(&format!("{} ORDER BY 1", compile(&query).unwrap()))
        .unwrap();
    assert_eq!(ints(&rows, 1), vec![3, 4, 8]);
    assert_eq!(ints(&rows, 0), ints(&rows, 1));
    teardown(conn, schema);
}

#[test_log::test]
fn test_func_to_udf_smoke() {
    let schema = "pgudf_test_deploy";
    let Some((mut conn, t)) = setup(schema) else {
        return;
    };
    let mult_a_b = conn
        .udf(
            "@some_decorator\ndef mult_a_b(a, b):\n    \"\"\"Multiplies in the database\"\"\"\n    return a * b\n",
            &[DataType::Int32, DataType::Int32],
            DataType::Int32,
            &DeployOptions::new().schema(schema).replace(true),
        )
        .unwrap();
    let query = t
        .select(vec![mult_a_b
            .call(vec![t.col("user_id").unwrap(), t.col("name_length").unwrap()])
            .unwrap()
            .name("mult_result")])
        .filter(t.col("user_id").unwrap().equals(Expr::from(Constant::Int(2))));
    let rows = conn.query(&compile(&query).unwrap()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].items[0], SqlValue::Int(8));
    teardown(conn, schema);
}

#[test_log::test]
fn test_replace_semantics() {
    let schema = "pgudf_test_replace";
    let Some((mut conn, _)) = setup(schema) else {
        return;
    };
    let source = "def plus_one(x):\n    return x + 1\n";
    let replace = DeployOptions::new().schema(schema).replace(true);
    conn.udf(source, &[DataType::Int64], DataType::Int64, &replace)
        .unwrap();
    conn.udf(source, &[DataType::Int64], DataType::Int64, &replace)
        .unwrap();
    match conn.udf(
        source,
        &[DataType::Int64],
        DataType::Int64,
        &DeployOptions::new().schema(schema),
    ) {
        Err(Error::RemoteExecution(e)) => assert_eq!(e.code.as_deref(), Some("42723")),
        other => panic!("expected remote execution error, got {:?}", other),
    }
    let rows = conn
        .query(&format!("SELECT {schema}.plus_one(41)"))
        .unwrap();
    assert_eq!(rows[0].items[0], SqlValue::Int(42));
    teardown(conn, schema);
}

#[test_log::test]
fn test_decimal_round_trip() {
    let schema = "pgudf_test_decimal";
    let Some((mut conn, _)) = setup(schema) else {
        return;
    };
    conn.udf(
        "def halve(x):\n    return x / 2\n",
        &[DataType::Decimal],
        DataType::Decimal,
        &DeployOptions::new().schema(schema).replace(true),
    )
    .unwrap();
    let rows = conn
        .query(&format!("SELECT {schema}.halve(5.0)"))
        .unwrap();
    assert_eq!(
        rows[0].items[0],
        SqlValue::Decimal(rust_decimal::Decimal::new(25, 1))
    );
    teardown(conn, schema);
}

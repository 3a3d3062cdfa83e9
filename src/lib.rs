//! Registers Python functions as PostgreSQL PL/Python user-defined functions and makes
//! them callable from query expressions.
//!
//! ```no_run
//! use pgudf::{Connection, DataType, DeployOptions, Expr, UdfClient};
//!
//! fn product(conn: &mut impl Connection) -> pgudf::Result<Expr> {
//!     let mult = conn.udf(
//!         "def mult_a_b(a, b):\n    return a * b\n",
//!         &[DataType::Int32, DataType::Int32],
//!         DataType::Int32,
//!         &DeployOptions::new().schema("udf_test").replace(true),
//!     )?;
//!     mult.call(vec![
//!         Expr::column("user_id", DataType::Int32),
//!         Expr::column("name_length", DataType::Int32),
//!     ])
//! }
//! ```

pub mod catalog;
pub mod compiler;
pub mod connection;
pub mod datatype;
pub mod error;
pub mod expr;
pub mod node;
#[cfg(feature = "postgres")]
pub mod pg;
pub mod py_parser;
pub mod py_type;
pub mod remote;
pub mod signature;
pub mod source;
pub mod sql;
pub mod sql_type;
pub mod sql_value;
pub mod udf;

extern crate pest;
#[macro_use]
extern crate pest_derive;

pub use compiler::{compile, Query, Table};
pub use connection::Connection;
pub use datatype::DataType;
pub use error::{Error, Result};
pub use expr::{Constant, Expr, Op};
pub use remote::{DeployOptions, Language};
pub use signature::FunctionSignature;
pub use source::{strip_decorators, PyFunction};
pub use udf::{existing_udf, func_to_udf, Udf, UdfClient};

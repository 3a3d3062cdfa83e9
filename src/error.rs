//! Errors surfaced by registration and deployment of user-defined functions.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The caller's arguments do not describe a valid function, e.g. a parameter count mismatch.
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Not implemented: {0}")]
    Unsupported(String),
    /// The database rejected a statement. The connection's error is passed through unchanged.
    #[error("Remote execution failed: {0}")]
    RemoteExecution(#[from] crate::connection::Error),
    #[error("Unable to transform function source: {0}")]
    Transformation(#[from] crate::source::Error),
    /// A registered function was applied to arguments that do not fit its signature.
    #[error("Invalid argument: {0}")]
    Argument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

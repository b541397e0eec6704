//! Errors for query execution.

use query_engine_sql::sql::dialect::Dialect;
use query_engine_sql::sql::execution_plan::BindingError;
use thiserror::Error;

/// A backend answered, but not with rows of the agreed shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendContractError {
    #[error("unknown event data type tag {0}")]
    UnknownDataType(i64),
    #[error("row is missing field '{0}'")]
    MissingField(&'static str),
    #[error("total '{0}' is not a non-negative integer")]
    InvalidTotal(String),
    #[error("'{0}' is not a timestamp")]
    InvalidTimestamp(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Query execution errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Contract(#[from] BackendContractError),
    #[error("relational backend error: {0}")]
    Relational(#[from] sqlx::Error),
    #[error("columnar backend error: {0}")]
    Columnar(#[from] reqwest::Error),
    #[error("invalid columnar backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("columnar backend responded with status {status}: {body}")]
    ColumnarStatus { status: u16, body: String },
    #[error("internal error: {0}")]
    Binding(#[from] BindingError),
    #[error("a {found:?} query cannot run on the {expected:?} backend")]
    DialectMismatch { expected: Dialect, found: Dialect },
}

//! Errors for query translation.

use query_engine_sql::sql::execution_plan::BindingError;
use query_engine_sql::sql::string::ParamError;

use super::filters::{FilterKind, FilterOperator};

/// Malformed filter input. These are the caller's mistakes, not backend faults.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterValidationError {
    #[error("start date {start} is after end date {end}")]
    StartAfterEnd { start: String, end: String },
    #[error("unknown filter '{0}'")]
    UnknownFilterKind(String),
    #[error("filter '{kind}' does not support operator '{operator}' with a list of values")]
    UnsupportedOperator {
        kind: FilterKind,
        operator: FilterOperator,
    },
    #[error("a property name is required")]
    MissingPropertyName,
}

/// A type for translation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    FilterValidation(#[from] FilterValidationError),
    /// The generated text and parameters disagree; a bug in a template or the compiler.
    #[error("internal error: {0}")]
    Binding(#[from] BindingError),
    #[error("internal error: {0}")]
    Param(#[from] ParamError),
}

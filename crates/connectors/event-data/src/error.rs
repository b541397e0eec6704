//! The errors a query can end in.

use thiserror::Error;

use query_engine_execution::error::{BackendContractError, Error as ExecutionError};
use query_engine_translation::translation::error::{
    Error as TranslationError, FilterValidationError,
};

/// Why an event data values query failed.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The caller sent filters we cannot compile. Nothing was executed.
    #[error("invalid filters: {0}")]
    FilterValidation(#[from] FilterValidationError),
    /// The backend answered with rows we do not understand.
    #[error("backend contract violated: {0}")]
    BackendContract(#[from] BackendContractError),
    /// The backend could not be reached or rejected the query.
    #[error("backend error: {0}")]
    Backend(ExecutionError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TranslationError> for QueryError {
    fn from(err: TranslationError) -> Self {
        match err {
            TranslationError::FilterValidation(err) => QueryError::FilterValidation(err),
            TranslationError::Binding(_) | TranslationError::Param(_) => {
                QueryError::Internal(err.to_string())
            }
        }
    }
}

impl From<ExecutionError> for QueryError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::Contract(err) => QueryError::BackendContract(err),
            ExecutionError::Binding(_) | ExecutionError::DialectMismatch { .. } => {
                QueryError::Internal(err.to_string())
            }
            ExecutionError::Relational(_)
            | ExecutionError::Columnar(_)
            | ExecutionError::ColumnarStatus { .. }
            | ExecutionError::InvalidUrl(_) => QueryError::Backend(err),
        }
    }
}

//! Errors that can be thrown when processing configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::environment;
use crate::values::DatabaseType;

/// The errors that can be thrown when reading the configuration file.
#[derive(Debug, Error)]
pub enum ParseConfigurationError {
    #[error("parse error on {file_path}:{line}:{column}: {message}")]
    ParseError {
        file_path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },
    #[error("unsupported configuration version {found} in {file_path}, expected 1")]
    UnsupportedVersion { file_path: PathBuf, found: u32 },

    #[error("I/O error: {0}")]
    IoErrorButStringified(String),
}

/// The errors that can be thrown when writing the configuration file.
#[derive(Debug, Error)]
pub enum WriteParsedConfigurationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// The backend identity or its connection details could not be established.
///
/// These are startup errors: a process with an invalid configuration never serves a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("no backend selected: set `backend` or provide a database or ClickHouse connection URI")]
    BackendUnset,
    #[error(transparent)]
    UnknownBackend(#[from] crate::values::UnknownDatabaseType),
    #[error("missing connection URI for the {backend} backend: {source}")]
    MissingConnectionUri {
        backend: DatabaseType,
        source: environment::Error,
    },
    #[error("invalid environment for {setting}: {source}")]
    Environment {
        setting: &'static str,
        source: environment::Error,
    },
    #[error("empty connection URI for the {0} backend")]
    EmptyConnectionUri(DatabaseType),
}

//! Configuration for the event data query core.

use crate::values::{DatabaseName, DatabaseType, PoolSettings};

/// The 'Configuration' type collects all the information necessary to serve queries at runtime.
///
/// 'ParsedConfiguration' is the serialized format; values of this type are produced from it using
/// 'make_runtime_configuration', which resolves secrets and fixes the backend identity. The
/// backend identity never changes for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub backend: BackendConfiguration,
}

impl Configuration {
    pub fn database_type(&self) -> DatabaseType {
        self.backend.database_type()
    }
}

/// The selected backend, with everything needed to connect to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfiguration {
    Postgresql {
        connection_uri: String,
        pool_settings: PoolSettings,
    },
    Clickhouse(ClickHouseConfiguration),
}

impl BackendConfiguration {
    pub fn database_type(&self) -> DatabaseType {
        match self {
            BackendConfiguration::Postgresql { .. } => DatabaseType::Postgresql,
            BackendConfiguration::Clickhouse(_) => DatabaseType::Clickhouse,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickHouseConfiguration {
    pub url: String,
    pub database: DatabaseName,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Seconds, if requests are limited at all.
    pub request_timeout: Option<u64>,
}

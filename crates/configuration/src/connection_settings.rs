//! Database connection settings.

use crate::values::{ConnectionUri, DatabaseName, PoolSettings, Secret};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATABASE_URL_VARIABLE: &str = "DATABASE_URL";
pub const DEFAULT_CLICKHOUSE_URL_VARIABLE: &str = "CLICKHOUSE_URL";
pub const DEFAULT_CLICKHOUSE_USER_VARIABLE: &str = "CLICKHOUSE_USER";
pub const DEFAULT_CLICKHOUSE_PASSWORD_VARIABLE: &str = "CLICKHOUSE_PASSWORD";

/// Connection settings for the relational backend.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConnectionSettings {
    /// Connection string for a Postgres-compatible database.
    pub connection_uri: ConnectionUri,
    #[serde(skip_serializing_if = "PoolSettings::is_default")]
    #[serde(default)]
    pub pool_settings: PoolSettings,
}

impl DatabaseConnectionSettings {
    pub fn empty() -> Self {
        Self {
            connection_uri: ConnectionUri(Secret::FromEnvironment {
                variable: DEFAULT_DATABASE_URL_VARIABLE.into(),
            }),
            pool_settings: PoolSettings::default(),
        }
    }
}

/// Connection settings for the columnar backend.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClickHouseConnectionSettings {
    /// Base URL of the ClickHouse HTTP interface, e.g. `http://localhost:8123`.
    pub url: ConnectionUri,
    /// Database containing the `event_data` table.
    #[serde(default)]
    pub database: DatabaseName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
    /// Give up on a request after this many seconds. Without it only the server's own limits
    /// apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
}

impl ClickHouseConnectionSettings {
    pub fn empty() -> Self {
        Self {
            url: ConnectionUri(Secret::FromEnvironment {
                variable: DEFAULT_CLICKHOUSE_URL_VARIABLE.into(),
            }),
            database: DatabaseName::default(),
            user: Some(Secret::FromEnvironment {
                variable: DEFAULT_CLICKHOUSE_USER_VARIABLE.into(),
            }),
            password: Some(Secret::FromEnvironment {
                variable: DEFAULT_CLICKHOUSE_PASSWORD_VARIABLE.into(),
            }),
            request_timeout: None,
        }
    }
}

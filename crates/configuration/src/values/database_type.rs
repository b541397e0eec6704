use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The two storage backends able to answer event data queries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// The relational row store, reached through a PostgreSQL connection pool.
    #[serde(alias = "postgres")]
    #[value(alias = "postgres")]
    Postgresql,
    /// The columnar store, reached through the ClickHouse HTTP interface.
    Clickhouse,
}

impl DatabaseType {
    pub fn name(self) -> &'static str {
        match self {
            DatabaseType::Postgresql => "postgresql",
            DatabaseType::Clickhouse => "clickhouse",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown backend '{0}', expected one of 'postgresql' or 'clickhouse'")]
pub struct UnknownDatabaseType(pub String);

impl FromStr for DatabaseType {
    type Err = UnknownDatabaseType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(DatabaseType::Postgresql),
            "clickhouse" => Ok(DatabaseType::Clickhouse),
            _ => Err(UnknownDatabaseType(value.to_string())),
        }
    }
}

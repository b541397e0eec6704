use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Secret;

/// Where to reach a backend: a `postgresql://` connection string or a ClickHouse HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct ConnectionUri(pub Secret);

impl From<String> for ConnectionUri {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl From<&str> for ConnectionUri {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

/// The ClickHouse database holding the `event_data` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct DatabaseName(pub String);

impl Default for DatabaseName {
    fn default() -> Self {
        Self("umami".to_string())
    }
}

impl std::fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let DatabaseName(name) = self;
        write!(f, "{name}")
    }
}

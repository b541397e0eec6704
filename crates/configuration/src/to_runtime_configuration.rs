//! Convert a parsed configuration into the runtime configuration, fixing the backend identity.

use crate::configuration::{BackendConfiguration, ClickHouseConfiguration, Configuration};
use crate::environment::{self, Environment};
use crate::error::ConfigurationError;
use crate::values::{ConnectionUri, DatabaseType, Secret};
use crate::version1::ParsedConfiguration;

/// Resolve secrets and select the backend.
///
/// An explicit `backend` wins. Otherwise ClickHouse is selected when its URL resolves, then
/// PostgreSQL when the database URL resolves; with neither the configuration is rejected.
pub fn make_runtime_configuration(
    parsed_config: ParsedConfiguration,
    environment: impl Environment,
) -> Result<Configuration, ConfigurationError> {
    let database_type = match parsed_config.backend.as_deref() {
        Some(name) => name.parse::<DatabaseType>()?,
        None => infer_database_type(&parsed_config, &environment)?,
    };

    let backend = match database_type {
        DatabaseType::Postgresql => BackendConfiguration::Postgresql {
            connection_uri: resolve_connection_uri(
                database_type,
                &parsed_config.database.connection_uri,
                &environment,
            )?,
            pool_settings: parsed_config.database.pool_settings,
        },
        DatabaseType::Clickhouse => {
            let settings = parsed_config.clickhouse;
            BackendConfiguration::Clickhouse(ClickHouseConfiguration {
                url: resolve_connection_uri(database_type, &settings.url, &environment)?,
                database: settings.database,
                user: resolve_optional("clickhouse.user", settings.user.as_ref(), &environment)?,
                password: resolve_optional(
                    "clickhouse.password",
                    settings.password.as_ref(),
                    &environment,
                )?,
                request_timeout: settings.request_timeout,
            })
        }
    };

    tracing::info!(backend = %database_type, "selected event data backend");

    Ok(Configuration { backend })
}

fn infer_database_type(
    parsed_config: &ParsedConfiguration,
    environment: &impl Environment,
) -> Result<DatabaseType, ConfigurationError> {
    let resolves = |ConnectionUri(secret): &ConnectionUri| {
        resolve(secret, environment).is_ok_and(|value| !value.trim().is_empty())
    };

    if resolves(&parsed_config.clickhouse.url) {
        Ok(DatabaseType::Clickhouse)
    } else if resolves(&parsed_config.database.connection_uri) {
        Ok(DatabaseType::Postgresql)
    } else {
        Err(ConfigurationError::BackendUnset)
    }
}

fn resolve(secret: &Secret, environment: &impl Environment) -> Result<String, environment::Error> {
    match secret {
        Secret::Plain(value) => Ok(value.clone()),
        Secret::FromEnvironment { variable } => environment.read(variable),
    }
}

fn resolve_connection_uri(
    backend: DatabaseType,
    ConnectionUri(secret): &ConnectionUri,
    environment: &impl Environment,
) -> Result<String, ConfigurationError> {
    let uri = resolve(secret, environment)
        .map_err(|source| ConfigurationError::MissingConnectionUri { backend, source })?;
    if uri.trim().is_empty() {
        return Err(ConfigurationError::EmptyConnectionUri(backend));
    }
    Ok(uri)
}

/// Optional secrets that point at an unset variable resolve to nothing.
fn resolve_optional(
    setting: &'static str,
    secret: Option<&Secret>,
    environment: &impl Environment,
) -> Result<Option<String>, ConfigurationError> {
    match secret.map(|secret| resolve(secret, environment)) {
        None | Some(Err(environment::Error::VariableNotPresent(_))) => Ok(None),
        Some(Ok(value)) => Ok(Some(value)),
        Some(Err(source)) => Err(ConfigurationError::Environment { setting, source }),
    }
}

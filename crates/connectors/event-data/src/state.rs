//! Transient state used by the connector.
//!
//! This is initialized on startup.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;
use tracing::{info_span, Instrument};

use event_data_configuration::{
    BackendConfiguration, ClickHouseConfiguration, Configuration, PoolSettings,
};
use query_engine_execution::columnar::{ClickHouseClient, ClickHouseConnection};
use query_engine_execution::metrics;

/// State for our connector.
#[derive(Debug, Clone)]
pub struct State {
    pub metrics: metrics::Metrics,
    pub backend: Backend,
}

/// The backend serving every query of this process, chosen once from the configuration.
#[derive(Debug, Clone)]
pub enum Backend {
    Relational(PgPool),
    Columnar(ClickHouseClient),
}

/// Connect to the configured backend and wrap it inside a connector State.
pub async fn create_state(
    configuration: &Configuration,
    metrics_registry: &mut prometheus::Registry,
) -> Result<State, InitializationError> {
    let metrics = async {
        metrics::Metrics::initialize(metrics_registry).map_err(InitializationError::MetricsError)
    }
    .instrument(info_span!("Setup metrics"))
    .await?;

    let backend = match &configuration.backend {
        BackendConfiguration::Postgresql {
            connection_uri,
            pool_settings,
        } => {
            let pool = create_pool(connection_uri, pool_settings)
                .instrument(info_span!("Create connection pool"))
                .await?;
            metrics.set_pool_options_metrics(pool.options());
            Backend::Relational(pool)
        }
        BackendConfiguration::Clickhouse(clickhouse) => {
            Backend::Columnar(create_client(clickhouse)?)
        }
    };

    Ok(State { metrics, backend })
}

/// Create a connection pool with the configured settings.
/// - <https://docs.rs/sqlx/latest/sqlx/pool/struct.PoolOptions.html>
async fn create_pool(
    connection_uri: &str,
    pool_settings: &PoolSettings,
) -> Result<PgPool, InitializationError> {
    PgPoolOptions::new()
        .max_connections(pool_settings.max_connections)
        .acquire_timeout(Duration::from_secs(pool_settings.pool_timeout))
        .idle_timeout(pool_settings.idle_timeout.map(Duration::from_secs))
        .max_lifetime(pool_settings.connection_lifetime.map(Duration::from_secs))
        .connect(connection_uri)
        .await
        .map_err(InitializationError::UnableToCreatePool)
}

fn create_client(
    clickhouse: &ClickHouseConfiguration,
) -> Result<ClickHouseClient, InitializationError> {
    ClickHouseClient::new(ClickHouseConnection {
        url: clickhouse.url.clone(),
        database: clickhouse.database.to_string(),
        user: clickhouse.user.clone(),
        password: clickhouse.password.clone(),
        request_timeout: clickhouse.request_timeout.map(Duration::from_secs),
    })
    .map_err(InitializationError::UnableToCreateClient)
}

/// State initialization error.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("unable to initialize connection pool: {0}")]
    UnableToCreatePool(sqlx::Error),
    #[error("unable to initialize columnar client: {0}")]
    UnableToCreateClient(query_engine_execution::error::Error),
    #[error("error initializing metrics: {0}")]
    MetricsError(metrics::Error),
}

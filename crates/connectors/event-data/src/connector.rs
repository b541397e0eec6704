//! Setting up the connector: reading its configuration and connecting to its backend.

use std::path::Path;

use thiserror::Error;
use tracing::{info_span, Instrument};

use event_data_configuration as configuration;
use event_data_configuration::environment::Environment;

use crate::state::{self, Backend, InitializationError, State};

/// Everything needed to turn a configuration directory into a running connector.
pub struct EventDataSetup<Env: Environment> {
    environment: Env,
    backend: Option<configuration::DatabaseType>,
}

impl<Env: Environment> EventDataSetup<Env> {
    pub fn new(environment: Env) -> Self {
        Self {
            environment,
            backend: None,
        }
    }

    /// Select the backend regardless of what the configuration file says.
    #[must_use]
    pub fn with_backend(mut self, backend: Option<configuration::DatabaseType>) -> Self {
        self.backend = backend;
        self
    }

    /// Read and validate the configuration in `configuration_dir`, fixing the backend.
    pub async fn parse_configuration(
        &self,
        configuration_dir: impl AsRef<Path> + Send,
    ) -> Result<configuration::Configuration, SetupError> {
        // Validation errors are part of normal operation, so they are returned, not logged.
        let mut parsed_configuration = configuration::parse_configuration(configuration_dir)
            .instrument(info_span!("parse configuration"))
            .await?;
        if let Some(backend) = self.backend {
            parsed_configuration.backend = Some(backend.to_string());
        }

        let runtime_configuration =
            configuration::make_runtime_configuration(parsed_configuration, &self.environment)?;

        Ok(runtime_configuration)
    }

    /// Initialize the connector's in-memory state.
    pub async fn try_init_state(
        &self,
        configuration: &configuration::Configuration,
        metrics: &mut prometheus::Registry,
    ) -> Result<State, SetupError> {
        state::create_state(configuration, metrics)
            .instrument(info_span!("Initialise state"))
            .await
            .map_err(|err| {
                tracing::error!(
                    meta.signal_type = "log",
                    event.domain = "event_data",
                    event.name = "Initialization error",
                    name = "Initialization error",
                    body = %err,
                    error = true,
                );
                SetupError::Initialization(err)
            })
    }
}

/// Update any metrics from the state
///
/// Some metrics are updated directly when a query runs. This is for the ones that must be
/// polled, such as the number of idle connections in the pool.
pub fn fetch_metrics(state: &State) {
    if let Backend::Relational(pool) = &state.backend {
        state.metrics.update_pool_metrics(pool);
    }
}

/// Errors raised while setting up the connector. All of them are fatal.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    ParseConfiguration(#[from] configuration::error::ParseConfigurationError),
    #[error("configuration error: {0}")]
    Configuration(#[from] configuration::ConfigurationError),
    #[error(transparent)]
    Initialization(InitializationError),
}

//! Health check for the connector.

use query_engine_execution::error::Error;
use query_engine_execution::relational;

use crate::state::{Backend, State};

/// Check that the configured backend is reachable and answering.
pub async fn health_check(state: &State) -> Result<(), Error> {
    match &state.backend {
        Backend::Relational(pool) => relational::health_check(pool).await,
        Backend::Columnar(client) => client.health_check().await,
    }
}

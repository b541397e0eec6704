//! Answer an event data values query with the backend this process was configured with.

use sqlx::postgres::PgPool;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use query_engine_execution::columnar::ClickHouseClient;
use query_engine_execution::metrics::Metrics;
use query_engine_execution::normalize::{self, EventDataValueRow};
use query_engine_execution::relational;
use query_engine_sql::sql::dialect::Dialect;
use query_engine_sql::sql::execution_plan::Query;
use query_engine_translation::translation::filters::QueryFilters;
use query_engine_translation::translation::query::event_data_values::{self, ROW_LIMIT};

use crate::error::QueryError;
use crate::state::{Backend, State};

/// The distinct values of `filters.property_name` recorded for a website within the date range,
/// with how often each occurred.
///
/// Exactly one backend pipeline runs per call. At most 500 rows are returned, ordered by total,
/// highest first.
pub async fn get_event_data_values(
    state: &State,
    website_id: Uuid,
    filters: &QueryFilters,
) -> Result<Vec<EventDataValueRow>, QueryError> {
    let result = match &state.backend {
        Backend::Relational(pool) => {
            relational_values(pool, &state.metrics, website_id, filters).await
        }
        Backend::Columnar(client) => columnar_values(client, website_id, filters).await,
    };

    match &result {
        Ok(rows) => {
            state.metrics.query_total.inc();
            tracing::info!(rows = rows.len(), "event data values query succeeded");
        }
        Err(QueryError::FilterValidation(err)) => {
            state.metrics.query_failure_total.inc();
            tracing::info!(body = %err, "event data values query rejected");
        }
        Err(err) => {
            state.metrics.query_failure_total.inc();
            tracing::error!(
                meta.signal_type = "log",
                event.domain = "event_data",
                event.name = "Query error",
                name = "Query error",
                body = %err,
                error = true,
            );
        }
    }

    result
}

async fn relational_values(
    pool: &PgPool,
    metrics: &Metrics,
    website_id: Uuid,
    filters: &QueryFilters,
) -> Result<Vec<EventDataValueRow>, QueryError> {
    let query = compile(Dialect::Postgresql, website_id, filters).await?;

    let rows = relational::execute(pool, &query)
        .instrument(info_span!("Execute query"))
        .await;
    metrics.update_pool_metrics(pool);

    let rows = async { normalize::normalize_relational_rows(rows?).map_err(QueryError::from) }
        .instrument(info_span!("Normalize rows"))
        .await?;

    Ok(rows)
}

async fn columnar_values(
    client: &ClickHouseClient,
    website_id: Uuid,
    filters: &QueryFilters,
) -> Result<Vec<EventDataValueRow>, QueryError> {
    let query = compile(Dialect::Clickhouse, website_id, filters).await?;

    let rows = client
        .execute(&query)
        .instrument(info_span!("Execute query"))
        .await?;

    let rows = async { normalize::normalize_columnar_rows(rows, ROW_LIMIT) }
        .instrument(info_span!("Normalize rows"))
        .await?;

    Ok(rows)
}

async fn compile(
    dialect: Dialect,
    website_id: Uuid,
    filters: &QueryFilters,
) -> Result<Query, QueryError> {
    async { event_data_values::translate(dialect, website_id, filters) }
        .instrument(info_span!("Compile filters"))
        .await
        .map_err(QueryError::from)
}

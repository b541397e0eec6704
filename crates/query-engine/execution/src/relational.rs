//! Execute queries against the relational backend.
//!
//! The driver binds parameters by position, so named placeholders are rewritten to `$n` before
//! the statement is sent. Each distinct name gets one position and one bound value.

use std::collections::HashMap;

use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::{info_span, Instrument};

use query_engine_sql::sql::dialect::Dialect;
use query_engine_sql::sql::execution_plan::{BindingError, Query};
use query_engine_sql::sql::string::Param;

use crate::error::{BackendContractError, Error};
use crate::normalize::RelationalRow;

/// A statement in the driver's positional form, with its values in position order.
#[derive(Debug, PartialEq, Eq)]
pub struct PositionalStatement<'a> {
    pub sql: String,
    pub params: Vec<&'a Param>,
}

/// Rewrite `{{name::type}}` placeholders into `$n::type`, numbering names by first appearance.
pub fn to_positional(query: &Query) -> Result<PositionalStatement<'_>, Error> {
    check_dialect(query)?;

    let text = query.sql();
    let mut sql = String::with_capacity(text.len());
    let mut params: Vec<&Param> = vec![];
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut copied = 0;

    for placeholder in Dialect::Postgresql.placeholders(text) {
        let position = match positions.get(placeholder.name) {
            Some(position) => *position,
            None => {
                let param = query.params().get(placeholder.name).ok_or_else(|| {
                    BindingError::UnboundPlaceholder(placeholder.name.to_string())
                })?;
                params.push(param);
                positions.insert(placeholder.name, params.len());
                params.len()
            }
        };

        sql.push_str(&text[copied..placeholder.span.start]);
        sql.push('$');
        sql.push_str(&position.to_string());
        if let Some(cast) = placeholder.type_annotation {
            sql.push_str("::");
            sql.push_str(cast);
        }
        copied = placeholder.span.end;
    }
    sql.push_str(&text[copied..]);

    Ok(PositionalStatement { sql, params })
}

/// Run an event data values query and return its rows as the database produced them.
pub async fn execute(pool: &PgPool, query: &Query) -> Result<Vec<RelationalRow>, Error> {
    let statement = to_positional(query)?;

    tracing::info!(
        generated_sql = %sqlformat::format(
            &statement.sql,
            &sqlformat::QueryParams::None,
            sqlformat::FormatOptions::default(),
        ),
        params = ?statement.params,
    );

    let sqlx_query = statement
        .params
        .iter()
        .fold(sqlx::query::<sqlx::Postgres>(&statement.sql), |sqlx_query, param| match param {
            Param::Uuid(uuid) => sqlx_query.bind(*uuid),
            Param::Timestamp(timestamp) => sqlx_query.bind(*timestamp),
            Param::String(string) => sqlx_query.bind(string.clone()),
            Param::StringArray(strings) => sqlx_query.bind(strings.clone()),
        });

    let rows = sqlx_query
        .fetch_all(pool)
        .instrument(info_span!("Database request"))
        .await?;

    rows.iter()
        .map(|row| {
            Ok(RelationalRow {
                value: row.try_get("value").map_err(malformed)?,
                total: row.try_get("total").map_err(malformed)?,
            })
        })
        .collect()
}

/// Check that the database answers a trivial query.
pub async fn health_check(pool: &PgPool) -> Result<(), Error> {
    let row = sqlx::query("select 1 as one").fetch_one(pool).await?;
    let one: i32 = row.try_get("one").map_err(malformed)?;
    if one == 1 {
        Ok(())
    } else {
        Err(
            BackendContractError::MalformedResponse(format!("health check returned {one}"))
                .into(),
        )
    }
}

fn check_dialect(query: &Query) -> Result<(), Error> {
    match query.dialect() {
        Dialect::Postgresql => Ok(()),
        found @ Dialect::Clickhouse => Err(Error::DialectMismatch {
            expected: Dialect::Postgresql,
            found,
        }),
    }
}

fn malformed(err: sqlx::Error) -> Error {
    BackendContractError::MalformedResponse(err.to_string()).into()
}

//! The distinct values of one event data property, with how often each occurred.

use uuid::Uuid;

use query_engine_sql::sql::dialect::Dialect;
use query_engine_sql::sql::execution_plan::Query;

use super::filtering::{parse_filters, CompiledFilter};
use crate::translation::error::{Error, FilterValidationError};
use crate::translation::filters::{FilterKind, QueryFilters};

/// Backends never return more distinct values than this. Callers must not assume completeness
/// beyond it.
pub const ROW_LIMIT: usize = 500;

const POSTGRESQL_SELECT: &str = r#"select
  event_data.string_value as "value",
  count(*) as "total"
from event_data"#;

const POSTGRESQL_JOIN_EVENT: &str =
    "\njoin website_event on website_event.event_id = event_data.website_event_id";

const POSTGRESQL_JOIN_SESSION: &str =
    "\njoin session on session.session_id = website_event.session_id";

const POSTGRESQL_WHERE: &str = r#"
where event_data.website_id = {{websiteId::uuid}}
  and event_data.created_at between {{startDate}} and {{endDate}}
"#;

const POSTGRESQL_GROUP_BY: &str = r#"
group by event_data.string_value
order by 2 desc"#;

// Rows are grouped on the display value: numbers without trailing zeros, dates truncated to
// the hour. The type tag is kept for the normalizer; a group mixing tags reports the highest.
const CLICKHOUSE_SELECT: &str = r#"select
  multiIf(data_type = 2 and position(string_value, '.') > 0, replaceRegexpOne(string_value, '\\.?0+$', ''),
          data_type = 4, toString(date_trunc('hour', date_value)),
          string_value) as "value",
  max(data_type) as "dataType",
  count(*) as "total"
from event_data
where website_id = {websiteId:UUID}
  and created_at between {startDate:DateTime64} and {endDate:DateTime64}
"#;

const CLICKHOUSE_GROUP_BY: &str = r#"
group by value
order by total desc"#;

/// Build the event data values query for `dialect`.
///
/// The lookup is always scoped to one property key: without a property name the request is
/// rejected before anything is compiled.
pub fn translate(
    dialect: Dialect,
    website_id: Uuid,
    filters: &QueryFilters,
) -> Result<Query, Error> {
    if filters.property_name().is_none() {
        return Err(FilterValidationError::MissingPropertyName.into());
    }

    let compiled = parse_filters(dialect, website_id, filters)?;
    compose(compiled)
}

/// Splice a compiled filter into the template of its dialect.
pub fn compose(compiled: CompiledFilter) -> Result<Query, Error> {
    let CompiledFilter {
        dialect,
        filter_query,
        params,
        kinds,
    } = compiled;

    let mut sql = String::new();
    match dialect {
        Dialect::Postgresql => {
            sql.push_str(POSTGRESQL_SELECT);
            push_relational_joins(&mut sql, &kinds);
            sql.push_str(POSTGRESQL_WHERE);
            sql.push_str(&filter_query);
            sql.push_str(POSTGRESQL_GROUP_BY);
        }
        Dialect::Clickhouse => {
            sql.push_str(CLICKHOUSE_SELECT);
            sql.push_str(&filter_query);
            sql.push_str(CLICKHOUSE_GROUP_BY);
        }
    }
    sql.push_str(&format!("\nlimit {ROW_LIMIT}"));

    Ok(Query::new(dialect, sql, params)?)
}

/// Event and session attributes live outside `event_data`; join their tables only when a
/// filter refers to them.
fn push_relational_joins(sql: &mut String, kinds: &[FilterKind]) {
    let needs_session = kinds
        .iter()
        .any(|kind| kind.relational_table() == "session");
    let needs_event = needs_session
        || kinds
            .iter()
            .any(|kind| kind.relational_table() == "website_event");

    if needs_event {
        sql.push_str(POSTGRESQL_JOIN_EVENT);
    }
    if needs_session {
        sql.push_str(POSTGRESQL_JOIN_SESSION);
    }
}

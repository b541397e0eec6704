//! Compile request filters into a WHERE fragment and its parameters.
//!
//! Both backends take the same input and share the clause ordering; only the predicate syntax
//! and placeholder grammar differ, and that difference is a single `match` on the dialect.

use uuid::Uuid;

use query_engine_sql::sql::dialect::Dialect;
use query_engine_sql::sql::string::{Param, ParameterSet, SQL};

use crate::translation::error::{Error, FilterValidationError};
use crate::translation::filters::{FilterKind, FilterOperator, FilterValue, QueryFilters};

pub const WEBSITE_ID: &str = "websiteId";
pub const START_DATE: &str = "startDate";
pub const END_DATE: &str = "endDate";
pub const PROPERTY_NAME: &str = "propertyName";

/// A predicate fragment to splice after an existing `where ... and`, and the full parameter set
/// of the query: the website and date range the surrounding template refers to, plus one entry
/// per placeholder in the fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFilter {
    pub dialect: Dialect,
    pub filter_query: String,
    pub params: ParameterSet,
    /// The kinds that produced a clause, in clause order.
    pub kinds: Vec<FilterKind>,
}

/// Compile `filters` for the relational backend.
pub fn parse_relational_filters(
    website_id: Uuid,
    filters: &QueryFilters,
) -> Result<CompiledFilter, Error> {
    parse_filters(Dialect::Postgresql, website_id, filters)
}

/// Compile `filters` for the columnar backend.
pub fn parse_columnar_filters(
    website_id: Uuid,
    filters: &QueryFilters,
) -> Result<CompiledFilter, Error> {
    parse_filters(Dialect::Clickhouse, website_id, filters)
}

pub fn parse_filters(
    dialect: Dialect,
    website_id: Uuid,
    filters: &QueryFilters,
) -> Result<CompiledFilter, Error> {
    filters.validate_date_range()?;
    let active = filters.resolve()?;

    let mut sql = SQL::new(dialect);
    sql.params.insert(WEBSITE_ID, Param::Uuid(website_id))?;
    sql.params
        .insert(START_DATE, Param::Timestamp(filters.start_date))?;
    sql.params.insert(END_DATE, Param::Timestamp(filters.end_date))?;

    if let Some(property_name) = filters.property_name() {
        start_clause(&mut sql);
        sql.append_syntax(&column(dialect, "event_data", "data_key"));
        sql.append_syntax(" = ");
        sql.append_param(PROPERTY_NAME, Param::String(property_name.to_string()))?;
    }

    let mut kinds = vec![];
    for kind in enum_iterator::all::<FilterKind>() {
        let Some(filter) = active.get(&kind) else {
            continue;
        };
        let Some(value) = filter.active_value() else {
            continue;
        };
        start_clause(&mut sql);
        write_predicate(&mut sql, kind, filter.operator, value)?;
        kinds.push(kind);
    }

    tracing::debug!(
        filter_query = %sql.sql,
        params = ?sql.params,
        "compiled filters"
    );

    Ok(CompiledFilter {
        dialect,
        filter_query: sql.sql,
        params: sql.params,
        kinds,
    })
}

fn start_clause(sql: &mut SQL) {
    if !sql.is_empty() {
        sql.append_syntax("\n");
    }
    sql.append_syntax("and ");
}

fn column(dialect: Dialect, table: &str, name: &str) -> String {
    match dialect {
        Dialect::Postgresql => format!("{table}.{name}"),
        Dialect::Clickhouse => name.to_string(),
    }
}

fn write_predicate(
    sql: &mut SQL,
    kind: FilterKind,
    operator: FilterOperator,
    value: FilterValue,
) -> Result<(), Error> {
    let dialect = sql.dialect;
    let name = kind.key();
    let target = column(dialect, kind.relational_table(), kind.column());

    match (dialect, operator, value) {
        (_, FilterOperator::Equals, FilterValue::One(value)) => {
            sql.append_syntax(&format!("{target} = "));
            sql.append_param(name, Param::String(value))?;
        }
        (_, FilterOperator::NotEquals, FilterValue::One(value)) => {
            sql.append_syntax(&format!("{target} != "));
            sql.append_param(name, Param::String(value))?;
        }
        (Dialect::Postgresql, FilterOperator::Contains, FilterValue::One(value)) => {
            sql.append_syntax(&format!("{target} ilike "));
            sql.append_param(name, Param::String(like_pattern(&value)))?;
        }
        (Dialect::Postgresql, FilterOperator::DoesNotContain, FilterValue::One(value)) => {
            sql.append_syntax(&format!("{target} not ilike "));
            sql.append_param(name, Param::String(like_pattern(&value)))?;
        }
        (Dialect::Clickhouse, FilterOperator::Contains, FilterValue::One(value)) => {
            sql.append_syntax(&format!("positionCaseInsensitive({target}, "));
            sql.append_param(name, Param::String(value))?;
            sql.append_syntax(") > 0");
        }
        (Dialect::Clickhouse, FilterOperator::DoesNotContain, FilterValue::One(value)) => {
            sql.append_syntax(&format!("positionCaseInsensitive({target}, "));
            sql.append_param(name, Param::String(value))?;
            sql.append_syntax(") = 0");
        }
        (Dialect::Postgresql, FilterOperator::Equals, FilterValue::Many(values)) => {
            sql.append_syntax(&format!("{target} = any("));
            sql.append_param(name, Param::StringArray(values))?;
            sql.append_syntax(")");
        }
        (Dialect::Postgresql, FilterOperator::NotEquals, FilterValue::Many(values)) => {
            sql.append_syntax(&format!("{target} != all("));
            sql.append_param(name, Param::StringArray(values))?;
            sql.append_syntax(")");
        }
        (Dialect::Clickhouse, FilterOperator::Equals, FilterValue::Many(values)) => {
            sql.append_syntax(&format!("{target} in "));
            sql.append_param(name, Param::StringArray(values))?;
        }
        (Dialect::Clickhouse, FilterOperator::NotEquals, FilterValue::Many(values)) => {
            sql.append_syntax(&format!("{target} not in "));
            sql.append_param(name, Param::StringArray(values))?;
        }
        (_, FilterOperator::Contains | FilterOperator::DoesNotContain, FilterValue::Many(_)) => {
            return Err(FilterValidationError::UnsupportedOperator { kind, operator }.into());
        }
    }

    Ok(())
}

/// Escape LIKE wildcards so the value matches literally, then wrap it for a substring match.
fn like_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

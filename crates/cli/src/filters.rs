//! Filters given on the command line.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use query_engine_translation::translation::filters::{
    Filter, FilterOperator, FilterValue, QueryFilters,
};

/// One `--filter` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterArgument {
    pub key: String,
    pub operator: FilterOperator,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterArgumentError {
    #[error("expected KEY=VALUE, KEY!=VALUE, KEY~VALUE or KEY!~VALUE, got '{0}'")]
    Malformed(String),
    #[error("filter '{key}' is given with both '{first}' and '{second}'")]
    ConflictingOperators {
        key: String,
        first: FilterOperator,
        second: FilterOperator,
    },
}

pub fn parse_filter_argument(argument: &str) -> Result<FilterArgument, FilterArgumentError> {
    let malformed = || FilterArgumentError::Malformed(argument.to_string());

    let split = argument.find(['=', '!', '~']).ok_or_else(malformed)?;
    let (key, rest) = argument.split_at(split);
    let (operator, value) = if let Some(value) = rest.strip_prefix("!=") {
        (FilterOperator::NotEquals, value)
    } else if let Some(value) = rest.strip_prefix("!~") {
        (FilterOperator::DoesNotContain, value)
    } else if let Some(value) = rest.strip_prefix('=') {
        (FilterOperator::Equals, value)
    } else if let Some(value) = rest.strip_prefix('~') {
        (FilterOperator::Contains, value)
    } else {
        return Err(malformed());
    };

    if key.trim().is_empty() {
        return Err(malformed());
    }

    Ok(FilterArgument {
        key: key.trim().to_string(),
        operator,
        value: value.to_string(),
    })
}

/// Assemble request filters. Repeated keys become a list of values.
pub fn query_filters(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    property_name: Option<String>,
    arguments: Vec<FilterArgument>,
) -> Result<QueryFilters, FilterArgumentError> {
    let mut grouped: BTreeMap<String, (FilterOperator, Vec<String>)> = BTreeMap::new();
    for argument in arguments {
        let (operator, values) = grouped
            .entry(argument.key.clone())
            .or_insert_with(|| (argument.operator, vec![]));
        if *operator != argument.operator {
            return Err(FilterArgumentError::ConflictingOperators {
                key: argument.key,
                first: *operator,
                second: argument.operator,
            });
        }
        values.push(argument.value);
    }

    let mut filters = QueryFilters::new(start, end);
    filters.property_name = property_name;
    for (key, (operator, mut values)) in grouped {
        let value = if values.len() == 1 {
            FilterValue::One(values.remove(0))
        } else {
            FilterValue::Many(values)
        };
        filters = filters.with_filter(key, Filter { operator, value });
    }
    Ok(filters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use similar_asserts::assert_eq;

    fn argument(key: &str, operator: FilterOperator, value: &str) -> FilterArgument {
        FilterArgument {
            key: key.to_string(),
            operator,
            value: value.to_string(),
        }
    }

    #[test]
    fn parses_each_operator() {
        assert_eq!(
            parse_filter_argument("country=DE"),
            Ok(argument("country", FilterOperator::Equals, "DE"))
        );
        assert_eq!(
            parse_filter_argument("browser!=safari"),
            Ok(argument("browser", FilterOperator::NotEquals, "safari"))
        );
        assert_eq!(
            parse_filter_argument("title~pricing"),
            Ok(argument("title", FilterOperator::Contains, "pricing"))
        );
        assert_eq!(
            parse_filter_argument("url!~/blog"),
            Ok(argument("url", FilterOperator::DoesNotContain, "/blog"))
        );
        assert_eq!(
            parse_filter_argument("query=a=b"),
            Ok(argument("query", FilterOperator::Equals, "a=b"))
        );
    }

    #[test]
    fn rejects_malformed_arguments() {
        for bad in ["country", "=DE", "url!/blog"] {
            assert_eq!(
                parse_filter_argument(bad),
                Err(FilterArgumentError::Malformed(bad.to_string()))
            );
        }
    }

    #[test]
    fn repeated_keys_become_lists() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let filters = query_filters(
            start,
            start,
            Some("plan".to_string()),
            vec![
                argument("country", FilterOperator::Equals, "DE"),
                argument("url", FilterOperator::Equals, "/pricing"),
                argument("country", FilterOperator::Equals, "FR"),
            ],
        )
        .unwrap();

        assert_eq!(filters.property_name(), Some("plan"));
        assert_eq!(filters.filters["country"], Filter::any_of(["DE", "FR"]));
        assert_eq!(filters.filters["url"], Filter::equals("/pricing"));
    }

    #[test]
    fn a_key_takes_one_operator() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let result = query_filters(
            start,
            start,
            None,
            vec![
                argument("os", FilterOperator::Equals, "Linux"),
                argument("os", FilterOperator::NotEquals, "Mac OS"),
            ],
        );

        assert_eq!(
            result,
            Err(FilterArgumentError::ConflictingOperators {
                key: "os".to_string(),
                first: FilterOperator::Equals,
                second: FilterOperator::NotEquals,
            })
        );
    }
}

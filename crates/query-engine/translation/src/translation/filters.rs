//! The request-scoped filters of an event data query.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};

use super::error::FilterValidationError;

/// The window and predicates of one query.
///
/// `filters` holds every other key of the request as given. Keys are only resolved to a
/// [`FilterKind`] when the filters are compiled, so an unknown key is reported there.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilters {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    #[serde(flatten)]
    pub filters: BTreeMap<String, Filter>,
}

impl QueryFilters {
    pub fn new(start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Self {
        Self {
            start_date,
            end_date,
            property_name: None,
            filters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_property_name(mut self, property_name: impl Into<String>) -> Self {
        self.property_name = Some(property_name.into());
        self
    }

    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, filter: Filter) -> Self {
        self.filters.insert(key.into(), filter);
        self
    }

    /// The property name, unless it is absent or blank.
    pub fn property_name(&self) -> Option<&str> {
        self.property_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    pub fn validate_date_range(&self) -> Result<(), FilterValidationError> {
        if self.start_date > self.end_date {
            return Err(FilterValidationError::StartAfterEnd {
                start: self.start_date.to_rfc3339(),
                end: self.end_date.to_rfc3339(),
            });
        }
        Ok(())
    }

    /// Resolve every filter key, failing on the first one that is not a known kind.
    pub fn resolve(&self) -> Result<BTreeMap<FilterKind, &Filter>, FilterValidationError> {
        self.filters
            .iter()
            .map(|(key, filter)| key.parse::<FilterKind>().map(|kind| (kind, filter)))
            .collect()
    }
}

/// The closed set of filterable attributes. Compiled clauses follow declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Sequence)]
pub enum FilterKind {
    Url,
    Referrer,
    Title,
    Query,
    Os,
    Browser,
    Device,
    Country,
    Region,
    City,
    Language,
    Event,
}

impl FilterKind {
    /// The request key, which is also the parameter name.
    pub fn key(self) -> &'static str {
        match self {
            FilterKind::Url => "url",
            FilterKind::Referrer => "referrer",
            FilterKind::Title => "title",
            FilterKind::Query => "query",
            FilterKind::Os => "os",
            FilterKind::Browser => "browser",
            FilterKind::Device => "device",
            FilterKind::Country => "country",
            FilterKind::Region => "region",
            FilterKind::City => "city",
            FilterKind::Language => "language",
            FilterKind::Event => "event",
        }
    }

    /// The stored column this kind filters on.
    pub fn column(self) -> &'static str {
        match self {
            FilterKind::Url => "url_path",
            FilterKind::Referrer => "referrer_domain",
            FilterKind::Title => "page_title",
            FilterKind::Query => "url_query",
            FilterKind::Os => "os",
            FilterKind::Browser => "browser",
            FilterKind::Device => "device",
            FilterKind::Country => "country",
            FilterKind::Region => "subdivision1",
            FilterKind::City => "city",
            FilterKind::Language => "language",
            FilterKind::Event => "event_name",
        }
    }

    /// The relational table holding the column: page attributes live on the event, visitor
    /// attributes on the session.
    pub fn relational_table(self) -> &'static str {
        match self {
            FilterKind::Url
            | FilterKind::Referrer
            | FilterKind::Title
            | FilterKind::Query
            | FilterKind::Event => "website_event",
            FilterKind::Os
            | FilterKind::Browser
            | FilterKind::Device
            | FilterKind::Country
            | FilterKind::Region
            | FilterKind::City
            | FilterKind::Language => "session",
        }
    }
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for FilterKind {
    type Err = FilterValidationError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        enum_iterator::all::<FilterKind>()
            .find(|kind| kind.key() == key)
            .ok_or_else(|| FilterValidationError::UnknownFilterKind(key.to_string()))
    }
}

/// How a filter value is compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum FilterOperator {
    #[default]
    #[serde(rename = "eq")]
    Equals,
    #[serde(rename = "neq")]
    NotEquals,
    #[serde(rename = "c")]
    Contains,
    #[serde(rename = "dnc")]
    DoesNotContain,
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            FilterOperator::Equals => "eq",
            FilterOperator::NotEquals => "neq",
            FilterOperator::Contains => "c",
            FilterOperator::DoesNotContain => "dnc",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(String),
    Many(Vec<String>),
}

/// One predicate. In a request it is written either as a bare value (`"/pricing"`), a list of
/// values, or `{ "filter": "neq", "value": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "RawFilter")]
pub struct Filter {
    #[serde(rename = "filter")]
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl Filter {
    pub fn equals(value: impl Into<String>) -> Self {
        Self {
            operator: FilterOperator::Equals,
            value: FilterValue::One(value.into()),
        }
    }

    pub fn any_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operator: FilterOperator::Equals,
            value: FilterValue::Many(values.into_iter().map(Into::into).collect()),
        }
    }

    #[must_use]
    pub fn with_operator(mut self, operator: FilterOperator) -> Self {
        self.operator = operator;
        self
    }

    /// The value with empty entries dropped, or `None` when nothing remains.
    pub fn active_value(&self) -> Option<FilterValue> {
        match &self.value {
            FilterValue::One(value) if value.is_empty() => None,
            FilterValue::One(value) => Some(FilterValue::One(value.clone())),
            FilterValue::Many(values) => {
                let values: Vec<String> =
                    values.iter().filter(|v| !v.is_empty()).cloned().collect();
                (!values.is_empty()).then_some(FilterValue::Many(values))
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFilter {
    Bare(FilterValue),
    Condition {
        #[serde(default)]
        filter: FilterOperator,
        value: FilterValue,
    },
}

impl From<RawFilter> for Filter {
    fn from(raw: RawFilter) -> Self {
        match raw {
            RawFilter::Bare(value) => Filter {
                operator: FilterOperator::Equals,
                value,
            },
            RawFilter::Condition { filter, value } => Filter {
                operator: filter,
                value,
            },
        }
    }
}

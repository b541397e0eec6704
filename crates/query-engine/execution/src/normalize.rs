//! Turn backend rows into the shared `{ value, total }` shape.
//!
//! Rows keep the order the backend produced. The columnar backend groups on a display value it
//! computes itself; here it is checked against its type tag and brought into canonical form.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::BackendContractError;

/// One distinct value of an event data property and how many times it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDataValueRow {
    pub value: String,
    pub total: u64,
}

/// A row as the relational backend returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationalRow {
    pub value: Option<String>,
    pub total: i64,
}

/// A row as the columnar backend returns it in its JSON output format.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnarRow {
    #[serde(rename = "dataType")]
    pub data_type: i64,
    pub value: Option<String>,
    pub total: ColumnarTotal,
}

/// Counts are 64-bit, which the columnar backend quotes as strings by default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColumnarTotal {
    Text(String),
    Number(serde_json::Number),
}

/// The stored type of an event data value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDataType {
    String,
    Number,
    Boolean,
    Date,
    Array,
}

impl TryFrom<i64> for EventDataType {
    type Error = BackendContractError;

    fn try_from(tag: i64) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(EventDataType::String),
            2 => Ok(EventDataType::Number),
            3 => Ok(EventDataType::Boolean),
            4 => Ok(EventDataType::Date),
            5 => Ok(EventDataType::Array),
            _ => Err(BackendContractError::UnknownDataType(tag)),
        }
    }
}

/// Render the display value of a raw value of the given type.
pub fn render_value(data_type: EventDataType, raw: &str) -> Result<String, BackendContractError> {
    match data_type {
        EventDataType::Number => Ok(trim_decimal(raw).to_string()),
        EventDataType::Date => render_hour(raw),
        EventDataType::String | EventDataType::Boolean | EventDataType::Array => {
            Ok(raw.to_string())
        }
    }
}

/// `3.5000` -> `3.5`, `3.0000` -> `3`. Integers are left alone.
fn trim_decimal(raw: &str) -> &str {
    if raw.contains('.') {
        raw.trim_end_matches('0').trim_end_matches('.')
    } else {
        raw
    }
}

fn render_hour(raw: &str) -> Result<String, BackendContractError> {
    let timestamp = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|t| t.naive_utc()))
        .map_err(|_| BackendContractError::InvalidTimestamp(raw.to_string()))?;

    let hour = timestamp
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .ok_or_else(|| BackendContractError::InvalidTimestamp(raw.to_string()))?;

    Ok(hour.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Normalize relational rows, preserving their order.
pub fn normalize_relational_rows(
    rows: Vec<RelationalRow>,
) -> Result<Vec<EventDataValueRow>, BackendContractError> {
    rows.into_iter()
        .map(|row| {
            let value = row.value.ok_or(BackendContractError::MissingField("value"))?;
            let total = u64::try_from(row.total)
                .map_err(|_| BackendContractError::InvalidTotal(row.total.to_string()))?;
            Ok(EventDataValueRow { value, total })
        })
        .collect()
}

/// Normalize columnar rows.
///
/// Rendering is idempotent on values the backend already grouped, but a stored string can
/// still render like a value of another type (`"2024-01-05 13:00:00"` next to a date in that
/// hour). Such rows are merged by summing their totals, after which the rows are ordered by
/// total, highest first, and at most `limit` are kept. Rows with equal totals keep the order
/// the backend produced.
pub fn normalize_columnar_rows(
    rows: Vec<ColumnarRow>,
    limit: usize,
) -> Result<Vec<EventDataValueRow>, BackendContractError> {
    let mut merged: Vec<EventDataValueRow> = Vec::with_capacity(rows.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let data_type = EventDataType::try_from(row.data_type)?;
        let raw = row.value.ok_or(BackendContractError::MissingField("value"))?;
        let value = render_value(data_type, &raw)?;
        let total = parse_total(&row.total)?;

        match positions.get(&value) {
            Some(&position) => {
                merged[position].total = merged[position].total.saturating_add(total);
            }
            None => {
                positions.insert(value.clone(), merged.len());
                merged.push(EventDataValueRow { value, total });
            }
        }
    }

    merged.sort_by(|a, b| b.total.cmp(&a.total));
    merged.truncate(limit);
    Ok(merged)
}

fn parse_total(total: &ColumnarTotal) -> Result<u64, BackendContractError> {
    match total {
        ColumnarTotal::Text(text) => text
            .parse::<u64>()
            .map_err(|_| BackendContractError::InvalidTotal(text.clone())),
        ColumnarTotal::Number(number) => number
            .as_u64()
            .ok_or_else(|| BackendContractError::InvalidTotal(number.to_string())),
    }
}

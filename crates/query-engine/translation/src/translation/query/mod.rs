//! Translate event data requests into checked queries.

pub mod event_data_values;
pub mod filtering;

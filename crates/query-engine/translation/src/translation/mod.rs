//! Translate event data requests into parameterized SQL for the selected backend.

pub mod error;
pub mod filters;
pub mod query;

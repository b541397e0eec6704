//! Parameterized SQL text for the two event data backends.

pub mod sql;

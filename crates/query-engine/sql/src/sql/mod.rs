//! Placeholder grammars, parameter sets and checked queries.

pub mod dialect;
pub mod execution_plan;
pub mod string;

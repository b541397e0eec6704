//! Query execution against the relational and columnar backends, and normalization of what
//! they return into one row shape.

pub mod columnar;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod relational;

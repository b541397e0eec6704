//! Distinct event data values for a website, answered by whichever backend the process was
//! configured with.

pub mod connector;
pub mod error;
pub mod health;
pub mod query;
pub mod state;

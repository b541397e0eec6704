//! A query that is ready to be handed to a backend.

use std::collections::BTreeSet;

use thiserror::Error;

use super::dialect::Dialect;
use super::string::{ParameterSet, SQL};

/// Placeholders and parameters did not line up one to one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("placeholder '{0}' has no parameter")]
    UnboundPlaceholder(String),
    #[error("parameter '{0}' is not referenced by any placeholder")]
    UnusedParameter(String),
}

/// Query text whose placeholders are exactly the keys of its parameter set.
///
/// The only way to build one is `Query::new`, which checks the correspondence, so executors
/// never see a query with a missing or stray parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    dialect: Dialect,
    sql: String,
    params: ParameterSet,
}

impl Query {
    pub fn new(dialect: Dialect, sql: String, params: ParameterSet) -> Result<Query, BindingError> {
        let referenced: BTreeSet<&str> = dialect
            .placeholders(&sql)
            .into_iter()
            .map(|placeholder| placeholder.name)
            .collect();

        if let Some(name) = referenced.iter().find(|name| !params.contains(name)) {
            return Err(BindingError::UnboundPlaceholder((*name).to_string()));
        }
        if let Some(name) = params.names().find(|name| !referenced.contains(name)) {
            return Err(BindingError::UnusedParameter(name.to_string()));
        }

        Ok(Query {
            dialect,
            sql,
            params,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }
}

impl TryFrom<SQL> for Query {
    type Error = BindingError;

    fn try_from(sql: SQL) -> Result<Self, Self::Error> {
        Query::new(sql.dialect, sql.sql, sql.params)
    }
}

//! Type definitions of a low-level SQL string representation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::dialect::Dialect;

/// A parameter value for a parameterized query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    /// A literal string
    String(String),
    /// A list of strings, for membership predicates.
    StringArray(Vec<String>),
}

/// The type of a parameter, which decides the annotation written in its placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Uuid,
    Timestamp,
    String,
    StringArray,
}

impl Param {
    pub fn param_type(&self) -> ParamType {
        match self {
            Param::Uuid(_) => ParamType::Uuid,
            Param::Timestamp(_) => ParamType::Timestamp,
            Param::String(_) => ParamType::String,
            Param::StringArray(_) => ParamType::StringArray,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("parameter '{0}' is bound twice with different values")]
    ConflictingParameter(String),
}

/// Named parameters, ordered by name so generated text and logs are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet(BTreeMap<String, Param>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a parameter. Binding the same name again is allowed only with an equal value.
    pub fn insert(&mut self, name: impl Into<String>, param: Param) -> Result<(), ParamError> {
        let name = name.into();
        match self.0.get(&name) {
            Some(existing) if *existing != param => Err(ParamError::ConflictingParameter(name)),
            Some(_) => Ok(()),
            None => {
                self.0.insert(name, param);
                Ok(())
            }
        }
    }

    /// Bind every parameter of `other`.
    pub fn extend(&mut self, other: ParameterSet) -> Result<(), ParamError> {
        other
            .0
            .into_iter()
            .try_for_each(|(name, param)| self.insert(name, param))
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.0.iter().map(|(name, param)| (name.as_str(), param))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// SQL text for one dialect together with the parameters its placeholders refer to.
///
/// Values only ever enter the text as placeholders written by `append_param`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SQL {
    pub dialect: Dialect,
    pub sql: String,
    pub params: ParameterSet,
}

impl SQL {
    pub fn new(dialect: Dialect) -> SQL {
        SQL {
            dialect,
            sql: String::new(),
            params: ParameterSet::new(),
        }
    }

    pub fn append_syntax(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Write a placeholder for `name` and bind its value.
    pub fn append_param(&mut self, name: &str, param: Param) -> Result<(), ParamError> {
        self.sql
            .push_str(&self.dialect.placeholder(name, param.param_type()));
        self.params.insert(name, param)
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_param_writes_placeholder_and_binds() {
        let mut sql = SQL::new(Dialect::Clickhouse);
        sql.append_syntax("and url_path = ");
        sql.append_param("url", Param::String("/pricing".to_string()))
            .unwrap();

        assert_eq!(sql.sql, "and url_path = {url:String}");
        assert_eq!(
            sql.params.get("url"),
            Some(&Param::String("/pricing".to_string()))
        );
    }

    #[test]
    fn the_value_never_reaches_the_text() {
        let hostile = "'; drop table event_data; --";
        let mut sql = SQL::new(Dialect::Postgresql);
        sql.append_syntax("and page_title = ");
        sql.append_param("title", Param::String(hostile.to_string()))
            .unwrap();

        assert!(!sql.sql.contains(hostile));
    }

    #[test]
    fn rebinding_requires_the_same_value() {
        let mut params = ParameterSet::new();
        params
            .insert("propertyName", Param::String("plan".to_string()))
            .unwrap();
        params
            .insert("propertyName", Param::String("plan".to_string()))
            .unwrap();

        assert_eq!(
            params.insert("propertyName", Param::String("tier".to_string())),
            Err(ParamError::ConflictingParameter("propertyName".to_string()))
        );
        assert_eq!(params.len(), 1);
    }
}

//! Access to the process environment, abstracted so tests can supply fixed values.

use std::collections::HashMap;

/// Errors reading from an environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("environment variable {0} is not set")]
    VariableNotPresent(String),
    #[error("environment variable {0} does not contain valid unicode")]
    NonUnicodeValue(String),
}

/// A source of environment variables.
pub trait Environment {
    fn read(&self, variable: &str) -> Result<String, Error>;
}

impl<T: Environment + ?Sized> Environment for &T {
    fn read(&self, variable: &str) -> Result<String, Error> {
        (**self).read(variable)
    }
}

/// Reads from the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn read(&self, variable: &str) -> Result<String, Error> {
        std::env::var(variable).map_err(|error| match error {
            std::env::VarError::NotPresent => Error::VariableNotPresent(variable.to_string()),
            std::env::VarError::NotUnicode(_) => Error::NonUnicodeValue(variable.to_string()),
        })
    }
}

/// A fixed set of variables, used by tests and tooling.
#[derive(Debug, Clone, Default)]
pub struct FixedEnvironment(HashMap<String, String>);

impl<const N: usize> From<[(String, String); N]> for FixedEnvironment {
    fn from(variables: [(String, String); N]) -> Self {
        Self(HashMap::from(variables))
    }
}

impl Environment for FixedEnvironment {
    fn read(&self, variable: &str) -> Result<String, Error> {
        self.0.read(variable)
    }
}

impl Environment for HashMap<String, String> {
    fn read(&self, variable: &str) -> Result<String, Error> {
        self.get(variable)
            .cloned()
            .ok_or_else(|| Error::VariableNotPresent(variable.to_string()))
    }
}

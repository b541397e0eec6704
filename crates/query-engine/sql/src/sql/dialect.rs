//! The placeholder grammar of each backend.
//!
//! The relational backend writes typed named parameters as `{{name::type}}`, leaving the type
//! out where the driver infers it. The columnar backend writes `{name:Type}`, which the
//! ClickHouse HTTP interface binds natively.

use std::ops::Range;

use super::string::ParamType;

/// Which backend a piece of SQL text is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgresql,
    Clickhouse,
}

/// A placeholder found in SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    pub name: &'a str,
    pub type_annotation: Option<&'a str>,
    /// Byte range of the whole token, braces included.
    pub span: Range<usize>,
}

impl Dialect {
    /// Render the placeholder token for a parameter.
    pub fn placeholder(self, name: &str, param_type: ParamType) -> String {
        match self {
            Dialect::Postgresql => match postgres_cast(param_type) {
                Some(cast) => format!("{{{{{name}::{cast}}}}}"),
                None => format!("{{{{{name}}}}}"),
            },
            Dialect::Clickhouse => format!("{{{name}:{}}}", clickhouse_type(param_type)),
        }
    }

    /// Find every placeholder in `text`, in order of appearance.
    pub fn placeholders(self, text: &str) -> Vec<Placeholder<'_>> {
        match self {
            Dialect::Postgresql => postgres_placeholders(text),
            Dialect::Clickhouse => clickhouse_placeholders(text),
        }
    }
}

fn postgres_cast(param_type: ParamType) -> Option<&'static str> {
    match param_type {
        ParamType::Uuid => Some("uuid"),
        ParamType::Timestamp | ParamType::String => None,
        ParamType::StringArray => Some("varchar[]"),
    }
}

fn clickhouse_type(param_type: ParamType) -> &'static str {
    match param_type {
        ParamType::Uuid => "UUID",
        ParamType::Timestamp => "DateTime64",
        ParamType::String => "String",
        ParamType::StringArray => "Array(String)",
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn postgres_placeholders(text: &str) -> Vec<Placeholder<'_>> {
    let mut found = vec![];
    let mut position = 0;

    while let Some(offset) = text[position..].find("{{") {
        let start = position + offset;
        let Some(length) = text[start + 2..].find("}}") else {
            break;
        };
        let end = start + 2 + length + 2;
        let inner = text[start + 2..end - 2].trim();
        let (name, type_annotation) = match inner.split_once("::") {
            Some((name, cast)) => (name.trim(), Some(cast.trim())),
            None => (inner, None),
        };

        if is_identifier(name) {
            found.push(Placeholder {
                name,
                type_annotation,
                span: start..end,
            });
            position = end;
        } else {
            position = start + 2;
        }
    }

    found
}

fn clickhouse_placeholders(text: &str) -> Vec<Placeholder<'_>> {
    let mut found = vec![];
    let mut position = 0;

    while let Some(offset) = text[position..].find('{') {
        let start = position + offset;
        let Some(length) = text[start + 1..].find('}') else {
            break;
        };
        let end = start + 1 + length + 1;
        let inner = &text[start + 1..end - 1];

        match inner.split_once(':') {
            Some((name, type_name)) if is_identifier(name) && !type_name.trim().is_empty() => {
                found.push(Placeholder {
                    name,
                    type_annotation: Some(type_name.trim()),
                    span: start..end,
                });
                position = end;
            }
            _ => position = start + 1,
        }
    }

    found
}

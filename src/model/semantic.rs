//! Semantic property types
//!
//! Every backend names its types differently (`VARCHAR`, `xsd:string`,
//! `EMBEDDEDMAP`...). Consumers only care about a handful of kinds, so native
//! names are folded into [`SemanticType`] by [`map_type`].

use super::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

const XML_SCHEMA_MARKER: &str = "xmlschema#";

/// Normalized property type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum SemanticType {
    String,
    Numeric,
    Date,
    Boolean,
    /// Native type name with no mapping, kept normalized but otherwise untouched
    Other(String),
}

impl SemanticType {
    /// Infer the semantic type of a value when the backend declares none
    pub fn of(value: &Value) -> SemanticType {
        match value {
            Value::Bool(_) => SemanticType::Boolean,
            Value::Int(_) | Value::Float(_) => SemanticType::Numeric,
            Value::Date(_) => SemanticType::Date,
            Value::List(_) => SemanticType::Other("list".to_string()),
            Value::Map(_) => SemanticType::Other("map".to_string()),
            Value::Null | Value::String(_) | Value::Raw(_) => SemanticType::String,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SemanticType::String => "String",
            SemanticType::Numeric => "Numeric",
            SemanticType::Date => "Date",
            SemanticType::Boolean => "Boolean",
            SemanticType::Other(name) => name,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SemanticType> for String {
    fn from(t: SemanticType) -> Self {
        t.as_str().to_string()
    }
}

impl From<String> for SemanticType {
    fn from(name: String) -> Self {
        map_type(&name)
    }
}

impl From<&str> for SemanticType {
    fn from(name: &str) -> Self {
        map_type(name)
    }
}

/// Map a backend-native type name to its semantic type.
///
/// The name is trimmed, lowercased, whitespace-collapsed, stripped of an
/// `xmlschema#` URI prefix and of any `(precision, scale)` suffix before the
/// lookup. Unknown names come back as [`SemanticType::Other`].
pub fn map_type(native: &str) -> SemanticType {
    let normalized = native
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let name = match normalized.rfind(XML_SCHEMA_MARKER) {
        Some(idx) => &normalized[idx + XML_SCHEMA_MARKER.len()..],
        None => normalized.as_str(),
    };
    let name = name.split('(').next().unwrap_or(name).trim_end();

    match name {
        "string" | "str" | "text" | "varchar" | "char" | "character" | "character varying"
        | "nvarchar" | "nchar" | "ntext" | "clob" | "uuid" | "enum" | "bpchar" | "tinytext"
        | "mediumtext" | "longtext" | "normalizedstring" | "token" | "anyuri" => {
            SemanticType::String
        }
        "int" | "integer" | "long" | "short" | "byte" | "tinyint" | "smallint" | "mediumint"
        | "bigint" | "hugeint" | "uhugeint" | "utinyint" | "usmallint" | "uinteger"
        | "ubigint" | "float" | "double" | "double precision" | "real" | "decimal"
        | "numeric" | "number" | "money" | "serial" | "bigserial" | "smallserial" | "int2"
        | "int4" | "int8" | "float4" | "float8" | "unsignedint" | "unsignedlong"
        | "unsignedshort" | "unsignedbyte" | "positiveinteger" | "negativeinteger"
        | "nonnegativeinteger" | "nonpositiveinteger" => SemanticType::Numeric,
        "date" | "datetime" | "datetime2" | "smalldatetime" | "timestamp" | "timestamptz"
        | "timestamp with time zone" | "timestamp without time zone" | "time"
        | "time with time zone" | "time without time zone" | "datetimeoffset" => {
            SemanticType::Date
        }
        "boolean" | "bool" | "bit" => SemanticType::Boolean,
        other => SemanticType::Other(other.to_string()),
    }
}

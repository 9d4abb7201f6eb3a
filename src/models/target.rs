// src/models/target.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a type tag is not of the form `namespace.kind`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("type tag {0:?} must be in the format 'namespace.kind'")]
pub struct MalformedTypeTag(pub String);

/// Stable name of a referenceable entity kind, e.g. `catalog.item`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeTag {
    namespace: String,
    kind: String,
}

impl TypeTag {
    pub fn new(namespace: &str, kind: &str) -> Result<Self, MalformedTypeTag> {
        if !is_tag_part(namespace) || !is_tag_part(kind) {
            return Err(MalformedTypeTag(format!("{namespace}.{kind}")));
        }
        Ok(Self {
            namespace: namespace.to_lowercase(),
            kind: kind.to_lowercase(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

fn is_tag_part(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for TypeTag {
    type Err = MalformedTypeTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(namespace), Some(kind), None) => {
                Self::new(namespace, kind).map_err(|_| MalformedTypeTag(s.to_string()))
            }
            _ => Err(MalformedTypeTag(s.to_string())),
        }
    }
}

impl TryFrom<String> for TypeTag {
    type Error = MalformedTypeTag;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeTag> for String {
    fn from(tag: TypeTag) -> Self {
        tag.to_string()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.kind)
    }
}

/// Points at one record of some registered kind without knowing its type.
///
/// The primary key is kept as text so that every kind, whatever its key type,
/// fits the same column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetRef {
    pub type_tag: TypeTag,
    pub primary_key: String,
}

impl TargetRef {
    pub fn new(type_tag: TypeTag, primary_key: impl Into<String>) -> Self {
        Self {
            type_tag,
            primary_key: primary_key.into(),
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_tag, self.primary_key)
    }
}

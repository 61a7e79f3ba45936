use std::collections::BTreeMap;

use thiserror::Error;

use super::descriptor::{DescriptorError, TypeDescriptor};

/// One field of a [`SchemaMap`].
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaEntry {
    Type(TypeDescriptor),
    Nested(SchemaMap),
}

impl SchemaEntry {
    /// The output schema an identifier naming this entry receives.
    pub fn descriptor(&self) -> TypeDescriptor {
        match self {
            SchemaEntry::Type(descriptor) => descriptor.clone(),
            SchemaEntry::Nested(_) => TypeDescriptor::object(),
        }
    }
}

/// Errors raised while building a schema map.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("field `{field}`: {source}")]
    InvalidDescriptor {
        field: String,
        #[source]
        source: DescriptorError,
    },

    #[error("field `{0}`: expected a type descriptor string or a nested object")]
    InvalidEntry(String),

    #[error("a schema must be a JSON object")]
    NotAnObject,
}

/// Field name -> type descriptor or nested map.
///
/// Shared by the parser (identifier resolution) and the evaluator (data
/// validation).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaMap {
    fields: BTreeMap<String, SchemaEntry>,
}

impl SchemaMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field typed by a descriptor string.
    pub fn field(mut self, name: &str, descriptor: &str) -> Result<Self, SchemaError> {
        let parsed = TypeDescriptor::parse(descriptor).map_err(|source| {
            SchemaError::InvalidDescriptor {
                field: name.to_string(),
                source,
            }
        })?;
        self.fields.insert(name.to_string(), SchemaEntry::Type(parsed));
        Ok(self)
    }

    /// Adds a nested field map.
    pub fn nested(mut self, name: &str, schema: SchemaMap) -> Self {
        self.fields.insert(name.to_string(), SchemaEntry::Nested(schema));
        self
    }

    /// Reads `{ "field": "descriptor" | { ...nested } }`.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, SchemaError> {
        Self::from_json_at(json, "")
    }

    fn from_json_at(json: &serde_json::Value, prefix: &str) -> Result<Self, SchemaError> {
        let serde_json::Value::Object(object) = json else {
            return Err(SchemaError::NotAnObject);
        };
        let mut schema = SchemaMap::new();
        for (name, entry) in object {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            match entry {
                serde_json::Value::String(descriptor) => {
                    let parsed = TypeDescriptor::parse(descriptor)
                        .map_err(|source| SchemaError::InvalidDescriptor { field: path, source })?;
                    schema.fields.insert(name.clone(), SchemaEntry::Type(parsed));
                }
                serde_json::Value::Object(_) => {
                    let nested = Self::from_json_at(entry, &path)?;
                    schema.fields.insert(name.clone(), SchemaEntry::Nested(nested));
                }
                _ => return Err(SchemaError::InvalidEntry(path)),
            }
        }
        Ok(schema)
    }

    pub fn get(&self, name: &str) -> Option<&SchemaEntry> {
        self.fields.get(name)
    }

    /// Resolves a dotted path, walking nested maps.
    pub fn resolve(&self, path: &[String]) -> Option<&SchemaEntry> {
        let (first, rest) = path.split_first()?;
        let mut entry = self.fields.get(first)?;
        for segment in rest {
            match entry {
                SchemaEntry::Nested(inner) => entry = inner.fields.get(segment)?,
                SchemaEntry::Type(_) => return None,
            }
        }
        Some(entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SchemaEntry)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

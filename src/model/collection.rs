use crate::error::{QueryError, close_matches};
use crate::model::field::{Field, FieldSpec};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

const BUILTIN_FIELDS: &str = include_str!("../../data/statcast_fields.json");

/// The fields belonging to one queryable endpoint.
#[derive(Debug, Clone)]
pub struct Collection {
    pub name: String,
    /// Path appended to the base URL when requesting this collection.
    pub slug: String,
    pub fields: BTreeMap<String, Field>,
}

impl Collection {
    /// Look up a field by name.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the collection has no field called `name`
    pub fn field(&self, name: &str) -> Result<&Field, QueryError> {
        self.fields.get(name).ok_or_else(|| QueryError::FieldName {
            name: name.to_string(),
            collection: self.name.clone(),
            suggestions: close_matches(name, self.fields.keys()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CollectionSpec {
    name: String,
    slug: String,
    fields: BTreeMap<String, FieldSpec>,
}

/// Every collection known to the client, built once and shared by reference.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    collections: BTreeMap<String, Collection>,
}

impl Registry {
    /// The field definitions shipped with the crate.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the embedded document fails to parse
    pub fn builtin() -> Result<Self, QueryError> {
        Self::from_json(BUILTIN_FIELDS)
    }

    /// # Errors
    ///
    /// Will return `Err` if the file cannot be read or is not a valid field document
    pub fn from_path(path: &Path) -> Result<Self, QueryError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| QueryError::Config(format!("reading {}: {e}", path.display())))?;
        Self::from_json(&contents)
    }

    /// # Errors
    ///
    /// Will return `Err` if `contents` is not a valid field document
    pub fn from_json(contents: &str) -> Result<Self, QueryError> {
        let specs: BTreeMap<String, CollectionSpec> = serde_json::from_str(contents)?;
        let collections = specs
            .into_iter()
            .map(|(key, spec)| {
                let fields = spec
                    .fields
                    .into_iter()
                    .map(|(name, field)| (name, Field::from(field)))
                    .collect();
                let collection = Collection {
                    name: spec.name,
                    slug: spec.slug,
                    fields,
                };
                (key, collection)
            })
            .collect::<BTreeMap<_, _>>();
        tracing::debug!(collections = collections.len(), "loaded field registry");
        Ok(Self { collections })
    }

    /// # Errors
    ///
    /// Will return `Err` if no collection is registered under `name`
    pub fn collection(&self, name: &str) -> Result<&Collection, QueryError> {
        self.collections
            .get(name)
            .ok_or_else(|| QueryError::UnknownCollection {
                name: name.to_string(),
                suggestions: close_matches(name, self.collections.keys()),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}

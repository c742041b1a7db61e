//! Platform support descriptors.
//!
//! A support descriptor supplies what the model file cannot express on a
//! given platform: which runtime class backs each entity, and which value
//! transformer handles each transformable class. It stands alone until a
//! [`Model`](super::Model) merges it.

use super::record::{decode, read_bounded, MEMORY_ORIGIN};
use crate::config::LoadOptions;
use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SupportDocument {
    #[serde(default)]
    entity_class_names: BTreeMap<String, String>,
    #[serde(default)]
    transformer_class_names: BTreeMap<String, String>,
}

/// Class-name lookup tables for one platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportDescriptor {
    /// Class name -> entity name.
    entity_class_names: BTreeMap<String, String>,
    /// Class name -> transformer name.
    transformer_class_names: BTreeMap<String, String>,
    /// Entity name -> class name, derived from `entity_class_names`.
    class_by_entity: BTreeMap<String, String>,
}

impl SupportDescriptor {
    /// Create an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a descriptor file with default options.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        Self::load_with_options(path, &LoadOptions::default())
    }

    /// Load a descriptor file, honoring the size limit in `options`.
    pub fn load_with_options(
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let source = read_bounded(path, options.max_file_size)?;
        let descriptor = Self::parse(&source, &path.display().to_string())?;
        debug!(
            path = %path.display(),
            entity_classes = descriptor.entity_class_names.len(),
            transformers = descriptor.transformer_class_names.len(),
            "Loaded support descriptor"
        );
        Ok(descriptor)
    }

    /// Parse a descriptor from a JSON string.
    pub fn from_json(source: &str) -> Result<Self, ParseError> {
        Self::parse(source, MEMORY_ORIGIN)
    }

    fn parse(source: &str, origin: &str) -> Result<Self, ParseError> {
        let document: SupportDocument = decode(source, origin)?;

        let mut class_by_entity: BTreeMap<String, String> = BTreeMap::new();
        for (class, entity) in &document.entity_class_names {
            if let Some(first) = class_by_entity.get(entity) {
                return Err(ParseError::AmbiguousClassMapping {
                    entity: entity.clone(),
                    first: first.clone(),
                    second: class.clone(),
                });
            }
            class_by_entity.insert(entity.clone(), class.clone());
        }

        Ok(Self {
            entity_class_names: document.entity_class_names,
            transformer_class_names: document.transformer_class_names,
            class_by_entity,
        })
    }

    /// Map `class` to `entity`, replacing any class previously mapped to it.
    pub fn with_entity_class(mut self, class: impl Into<String>, entity: impl Into<String>) -> Self {
        let class = class.into();
        let entity = entity.into();

        if let Some(previous) = self.class_by_entity.insert(entity.clone(), class.clone()) {
            self.entity_class_names.remove(&previous);
        }
        if let Some(old_entity) = self.entity_class_names.insert(class, entity.clone()) {
            if old_entity != entity {
                self.class_by_entity.remove(&old_entity);
            }
        }
        self
    }

    /// Map `class` to the transformer named `transformer`.
    pub fn with_transformer(
        mut self,
        class: impl Into<String>,
        transformer: impl Into<String>,
    ) -> Self {
        self.transformer_class_names
            .insert(class.into(), transformer.into());
        self
    }

    /// Entity backed by `class`.
    pub fn entity_name_for_class(&self, class: &str) -> Option<&str> {
        self.entity_class_names.get(class).map(String::as_str)
    }

    /// Class backing `entity`.
    pub fn class_name_for_entity(&self, entity: &str) -> Option<&str> {
        self.class_by_entity.get(entity).map(String::as_str)
    }

    /// Transformer for `class`.
    pub fn transformer_for_class(&self, class: &str) -> Option<&str> {
        self.transformer_class_names.get(class).map(String::as_str)
    }

    /// All (class, entity) pairs, ordered by class name.
    pub fn entity_class_names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entity_class_names
            .iter()
            .map(|(c, e)| (c.as_str(), e.as_str()))
    }

    /// All (class, transformer) pairs, ordered by class name.
    pub fn transformer_class_names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.transformer_class_names
            .iter()
            .map(|(c, t)| (c.as_str(), t.as_str()))
    }

    /// True if both tables are empty.
    pub fn is_empty(&self) -> bool {
        self.entity_class_names.is_empty() && self.transformer_class_names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = r#"{
        "entityClassNames": {"PersonImpl": "Person", "EventImpl": "Event"},
        "transformerClassNames": {"Color": "ColorTransformer"}
    }"#;

    #[test]
    fn test_parse_tables() {
        let descriptor = SupportDescriptor::from_json(DESCRIPTOR).unwrap();

        assert_eq!(descriptor.entity_name_for_class("PersonImpl"), Some("Person"));
        assert_eq!(descriptor.class_name_for_entity("Event"), Some("EventImpl"));
        assert_eq!(descriptor.transformer_for_class("Color"), Some("ColorTransformer"));
        assert_eq!(descriptor.entity_name_for_class("Person"), None);
        assert_eq!(descriptor.entity_class_names().count(), 2);
    }

    #[test]
    fn test_tables_optional() {
        let descriptor = SupportDescriptor::from_json("{}").unwrap();
        assert!(descriptor.is_empty());

        let descriptor =
            SupportDescriptor::from_json(r#"{"transformerClassNames": {"A": "B"}}"#).unwrap();
        assert_eq!(descriptor.entity_class_names().count(), 0);
        assert_eq!(descriptor.transformer_for_class("A"), Some("B"));
    }

    #[test]
    fn test_malformed_descriptor() {
        let err = SupportDescriptor::from_json(r#"{"entityClassNames": ["Person"]}"#).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));

        let err = SupportDescriptor::from_json(r#"{"classNames": {}}"#).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_ambiguous_mapping() {
        let err = SupportDescriptor::from_json(
            r#"{"entityClassNames": {"PersonA": "Person", "PersonB": "Person"}}"#,
        )
        .unwrap_err();

        match err {
            ParseError::AmbiguousClassMapping {
                entity,
                first,
                second,
            } => {
                assert_eq!(entity, "Person");
                assert_eq!(first, "PersonA");
                assert_eq!(second, "PersonB");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_builder_replaces_mappings() {
        let descriptor = SupportDescriptor::new()
            .with_entity_class("PersonA", "Person")
            .with_entity_class("PersonB", "Person")
            .with_entity_class("Shared", "Event")
            .with_entity_class("Shared", "Place")
            .with_transformer("Color", "ColorTransformer");

        assert_eq!(descriptor.class_name_for_entity("Person"), Some("PersonB"));
        assert_eq!(descriptor.entity_name_for_class("PersonA"), None);
        assert_eq!(descriptor.class_name_for_entity("Event"), None);
        assert_eq!(descriptor.class_name_for_entity("Place"), Some("Shared"));
        assert_eq!(descriptor.transformer_for_class("Color"), Some("ColorTransformer"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("support.json");
        std::fs::write(&path, DESCRIPTOR).unwrap();

        let descriptor = SupportDescriptor::load(&path).unwrap();
        assert_eq!(descriptor, SupportDescriptor::from_json(DESCRIPTOR).unwrap());

        let err = SupportDescriptor::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }
}

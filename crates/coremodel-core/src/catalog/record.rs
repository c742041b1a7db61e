//! On-disk record formats.

use crate::error::ParseError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// A single entity as declared in a model file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntityRecord {
    /// Entity name (unique within the model).
    pub name: String,
    /// Backing class name, if the model file knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Whether the entity is abstract.
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Name of the parent entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl EntityRecord {
    /// Create a concrete, parentless record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the backing class name.
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Mark the entity abstract.
    pub fn with_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Set the parent entity name.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// Top-level layout of a model file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct ModelDocument {
    pub entities: Vec<EntityRecord>,
    /// Class name -> transformer class name, as merged from descriptors.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub transformer_class_names: BTreeMap<String, String>,
}

/// Origin label for documents parsed from memory.
pub(crate) const MEMORY_ORIGIN: &str = "<memory>";

/// Read a whole file, refusing anything above `limit` bytes.
///
/// The file is opened once and never read past `limit + 1` bytes.
pub(crate) fn read_bounded(path: &Path, limit: u64) -> Result<String, ParseError> {
    let io_error = |source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_error)?;
    let mut bytes = Vec::new();
    let read = file
        .by_ref()
        .take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(io_error)? as u64;

    if read > limit {
        let size = file.metadata().map_or(read, |meta| meta.len().max(read));
        return Err(ParseError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit,
        });
    }

    String::from_utf8(bytes)
        .map_err(|err| io_error(io::Error::new(io::ErrorKind::InvalidData, err)))
}

/// Decode a JSON document, labelling failures with `origin`.
pub(crate) fn decode<T: DeserializeOwned>(
    source: &str,
    origin: &str,
) -> Result<T, ParseError> {
    serde_json::from_str(source).map_err(|source| ParseError::Syntax {
        origin: origin.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_defaults() {
        let doc: ModelDocument =
            decode(r#"{"entities": [{"name": "Person"}]}"#, MEMORY_ORIGIN).unwrap();
        assert_eq!(doc.entities, vec![EntityRecord::new("Person")]);
    }

    #[test]
    fn test_record_fields() {
        let doc: ModelDocument = decode(
            r#"{"entities": [
                {"name": "Base", "abstract": true},
                {"name": "Person", "className": "PersonImpl", "parent": "Base"}
            ]}"#,
            MEMORY_ORIGIN,
        )
        .unwrap();

        assert_eq!(doc.entities[0], EntityRecord::new("Base").with_abstract());
        assert_eq!(
            doc.entities[1],
            EntityRecord::new("Person")
                .with_class_name("PersonImpl")
                .with_parent("Base")
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = decode::<ModelDocument>(
            r#"{"entities": [{"name": "Person", "attributes": []}]}"#,
            "model.json",
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::Syntax { ref origin, .. } if origin == "model.json"));
    }

    #[test]
    fn test_missing_name_rejected() {
        assert!(decode::<ModelDocument>(r#"{"entities": [{"abstract": true}]}"#, MEMORY_ORIGIN).is_err());
    }

    #[test]
    fn test_read_bounded_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, r#"{"entities": []}"#).unwrap();

        assert!(read_bounded(&path, 1024).is_ok());
        let err = read_bounded(&path, 4).unwrap_err();
        assert!(matches!(err, ParseError::TooLarge { size: 16, limit: 4, .. }));
    }

    #[test]
    fn test_read_bounded_exact_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let source = r#"{"entities": []}"#;
        std::fs::write(&path, source).unwrap();
        let len = source.len() as u64;

        assert_eq!(read_bounded(&path, len).unwrap(), source);
        let err = read_bounded(&path, len - 1).unwrap_err();
        assert!(matches!(err, ParseError::TooLarge { size: 16, limit: 15, .. }));
    }

    #[test]
    fn test_read_bounded_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, [0xff, 0xfe, b'{', b'}']).unwrap();

        let err = read_bounded(&path, 1024).unwrap_err();
        assert!(matches!(err, ParseError::Io { ref source, .. } if source.kind() == io::ErrorKind::InvalidData));
    }

    #[test]
    fn test_transformer_table_optional() {
        let doc: ModelDocument = decode(r#"{"entities": []}"#, MEMORY_ORIGIN).unwrap();
        assert!(doc.transformer_class_names.is_empty());

        let doc: ModelDocument = decode(
            r#"{"entities": [], "transformerClassNames": {"Color": "ColorTransformer"}}"#,
            MEMORY_ORIGIN,
        )
        .unwrap();
        assert_eq!(doc.transformer_class_names["Color"], "ColorTransformer");
        assert!(!serde_json::to_string(&ModelDocument::default()).unwrap().contains("transformer"));
    }

    #[test]
    fn test_read_bounded_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_bounded(&dir.path().join("missing.json"), 1024).unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }
}

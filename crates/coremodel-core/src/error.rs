//! Core error types.

use crate::catalog::EntityId;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A model or support file could not be read or decoded into records.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file exceeds the configured size limit.
    #[error("{} is {size} bytes, exceeding the {limit} byte limit", path.display())]
    TooLarge {
        /// Path that was being read.
        path: PathBuf,
        /// Actual file size.
        size: u64,
        /// Configured limit.
        limit: u64,
    },

    /// The document is not valid for its format.
    #[error("malformed document {origin}: {source}")]
    Syntax {
        /// Where the document came from (a path, or `<memory>`).
        origin: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// Two class names in a support descriptor map to the same entity.
    #[error("entity '{entity}' is mapped by both '{first}' and '{second}'")]
    AmbiguousClassMapping {
        /// Entity name mapped twice.
        entity: String,
        /// First class name seen for the entity.
        first: String,
        /// Second class name seen for the entity.
        second: String,
    },
}

/// Decoded records violate a structural invariant of the entity graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// An entity was declared without a name.
    #[error("entity name must not be empty")]
    EmptyName,

    /// Two entities share a name.
    #[error("duplicate entity name '{name}'")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },

    /// An entity references a parent that does not exist.
    #[error("entity '{entity}' references unknown parent '{parent}'")]
    UnknownParent {
        /// The child entity.
        entity: String,
        /// The missing parent name.
        parent: String,
    },

    /// An entity would become its own ancestor.
    #[error("entity '{entity}' is part of an inheritance cycle")]
    Cycle {
        /// An entity on the cycle.
        entity: String,
    },

    /// An entity id does not belong to this model.
    #[error("no entity with id {id}")]
    UnknownEntity {
        /// The stale or foreign id.
        id: EntityId,
    },

    /// A support descriptor names an entity that the model does not have.
    #[error("support descriptor maps unknown entity '{entity}'")]
    UnmatchedOverlay {
        /// The entity name from the descriptor.
        entity: String,
    },

    /// A concrete entity has no backing class after the overlay.
    #[error("concrete entity '{entity}' has no class name")]
    UnresolvedClass {
        /// The unresolved entity.
        entity: String,
    },
}

/// Model loading errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Input could not be read or decoded.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Input decoded but describes an invalid graph.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl Error {
    /// Returns the validation error, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Error::Validation(e) => Some(e),
            Error::Parse(_) => None,
        }
    }

    /// Returns true if the input could not be read or decoded.
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::from(ValidationError::UnknownParent {
            entity: "Employee".into(),
            parent: "Person".into(),
        });
        assert_eq!(
            err.to_string(),
            "validation error: entity 'Employee' references unknown parent 'Person'"
        );
        assert!(!err.is_parse());
        assert!(err.as_validation().is_some());
    }

    #[test]
    fn test_parse_error_classification() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(ParseError::Syntax {
            origin: "<memory>".into(),
            source,
        });
        assert!(err.is_parse());
        assert!(err.as_validation().is_none());
        assert!(err.to_string().starts_with("parse error: malformed document <memory>"));
    }
}

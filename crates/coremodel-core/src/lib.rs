//! CoreModel Core - entity model descriptions for persistence runtimes.
//!
//! This crate loads entity models from disk, validates their inheritance
//! hierarchy, and overlays platform class names from support descriptors.
//! It performs no storage, querying, or object instantiation.

pub mod catalog;
pub mod config;
pub mod error;

pub use catalog::{
    Ancestors, Descendants, Entity, EntityDescription, EntityId, EntityRecord, Model,
    OverlayReport, SupportDescriptor,
};
pub use config::{LoadOptions, OverlayPolicy};
pub use error::{Error, ParseError, Result, ValidationError};

//! Entity catalog for CoreModel.
//!
//! The catalog describes the shape of a persisted object graph: which
//! entities exist, how they inherit from one another, and which runtime
//! classes back them.

mod entity;
mod model;
mod record;
mod support;

pub use entity::{Ancestors, Descendants, Entity, EntityDescription, EntityId};
pub use model::{Model, OverlayReport};
pub use record::EntityRecord;
pub use support::SupportDescriptor;

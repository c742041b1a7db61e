//! Entity descriptions and hierarchy navigation.

use super::Model;
use std::collections::BTreeMap;
use std::fmt;

/// Index of an entity within its owning [`Model`].
///
/// Ids are only meaningful for the model that issued them and are
/// invalidated by [`Model::remove_entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(usize);

impl EntityId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position of the entity in the model's storage.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stored description of one entity.
///
/// Parent and children are held as ids into the owning model, so a
/// description never owns or keeps alive another node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescription {
    pub(crate) name: String,
    pub(crate) class_name: String,
    pub(crate) is_abstract: bool,
    pub(crate) superentity: Option<EntityId>,
    pub(crate) subentities: Vec<EntityId>,
}

impl EntityDescription {
    pub(crate) fn new(name: String, class_name: String, is_abstract: bool) -> Self {
        Self {
            name,
            class_name,
            is_abstract,
            superentity: None,
            subentities: Vec::new(),
        }
    }

    /// Entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backing class name, or `None` while unresolved.
    pub fn class_name(&self) -> Option<&str> {
        if self.class_name.is_empty() {
            None
        } else {
            Some(&self.class_name)
        }
    }

    /// Whether the entity is abstract.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Id of the parent entity.
    pub fn superentity_id(&self) -> Option<EntityId> {
        self.superentity
    }

    /// Ids of the direct children, in declaration order.
    pub fn subentity_ids(&self) -> &[EntityId] {
        &self.subentities
    }
}

/// A borrowed view of one entity together with its model.
#[derive(Clone, Copy)]
pub struct Entity<'m> {
    model: &'m Model,
    id: EntityId,
}

impl<'m> Entity<'m> {
    pub(crate) fn new(model: &'m Model, id: EntityId) -> Self {
        Self { model, id }
    }

    /// Id of this entity.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The model that owns this entity.
    pub fn model(&self) -> &'m Model {
        self.model
    }

    /// The stored description.
    pub fn description(&self) -> &'m EntityDescription {
        self.model.node(self.id)
    }

    /// Entity name.
    pub fn name(&self) -> &'m str {
        &self.description().name
    }

    /// Backing class name, or `None` while unresolved.
    pub fn class_name(&self) -> Option<&'m str> {
        self.description().class_name()
    }

    /// Whether the entity is abstract.
    pub fn is_abstract(&self) -> bool {
        self.description().is_abstract
    }

    /// The parent entity, if any.
    pub fn superentity(&self) -> Option<Entity<'m>> {
        self.description()
            .superentity
            .map(|id| Entity::new(self.model, id))
    }

    /// Direct children in declaration order.
    pub fn subentities(&self) -> impl ExactSizeIterator<Item = Entity<'m>> + 'm {
        let model = self.model;
        self.description()
            .subentities
            .iter()
            .map(move |&id| Entity::new(model, id))
    }

    /// Direct children keyed by name.
    pub fn subentities_by_name(&self) -> BTreeMap<&'m str, Entity<'m>> {
        self.subentities().map(|e| (e.name(), e)).collect()
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self) -> Ancestors<'m> {
        Ancestors {
            next: self.superentity(),
        }
    }

    /// This entity and its whole subtree, depth-first pre-order.
    pub fn descendants(&self) -> Descendants<'m> {
        Descendants::new(self.model, vec![self.id])
    }

    /// True if `other` is this entity or one of its ancestors.
    pub fn is_kind_of(&self, other: &Entity<'_>) -> bool {
        if !std::ptr::eq(self.model, other.model) {
            return false;
        }
        self.id == other.id || self.ancestors().any(|a| a.id == other.id)
    }

    /// Depth below the top level (top-level entities are at depth 0).
    pub fn depth(&self) -> usize {
        self.ancestors().count()
    }
}

impl PartialEq for Entity<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.model, other.model) && self.id == other.id
    }
}

impl Eq for Entity<'_> {}

impl fmt::Debug for Entity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("class_name", &self.class_name())
            .field("abstract", &self.is_abstract())
            .finish()
    }
}

/// Iterator over an entity's ancestors.
pub struct Ancestors<'m> {
    next: Option<Entity<'m>>,
}

impl<'m> Iterator for Ancestors<'m> {
    type Item = Entity<'m>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.superentity();
        Some(current)
    }
}

/// Depth-first pre-order iterator over one or more subtrees.
pub struct Descendants<'m> {
    model: &'m Model,
    stack: Vec<EntityId>,
}

impl<'m> Descendants<'m> {
    /// `roots` are visited in the given order.
    pub(crate) fn new(model: &'m Model, mut roots: Vec<EntityId>) -> Self {
        roots.reverse();
        Self {
            model,
            stack: roots,
        }
    }
}

impl<'m> Iterator for Descendants<'m> {
    type Item = Entity<'m>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.model.node(id).subentities.iter().rev().copied());
        Some(Entity::new(self.model, id))
    }
}

//! The entity model: a validated forest of entity descriptions.

use super::entity::{Descendants, Entity, EntityDescription, EntityId};
use super::record::{decode, read_bounded, EntityRecord, ModelDocument, MEMORY_ORIGIN};
use super::SupportDescriptor;
use crate::config::{LoadOptions, OverlayPolicy};
use crate::error::{Result, ValidationError};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Outcome of merging a support descriptor into a model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayReport {
    /// Entities whose class name was filled in, as (entity, class) pairs.
    pub assigned: Vec<(String, String)>,
    /// Entity names from the descriptor that the model does not contain.
    pub unmatched: Vec<String>,
}

/// A complete, validated set of entities describing one schema.
///
/// Entities live in a single arena owned by the model; parent and child
/// links are [`EntityId`]s into it. The name index is rebuilt on every
/// structural change, so lookups never observe a stale tree.
#[derive(Debug, Clone, Default)]
pub struct Model {
    /// Every entity, in creation order.
    nodes: Vec<EntityDescription>,
    /// Top-level entities, in insertion order.
    entities: Vec<EntityId>,
    /// Name index over every entity.
    by_name: HashMap<String, EntityId>,
    /// Class name -> transformer name, carried over from merged descriptors.
    transformers: BTreeMap<String, String>,
}

impl Model {
    /// Create an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a model file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_options(path, None, &LoadOptions::default())
    }

    /// Load a model file and overlay class names from `support`.
    pub fn load_with_support(path: impl AsRef<Path>, support: &SupportDescriptor) -> Result<Self> {
        Self::load_with_options(path, Some(support), &LoadOptions::default())
    }

    /// Load a model file with explicit options and an optional overlay.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load_with_options(
        path: impl AsRef<Path>,
        support: Option<&SupportDescriptor>,
        options: &LoadOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let source = read_bounded(path, options.max_file_size)?;
        let model = Self::parse(&source, &path.display().to_string(), support, options)?;

        info!(
            entities = model.len(),
            top_level = model.entities.len(),
            "Model loaded"
        );
        Ok(model)
    }

    /// Parse a model from a JSON string.
    pub fn from_json(source: &str) -> Result<Self> {
        Self::parse(source, MEMORY_ORIGIN, None, &LoadOptions::default())
    }

    fn parse(
        source: &str,
        origin: &str,
        support: Option<&SupportDescriptor>,
        options: &LoadOptions,
    ) -> Result<Self> {
        let ModelDocument {
            entities,
            transformer_class_names,
        } = decode(source, origin)?;
        let mut model = Self::from_records(entities)?;
        model.transformers = transformer_class_names;

        if let Some(support) = support {
            model.merge_support(support, options.overlay_policy)?;
        }
        if options.require_concrete_class_names {
            model.check_class_names()?;
        }
        Ok(model)
    }

    /// Build a model from flat records.
    ///
    /// Fails on empty or duplicate names, parents that do not exist, and
    /// parent cycles. Top-level entities keep the order of their records.
    pub fn from_records(
        records: impl IntoIterator<Item = EntityRecord>,
    ) -> std::result::Result<Self, ValidationError> {
        let mut nodes = Vec::new();
        let mut by_name = HashMap::new();
        let mut parents = Vec::new();

        for record in records {
            if record.name.is_empty() {
                return Err(ValidationError::EmptyName);
            }
            if by_name.contains_key(&record.name) {
                return Err(ValidationError::DuplicateName { name: record.name });
            }
            let id = EntityId::new(nodes.len());
            by_name.insert(record.name.clone(), id);
            parents.push(record.parent);
            nodes.push(EntityDescription::new(
                record.name,
                record.class_name.unwrap_or_default(),
                record.is_abstract,
            ));
        }

        for (index, parent) in parents.into_iter().enumerate() {
            if let Some(parent) = parent {
                let Some(&parent_id) = by_name.get(&parent) else {
                    return Err(ValidationError::UnknownParent {
                        entity: nodes[index].name.clone(),
                        parent,
                    });
                };
                nodes[index].superentity = Some(parent_id);
            }
        }

        if let Some(id) = find_cycle(&nodes) {
            return Err(ValidationError::Cycle {
                entity: nodes[id.index()].name.clone(),
            });
        }

        let mut entities = Vec::new();
        for index in 0..nodes.len() {
            let id = EntityId::new(index);
            match nodes[index].superentity {
                Some(parent) => nodes[parent.index()].subentities.push(id),
                None => entities.push(id),
            }
        }

        debug!(entities = nodes.len(), "Built entity hierarchy");
        Ok(Self {
            nodes,
            entities,
            by_name,
            transformers: BTreeMap::new(),
        })
    }

    /// Fill in unresolved class names from `support`.
    ///
    /// Class names already present are kept. Descriptor entries naming
    /// entities this model lacks are handled per `policy`; with
    /// [`OverlayPolicy::Reject`] the model is left untouched on failure.
    pub fn merge_support(
        &mut self,
        support: &SupportDescriptor,
        policy: OverlayPolicy,
    ) -> std::result::Result<OverlayReport, ValidationError> {
        let mut report = OverlayReport::default();

        for (class, entity) in support.entity_class_names() {
            if self.by_name.contains_key(entity) {
                continue;
            }
            match policy {
                OverlayPolicy::Reject => {
                    return Err(ValidationError::UnmatchedOverlay {
                        entity: entity.to_string(),
                    });
                }
                OverlayPolicy::Warn => {
                    warn!(entity, class, "Support descriptor maps an unknown entity");
                }
                OverlayPolicy::Ignore => {}
            }
            report.unmatched.push(entity.to_string());
        }

        for node in &mut self.nodes {
            let Some(class) = support.class_name_for_entity(&node.name) else {
                continue;
            };
            if node.class_name.is_empty() {
                node.class_name = class.to_string();
                report.assigned.push((node.name.clone(), node.class_name.clone()));
            } else if node.class_name != class {
                debug!(
                    entity = %node.name,
                    declared = %node.class_name,
                    overlay = class,
                    "Keeping declared class name"
                );
            }
        }

        self.transformers.extend(
            support
                .transformer_class_names()
                .map(|(class, transformer)| (class.to_string(), transformer.to_string())),
        );

        debug!(
            assigned = report.assigned.len(),
            unmatched = report.unmatched.len(),
            "Merged support descriptor"
        );
        Ok(report)
    }

    /// Fail if a concrete entity has no class name.
    pub fn check_class_names(&self) -> std::result::Result<(), ValidationError> {
        match self
            .iter()
            .find(|e| !e.is_abstract() && e.class_name().is_none())
        {
            Some(entity) => Err(ValidationError::UnresolvedClass {
                entity: entity.name().to_string(),
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn node(&self, id: EntityId) -> &EntityDescription {
        &self.nodes[id.index()]
    }

    fn check_id(&self, id: EntityId) -> std::result::Result<(), ValidationError> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(ValidationError::UnknownEntity { id })
        }
    }

    /// Look up an entity by name, at any depth.
    pub fn entity(&self, name: &str) -> Option<Entity<'_>> {
        self.by_name.get(name).map(|&id| Entity::new(self, id))
    }

    /// Look up an entity by id.
    ///
    /// Ids are plain indices: one issued before [`Model::remove_entity`] may
    /// resolve to a different entity afterwards.
    pub fn get(&self, id: EntityId) -> Option<Entity<'_>> {
        self.check_id(id).ok().map(|()| Entity::new(self, id))
    }

    /// Top-level entities, in insertion order.
    pub fn entities(&self) -> impl ExactSizeIterator<Item = Entity<'_>> {
        self.entities.iter().map(move |&id| Entity::new(self, id))
    }

    /// Every entity keyed by name.
    pub fn entities_by_name(&self) -> BTreeMap<&str, Entity<'_>> {
        self.by_name
            .iter()
            .map(|(name, &id)| (name.as_str(), Entity::new(self, id)))
            .collect()
    }

    /// Every entity, depth-first from each top-level entity.
    pub fn iter(&self) -> Descendants<'_> {
        Descendants::new(self, self.entities.clone())
    }

    /// Number of entities at all depths.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the model has no entities.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The entity backed by `class`, if any.
    pub fn entity_for_class(&self, class: &str) -> Option<Entity<'_>> {
        self.iter().find(|e| e.class_name() == Some(class))
    }

    /// Transformer registered for `class` by a merged descriptor.
    pub fn transformer_for_class(&self, class: &str) -> Option<&str> {
        self.transformers.get(class).map(String::as_str)
    }

    /// All (class, transformer) pairs from merged descriptors.
    pub fn transformer_class_names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.transformers
            .iter()
            .map(|(c, t)| (c.as_str(), t.as_str()))
    }

    /// Add an entity, attaching it to the parent named in `record`.
    pub fn add_entity(
        &mut self,
        record: EntityRecord,
    ) -> std::result::Result<EntityId, ValidationError> {
        if record.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.by_name.contains_key(&record.name) {
            return Err(ValidationError::DuplicateName { name: record.name });
        }
        let parent = match record.parent {
            Some(parent) => match self.by_name.get(&parent) {
                Some(&id) => Some(id),
                None => {
                    return Err(ValidationError::UnknownParent {
                        entity: record.name,
                        parent,
                    });
                }
            },
            None => None,
        };

        let id = EntityId::new(self.nodes.len());
        let mut node = EntityDescription::new(
            record.name,
            record.class_name.unwrap_or_default(),
            record.is_abstract,
        );
        node.superentity = parent;
        self.by_name.insert(node.name.clone(), id);
        self.nodes.push(node);

        match parent {
            Some(parent) => self.nodes[parent.index()].subentities.push(id),
            None => self.entities.push(id),
        }
        Ok(id)
    }

    /// Move `id` under `parent`, or to the top level when `parent` is `None`.
    ///
    /// The entity is appended after its new siblings. Fails with
    /// [`ValidationError::Cycle`] if `parent` is `id` or one of its
    /// descendants, leaving the model unchanged.
    pub fn set_superentity(
        &mut self,
        id: EntityId,
        parent: Option<EntityId>,
    ) -> std::result::Result<(), ValidationError> {
        self.check_id(id)?;
        if let Some(parent) = parent {
            self.check_id(parent)?;
            let target = Entity::new(self, parent);
            if target.id() == id || target.ancestors().any(|a| a.id() == id) {
                return Err(ValidationError::Cycle {
                    entity: self.node(id).name.clone(),
                });
            }
        }

        self.detach(id);
        self.nodes[id.index()].superentity = parent;
        match parent {
            Some(parent) => self.nodes[parent.index()].subentities.push(id),
            None => self.entities.push(id),
        }
        Ok(())
    }

    /// Set or clear (with an empty string) the class name of `id`.
    pub fn set_class_name(
        &mut self,
        id: EntityId,
        class_name: impl Into<String>,
    ) -> std::result::Result<(), ValidationError> {
        self.check_id(id)?;
        self.nodes[id.index()].class_name = class_name.into();
        Ok(())
    }

    /// Mark `id` abstract or concrete.
    pub fn set_abstract(
        &mut self,
        id: EntityId,
        is_abstract: bool,
    ) -> std::result::Result<(), ValidationError> {
        self.check_id(id)?;
        self.nodes[id.index()].is_abstract = is_abstract;
        Ok(())
    }

    /// Remove `id` and its whole subtree, returning them as a standalone model.
    ///
    /// Every outstanding [`EntityId`] of this model is invalidated. The arena
    /// is compacted, so an old id that is still in range names whichever
    /// entity moved into its slot; look entities up again by name.
    pub fn remove_entity(&mut self, id: EntityId) -> std::result::Result<Self, ValidationError> {
        let removed = self.duplicate(id)?;
        let doomed: Vec<bool> = {
            let mut doomed = vec![false; self.nodes.len()];
            for entity in Entity::new(self, id).descendants() {
                doomed[entity.id().index()] = true;
            }
            doomed
        };
        self.detach(id);

        let mut remap = vec![None; self.nodes.len()];
        let mut next = 0;
        for (index, slot) in remap.iter_mut().enumerate() {
            if !doomed[index] {
                *slot = Some(EntityId::new(next));
                next += 1;
            }
        }
        let moved = |old: EntityId| remap[old.index()];

        let nodes = std::mem::take(&mut self.nodes);
        self.nodes = nodes
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !doomed[*index])
            .map(|(_, mut node)| {
                node.superentity = node.superentity.and_then(moved);
                node.subentities = node.subentities.iter().filter_map(|&c| moved(c)).collect();
                node
            })
            .collect();
        self.entities = self.entities.iter().filter_map(|&e| moved(e)).collect();
        self.rebuild_index();

        debug!(
            removed = removed.len(),
            remaining = self.nodes.len(),
            "Removed entity subtree"
        );
        Ok(removed)
    }

    /// Deep-copy `id` and its subtree into a new standalone model.
    ///
    /// The copy's single top-level entity is the duplicate of `id`; every
    /// link in the copy points into the copy. Transformer mappings carry over.
    pub fn duplicate(&self, id: EntityId) -> std::result::Result<Self, ValidationError> {
        self.check_id(id)?;
        let mut nodes = Vec::new();
        let root = self.copy_subtree(id, None, &mut nodes);

        let mut copy = Self {
            nodes,
            entities: vec![root],
            by_name: HashMap::new(),
            transformers: self.transformers.clone(),
        };
        copy.rebuild_index();
        Ok(copy)
    }

    fn copy_subtree(
        &self,
        id: EntityId,
        parent: Option<EntityId>,
        into: &mut Vec<EntityDescription>,
    ) -> EntityId {
        let source = self.node(id);
        let copy_id = EntityId::new(into.len());
        let mut copy = EntityDescription::new(
            source.name.clone(),
            source.class_name.clone(),
            source.is_abstract,
        );
        copy.superentity = parent;
        into.push(copy);

        for &child in &source.subentities {
            let child_copy = self.copy_subtree(child, Some(copy_id), into);
            into[copy_id.index()].subentities.push(child_copy);
        }
        copy_id
    }

    /// Unlink `id` from its parent's children or from the top level.
    fn detach(&mut self, id: EntityId) {
        let siblings = match self.nodes[id.index()].superentity {
            Some(parent) => &mut self.nodes[parent.index()].subentities,
            None => &mut self.entities,
        };
        siblings.retain(|&s| s != id);
    }

    fn rebuild_index(&mut self) {
        self.by_name = self
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.name.clone(), EntityId::new(index)))
            .collect();
    }

    /// Flat records, depth-first, parents before children.
    pub fn to_records(&self) -> Vec<EntityRecord> {
        self.iter()
            .map(|entity| EntityRecord {
                name: entity.name().to_string(),
                class_name: entity.class_name().map(str::to_string),
                is_abstract: entity.is_abstract(),
                parent: entity.superentity().map(|p| p.name().to_string()),
            })
            .collect()
    }

    /// Render the model in the model file format, transformer table included.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&ModelDocument {
            entities: self.to_records(),
            transformer_class_names: self.transformers.clone(),
        })
    }
}

/// Structural equality: same forest, same order, same transformer table.
impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.transformers == other.transformers && self.to_records() == other.to_records()
    }
}

impl Eq for Model {}

/// Returns an entity on a parent cycle, if there is one.
fn find_cycle(nodes: &[EntityDescription]) -> Option<EntityId> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut path = Vec::new();

    for start in 0..nodes.len() {
        let mut current = Some(EntityId::new(start));
        while let Some(id) = current {
            match marks[id.index()] {
                Mark::Done => break,
                Mark::OnPath => return Some(id),
                Mark::Unvisited => {
                    marks[id.index()] = Mark::OnPath;
                    path.push(id);
                    current = nodes[id.index()].superentity;
                }
            }
        }
        for id in path.drain(..) {
            marks[id.index()] = Mark::Done;
        }
    }
    None
}

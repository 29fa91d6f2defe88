// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene entities and the ordered entity registry.
//!
//! The registry preserves insertion order: undo records and scene files both
//! rely on an entity's index in that order.

use crate::math::Transform;
use crate::value::{AttributeMap, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum parent-chain depth followed when resolving world transforms.
const MAX_HIERARCHY_DEPTH: usize = 64;

/// Unique identifier for entities in the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Create a new random entity ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shape used for pointer picking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColliderKind {
    /// Unit cube in entity space
    Box,
    /// Sphere of diameter 1 in entity space
    Sphere,
    /// Model mesh, approximated by its unit bounds
    Mesh,
}

impl ColliderKind {
    /// Parse the persisted name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "box" => Some(Self::Box),
            "sphere" => Some(Self::Sphere),
            "mesh" => Some(Self::Mesh),
            _ => None,
        }
    }

    /// Persisted name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Sphere => "sphere",
            Self::Mesh => "mesh",
        }
    }
}

/// A scene object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable identity
    pub id: EntityId,
    /// Registered type name
    pub type_name: String,
    /// Transform relative to the parent (world transform when unparented)
    pub transform: Transform,
    /// Parent entity, if any
    pub parent: Option<EntityId>,
    /// Whether pointer picking may select this entity
    pub selectable: bool,
    /// Helper entities owned by the editor; never persisted
    pub editor_only: bool,
    /// Open attribute set (`name`, `model`, `collider`, ...)
    pub attributes: AttributeMap,
}

impl Entity {
    /// Create an entity of the given type with an identity transform.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            type_name: type_name.into(),
            transform: Transform::IDENTITY,
            parent: None,
            selectable: true,
            editor_only: false,
            attributes: AttributeMap::new(),
        }
    }

    /// Builder-style attribute assignment.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Builder-style transform assignment.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Clone this entity under a fresh identity.
    pub fn duplicate(&self) -> Self {
        Self {
            id: EntityId::new(),
            ..self.clone()
        }
    }

    /// Look up an attribute.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Display name, falling back to the type name.
    pub fn name(&self) -> &str {
        self.attribute("name")
            .and_then(Value::as_str)
            .unwrap_or(&self.type_name)
    }

    /// Model name, if any.
    pub fn model(&self) -> Option<&str> {
        self.attribute("model").and_then(Value::as_str)
    }

    /// Picking collider, if any.
    pub fn collider(&self) -> Option<ColliderKind> {
        self.attribute("collider")
            .and_then(Value::as_str)
            .and_then(ColliderKind::parse)
    }
}

/// Ordered collection of the entities in one scene cell.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: IndexMap<EntityId, Entity>,
}

impl EntityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate entities in order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Ids in order
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Look up an entity
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Look up an entity mutably
    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Whether `id` is present
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Position of `id` in the registry order
    pub fn index_of(&self, id: &EntityId) -> Option<usize> {
        self.entities.get_index_of(id)
    }

    /// Entity at `index`
    pub fn get_index(&self, index: usize) -> Option<&Entity> {
        self.entities.get_index(index).map(|(_, e)| e)
    }

    /// Append an entity
    pub fn push(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        self.entities.insert(id, entity);
        id
    }

    /// Insert at `index` (clamped to the end). Returns the index used.
    ///
    /// An entity with the same id is replaced and moved.
    pub fn insert_at(&mut self, index: usize, entity: Entity) -> usize {
        let id = entity.id;
        self.entities.shift_remove(&id);
        let index = index.min(self.entities.len());
        self.entities.shift_insert(index, id, entity);
        index
    }

    /// Remove an entity, returning its former index and data.
    pub fn remove(&mut self, id: &EntityId) -> Option<(usize, Entity)> {
        self.entities
            .shift_remove_full(id)
            .map(|(index, _, entity)| (index, entity))
    }

    /// Remove every entity
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Direct children of `id`, in registry order
    pub fn children_of(&self, id: &EntityId) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| e.parent.as_ref() == Some(id))
            .map(|e| e.id)
            .collect()
    }

    /// `ids` plus all their descendants, each once, in registry order.
    pub fn with_descendants(&self, ids: &[EntityId]) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|e| ids.contains(&e.id) || self.has_ancestor_in(e.id, ids))
            .map(|e| e.id)
            .collect()
    }

    /// Whether any ancestor of `id` is in `ancestors`.
    pub fn has_ancestor_in(&self, id: EntityId, ancestors: &[EntityId]) -> bool {
        let mut current = self.get(&id).and_then(|e| e.parent);
        for _ in 0..MAX_HIERARCHY_DEPTH {
            let Some(parent) = current else {
                return false;
            };
            if ancestors.contains(&parent) {
                return true;
            }
            current = self.get(&parent).and_then(|e| e.parent);
        }
        false
    }

    /// Number of ancestors of `id` present in the registry; roots are 0.
    pub fn depth(&self, id: &EntityId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(|e| e.parent);
        while let Some(parent) = current.and_then(|p| self.get(&p)) {
            depth += 1;
            if depth >= MAX_HIERARCHY_DEPTH {
                break;
            }
            current = parent.parent;
        }
        depth
    }

    /// World transform of the parent of `id`, identity for roots.
    fn parent_world(&self, id: &EntityId) -> Transform {
        self.get(id)
            .and_then(|e| e.parent)
            .and_then(|parent| self.world_transform(&parent))
            .unwrap_or(Transform::IDENTITY)
    }

    /// World transform of `id`, composed through its parent chain.
    ///
    /// A parent id that is not in the registry is treated as the scene root.
    pub fn world_transform(&self, id: &EntityId) -> Option<Transform> {
        let entity = self.get(id)?;
        let mut chain = vec![entity.transform];
        let mut current = entity.parent;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            let Some(parent) = current.and_then(|p| self.get(&p)) else {
                break;
            };
            chain.push(parent.transform);
            current = parent.parent;
        }
        if chain.len() == 1 {
            return Some(entity.transform);
        }
        let matrix = chain
            .iter()
            .rev()
            .fold(glam::Mat4::IDENTITY, |acc, t| acc * t.to_matrix());
        Some(Transform::from_matrix(matrix))
    }

    /// Set the world transform of `id`, keeping its parent.
    pub fn set_world_transform(&mut self, id: &EntityId, world: Transform) -> bool {
        if !self.contains(id) {
            return false;
        }
        let parent_world = self.parent_world(id);
        let local = if self.get(id).and_then(|e| e.parent).is_some() {
            parent_world.relative(&world)
        } else {
            world
        };
        if let Some(entity) = self.get_mut(id) {
            entity.transform = local;
        }
        true
    }

    /// Set the parent of `id` without touching its local transform.
    ///
    /// Refuses unknown parents and parents that would create a cycle.
    pub fn set_parent(&mut self, id: &EntityId, parent: EntityId) -> bool {
        if parent == *id || !self.contains(&parent) || self.has_ancestor_in(parent, &[*id]) {
            return false;
        }
        match self.get_mut(id) {
            Some(entity) => {
                entity.parent = Some(parent);
                true
            }
            None => false,
        }
    }

    /// Change the parent of `id` while keeping its world transform.
    ///
    /// Refuses parents that would create a cycle.
    pub fn set_parent_keep_world(&mut self, id: &EntityId, parent: Option<EntityId>) -> bool {
        let Some(world) = self.world_transform(id) else {
            return false;
        };
        if let Some(p) = parent {
            if p == *id || self.has_ancestor_in(p, &[*id]) {
                tracing::warn!("Refusing to parent {} under its own descendant", id);
                return false;
            }
        }
        if let Some(entity) = self.get_mut(id) {
            entity.parent = parent;
        }
        self.set_world_transform(id, world)
    }
}

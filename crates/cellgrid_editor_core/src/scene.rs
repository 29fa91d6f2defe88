// SPDX-License-Identifier: MIT OR Apache-2.0
//! The editable contents of one loaded scene cell.

use crate::entity::{Entity, EntityId, EntityRegistry};
use crate::history::UndoEngine;
use crate::math::Transform;
use crate::selection::Selection;
use crate::value::Value;

/// Entities and selection of one scene cell.
///
/// Every removal goes through this type so the selection never refers to an
/// entity that is no longer registered.
#[derive(Debug, Clone, Default)]
pub struct SceneState {
    /// Entities in persisted order
    pub registry: EntityRegistry,
    /// Current selection
    pub selection: Selection,
}

impl SceneState {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing registry with an empty selection
    pub fn from_registry(registry: EntityRegistry) -> Self {
        Self {
            registry,
            selection: Selection::new(),
        }
    }

    /// Remove an entity and deselect it
    pub fn remove_entity(&mut self, id: &EntityId) -> Option<(usize, Entity)> {
        self.selection.remove(id);
        self.registry.remove(id)
    }

    /// Selected ids that are still registered, in selection order
    pub fn selected_ids(&self) -> Vec<EntityId> {
        self.selection
            .iter()
            .filter(|id| self.registry.contains(id))
            .copied()
            .collect()
    }

    /// Read a persisted field by name (`position`, `rotation`, `scale` or an attribute)
    pub fn field(&self, id: &EntityId, key: &str) -> Option<Value> {
        let entity = self.registry.get(id)?;
        let value = match key {
            "position" => Value::Vec3(entity.transform.position),
            "rotation" => Value::Vec3(entity.transform.euler_degrees()),
            "scale" => Value::Vec3(entity.transform.scale),
            "selectable" => Value::Bool(entity.selectable),
            _ => entity.attributes.get(key).cloned().unwrap_or_default(),
        };
        Some(value)
    }

    /// Write a persisted field by name. Returns `false` if the entity is missing
    /// or the value does not fit the field.
    pub fn set_field(&mut self, id: &EntityId, key: &str, value: Value) -> bool {
        let Some(entity) = self.registry.get_mut(id) else {
            return false;
        };
        match key {
            "position" | "rotation" | "scale" => {
                let Some(v) = value.as_vec3() else {
                    return false;
                };
                let t = entity.transform;
                entity.transform = match key {
                    "position" => Transform { position: v, ..t },
                    "scale" => Transform { scale: v, ..t },
                    _ => Transform::from_euler_degrees(t.position, v, t.scale),
                };
            }
            "selectable" => {
                let Some(b) = value.as_bool() else {
                    return false;
                };
                entity.selectable = b;
            }
            _ if value.is_none() => {
                entity.attributes.shift_remove(key);
            }
            _ => {
                entity.attributes.insert(key.to_string(), value);
            }
        }
        true
    }
}

/// A loaded cell: its state plus its own undo log.
#[derive(Debug)]
pub struct LoadedScene {
    /// Entities and selection
    pub state: SceneState,
    /// Undo log of this cell
    pub history: UndoEngine,
}

impl LoadedScene {
    /// Create a loaded scene around `state`
    pub fn new(state: SceneState, max_undo_depth: usize) -> Self {
        Self {
            state,
            history: UndoEngine::new(max_undo_depth),
        }
    }

    /// Undo the most recent applied entry
    pub fn undo(&mut self) -> crate::history::Result<String> {
        self.history.undo(&mut self.state)
    }

    /// Redo the next entry
    pub fn redo(&mut self) -> crate::history::Result<String> {
        self.history.redo(&mut self.state)
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Linear undo/redo log.
//!
//! The log holds every recorded edit of a scene cell and a cursor marking how
//! many of them are applied. Recording after an undo discards the entries
//! beyond the cursor. Records address entities by [`EntityId`]; the saved
//! indices only decide where a re-inserted entity goes in registry order.

use crate::entity::{Entity, EntityId};
use crate::scene::SceneState;
use crate::value::Value;
use std::collections::VecDeque;
use thiserror::Error;

/// Default maximum undo history depth
pub const MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Which part of an entity an [`AttributeChange`] touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// The world transform (`Value::Transform`)
    WorldTransform,
    /// The parent reference (`Value::Entity` or `Value::None`), world transform kept
    Parent,
    /// A persisted field by name
    Field(String),
}

/// One attribute of one entity changing from `old` to `new`
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    /// Target entity
    pub entity: EntityId,
    /// Attribute changed
    pub attribute: Attribute,
    /// Value before the edit
    pub old: Value,
    /// Value after the edit
    pub new: Value,
}

/// An entity together with its index in registry order
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    /// Index in the registry at the time of the snapshot
    pub index: usize,
    /// Full entity data
    pub entity: Entity,
}

/// A recorded edit
#[derive(Debug, Clone, PartialEq)]
pub enum UndoRecord {
    /// Attribute edits, applied together
    AttributeChanges(Vec<AttributeChange>),
    /// Entities were removed; undo re-inserts them
    DeleteEntities(Vec<EntitySnapshot>),
    /// Entities were added; undo removes them
    RestoreEntities(Vec<EntitySnapshot>),
    /// Several records forming one edit
    Batch(Vec<UndoRecord>),
}

impl UndoRecord {
    fn apply(&self, state: &mut SceneState, forward: bool) {
        match self {
            Self::AttributeChanges(changes) => {
                for change in changes {
                    let value = if forward { &change.new } else { &change.old };
                    apply_attribute(state, change, value.clone());
                }
            }
            Self::DeleteEntities(snapshots) => {
                if forward {
                    remove_snapshots(state, snapshots);
                } else {
                    insert_snapshots(state, snapshots);
                }
            }
            Self::RestoreEntities(snapshots) => {
                if forward {
                    insert_snapshots(state, snapshots);
                } else {
                    remove_snapshots(state, snapshots);
                }
            }
            Self::Batch(records) => {
                if forward {
                    for record in records {
                        record.apply(state, true);
                    }
                } else {
                    for record in records.iter().rev() {
                        record.apply(state, false);
                    }
                }
            }
        }
    }
}

fn apply_attribute(state: &mut SceneState, change: &AttributeChange, value: Value) {
    let id = &change.entity;
    let applied = match (&change.attribute, value) {
        (Attribute::WorldTransform, Value::Transform(t)) => {
            state.registry.set_world_transform(id, t)
        }
        (Attribute::Parent, Value::Entity(parent)) => {
            state.registry.set_parent_keep_world(id, Some(parent))
        }
        (Attribute::Parent, Value::None) => state.registry.set_parent_keep_world(id, None),
        (Attribute::Field(key), value) => state.set_field(id, key, value),
        (attribute, value) => {
            tracing::warn!("Mismatched undo value {:?} for {:?}", value, attribute);
            true
        }
    };
    if !applied {
        tracing::warn!(
            "Skipping {:?} change: entity {} is not in the scene",
            change.attribute,
            id
        );
    }
}

fn insert_snapshots(state: &mut SceneState, snapshots: &[EntitySnapshot]) {
    let mut ordered: Vec<_> = snapshots.iter().collect();
    ordered.sort_by_key(|s| s.index);
    for snapshot in ordered {
        if state.registry.contains(&snapshot.entity.id) {
            tracing::warn!(
                "Skipping re-insert: entity {} is already in the scene",
                snapshot.entity.id
            );
            continue;
        }
        state.registry.insert_at(snapshot.index, snapshot.entity.clone());
    }
}

fn remove_snapshots(state: &mut SceneState, snapshots: &[EntitySnapshot]) {
    for snapshot in snapshots {
        if state.remove_entity(&snapshot.entity.id).is_none() {
            tracing::warn!(
                "Skipping removal: entity {} is not in the scene",
                snapshot.entity.id
            );
        }
    }
}

/// A record with its human-readable description
#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    /// Description shown in menus and logs
    pub description: String,
    /// The edit
    pub record: UndoRecord,
}

/// Undo/redo log with a cursor
#[derive(Debug)]
pub struct UndoEngine {
    log: VecDeque<UndoEntry>,
    /// Number of applied entries; the cursor is `applied - 1`
    applied: usize,
    max_depth: usize,
}

impl Default for UndoEngine {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

impl UndoEngine {
    /// Create an empty log keeping at most `max_depth` entries
    pub fn new(max_depth: usize) -> Self {
        Self {
            log: VecDeque::new(),
            applied: 0,
            max_depth: max_depth.max(1),
        }
    }

    /// Index of the last applied entry, `None` when nothing is applied
    pub fn cursor(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    /// Number of entries in the log
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.applied < self.log.len()
    }

    /// Description of the entry undo would revert
    pub fn undo_description(&self) -> Option<&str> {
        self.cursor()
            .and_then(|i| self.log.get(i))
            .map(|e| e.description.as_str())
    }

    /// Description of the entry redo would apply
    pub fn redo_description(&self) -> Option<&str> {
        self.log.get(self.applied).map(|e| e.description.as_str())
    }

    /// Append an already-applied edit, discarding any undone entries
    pub fn record(&mut self, description: impl Into<String>, record: UndoRecord) {
        let description = description.into();
        self.log.truncate(self.applied);
        self.log.push_back(UndoEntry {
            description: description.clone(),
            record,
        });
        self.applied += 1;

        while self.log.len() > self.max_depth {
            self.log.pop_front();
            self.applied -= 1;
        }
        tracing::debug!("Recorded '{}' ({} in history)", description, self.log.len());
    }

    /// Revert the last applied entry
    pub fn undo(&mut self, state: &mut SceneState) -> Result<String> {
        let index = self.cursor().ok_or(HistoryError::NothingToUndo)?;
        let entry = &self.log[index];
        entry.record.apply(state, false);
        self.applied -= 1;
        tracing::info!("Undo: {}", entry.description);
        Ok(entry.description.clone())
    }

    /// Re-apply the next entry
    pub fn redo(&mut self, state: &mut SceneState) -> Result<String> {
        let entry = self.log.get(self.applied).ok_or(HistoryError::NothingToRedo)?;
        entry.record.apply(state, true);
        let description = entry.description.clone();
        self.applied += 1;
        tracing::info!("Redo: {}", description);
        Ok(description)
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.log.clear();
        self.applied = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Transform;
    use glam::Vec3;

    fn scene_with(n: usize) -> (SceneState, Vec<EntityId>) {
        let mut state = SceneState::new();
        let ids = (0..n)
            .map(|i| {
                state.registry.push(
                    Entity::new("Entity")
                        .with_transform(Transform::from_position(Vec3::new(i as f32, 0.0, 0.0))),
                )
            })
            .collect();
        (state, ids)
    }

    fn move_record(state: &mut SceneState, id: EntityId, to: Vec3) -> UndoRecord {
        let old = state.registry.world_transform(&id).unwrap();
        let new = Transform::from_position(to);
        state.registry.set_world_transform(&id, new);
        UndoRecord::AttributeChanges(vec![AttributeChange {
            entity: id,
            attribute: Attribute::WorldTransform,
            old: Value::Transform(old),
            new: Value::Transform(new),
        }])
    }

    fn delete_record(state: &mut SceneState, ids: &[EntityId]) -> UndoRecord {
        let mut snapshots = Vec::new();
        for id in ids {
            let index = state.registry.index_of(id).unwrap();
            snapshots.push(EntitySnapshot {
                index,
                entity: state.registry.get(id).unwrap().clone(),
            });
        }
        for id in ids {
            state.remove_entity(id);
        }
        UndoRecord::DeleteEntities(snapshots)
    }

    #[test]
    fn test_cursor_starts_empty() {
        let (mut state, _) = scene_with(1);
        let mut history = UndoEngine::default();
        assert_eq!(history.cursor(), None);
        assert_eq!(history.undo(&mut state), Err(HistoryError::NothingToUndo));
        assert_eq!(history.redo(&mut state), Err(HistoryError::NothingToRedo));
    }

    #[test]
    fn test_n_edits_then_n_undos_restore_initial() {
        let (mut state, ids) = scene_with(1);
        let id = ids[0];
        let initial = state.registry.world_transform(&id).unwrap();
        let mut history = UndoEngine::default();

        for step in 1..=5 {
            let record = move_record(&mut state, id, Vec3::splat(step as f32));
            history.record(format!("move {step}"), record);
        }
        assert_eq!(history.cursor(), Some(4));

        for _ in 0..5 {
            history.undo(&mut state).unwrap();
        }
        assert!(state.registry.world_transform(&id).unwrap().approx_eq(&initial, 1e-6));
        assert!(!history.can_undo());

        for _ in 0..5 {
            history.redo(&mut state).unwrap();
        }
        assert_eq!(
            state.registry.world_transform(&id).unwrap().position,
            Vec3::splat(5.0)
        );
    }

    #[test]
    fn test_record_truncates_redo_tail() {
        let (mut state, ids) = scene_with(1);
        let mut history = UndoEngine::default();
        for step in 0..3 {
            let record = move_record(&mut state, ids[0], Vec3::splat(step as f32));
            history.record("move", record);
        }
        history.undo(&mut state).unwrap();
        history.undo(&mut state).unwrap();
        assert!(history.can_redo());

        let record = move_record(&mut state, ids[0], Vec3::Y);
        history.record("branch", record);
        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
        assert_eq!(history.undo_description(), Some("branch"));
    }

    #[test]
    fn test_delete_undo_restores_order() {
        let (mut state, ids) = scene_with(5);
        let before: Vec<_> = state.registry.iter().cloned().collect();
        state.selection.select_many(&[ids[1], ids[3]], crate::selection::SelectMode::Set);

        let mut history = UndoEngine::default();
        let record = delete_record(&mut state, &[ids[1], ids[3]]);
        history.record("delete", record);
        assert_eq!(state.registry.len(), 3);
        assert!(state.selection.is_empty());

        history.undo(&mut state).unwrap();
        let after: Vec<_> = state.registry.iter().cloned().collect();
        assert_eq!(after, before);

        history.redo(&mut state).unwrap();
        assert_eq!(state.registry.ids(), vec![ids[0], ids[2], ids[4]]);
    }

    #[test]
    fn test_missing_entity_is_skipped() {
        let (mut state, ids) = scene_with(2);
        let mut history = UndoEngine::default();
        let a = move_record(&mut state, ids[0], Vec3::X);
        let b = move_record(&mut state, ids[1], Vec3::Y);
        let (UndoRecord::AttributeChanges(mut changes), UndoRecord::AttributeChanges(more)) =
            (a, b)
        else {
            unreachable!()
        };
        changes.extend(more);
        history.record("move both", UndoRecord::AttributeChanges(changes));

        // Removed outside the log: its change is skipped, the other still applies.
        state.remove_entity(&ids[0]);
        history.undo(&mut state).unwrap();
        assert_eq!(
            state.registry.world_transform(&ids[1]).unwrap().position,
            Vec3::new(1.0, 0.0, 0.0)
        );
    }

    #[test]
    fn test_batch_reverts_in_reverse_order() {
        let (mut state, ids) = scene_with(1);
        let group = Entity::new("Entity").with_transform(Transform::from_position(Vec3::splat(2.0)));
        let group_id = group.id;
        state.registry.push(group.clone());
        state.registry.set_parent_keep_world(&ids[0], Some(group_id));

        let record = UndoRecord::Batch(vec![
            UndoRecord::RestoreEntities(vec![EntitySnapshot {
                index: 1,
                entity: group,
            }]),
            UndoRecord::AttributeChanges(vec![AttributeChange {
                entity: ids[0],
                attribute: Attribute::Parent,
                old: Value::None,
                new: Value::Entity(group_id),
            }]),
        ]);
        let mut history = UndoEngine::default();
        history.record("group", record);

        history.undo(&mut state).unwrap();
        assert_eq!(state.registry.len(), 1);
        assert_eq!(state.registry.get(&ids[0]).unwrap().parent, None);
        assert!(state
            .registry
            .get(&ids[0])
            .unwrap()
            .transform
            .position
            .abs_diff_eq(Vec3::ZERO, 1e-5));

        history.redo(&mut state).unwrap();
        assert_eq!(state.registry.get(&ids[0]).unwrap().parent, Some(group_id));
        assert!(state
            .registry
            .world_transform(&ids[0])
            .unwrap()
            .position
            .abs_diff_eq(Vec3::ZERO, 1e-5));
    }

    #[test]
    fn test_max_depth_drops_oldest() {
        let (mut state, ids) = scene_with(1);
        let mut history = UndoEngine::new(3);
        for step in 0..5 {
            let record = move_record(&mut state, ids[0], Vec3::splat(step as f32));
            history.record(format!("move {step}"), record);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), Some(2));
        assert_eq!(history.undo_description(), Some("move 4"));
    }
}

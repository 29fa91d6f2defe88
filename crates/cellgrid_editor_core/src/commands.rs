// SPDX-License-Identifier: MIT OR Apache-2.0
//! One-shot editing commands.
//!
//! Each command edits a [`LoadedScene`] and records exactly one undo entry in
//! its history. Commands that find nothing to do return an error and record
//! nothing.

use crate::entity::{Entity, EntityId};
use crate::history::{Attribute, AttributeChange, EntitySnapshot, UndoRecord};
use crate::math::Transform;
use crate::scene::{LoadedScene, SceneState};
use crate::types::{ConstructError, EntityRecipe, TypeRegistry};
use crate::value::{AttributeMap, Value};
use glam::Vec3;
use indexmap::IndexMap;

/// First line of clipboard text produced by [`copy_selected`]
pub const CLIPBOARD_HEADER: &str = "cellgrid_copy_data:";

/// Name given to entities created by [`group_selected`]
pub const GROUP_NAME: &str = "[group]";

/// Error type for command execution
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The command needs a selection
    #[error("Nothing is selected")]
    NothingSelected,

    /// Entity construction failed
    #[error("Construction failed: {0}")]
    Construct(#[from] ConstructError),

    /// Clipboard text is not editor data
    #[error("Clipboard does not hold editor data: {0}")]
    Clipboard(String),

    /// A recipe could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] ron::Error),

    /// No entity accepted the edit
    #[error("Field `{0}` could not be set on any target")]
    InvalidField(String),
}

fn require_selection(state: &SceneState) -> Result<Vec<EntityId>, CommandError> {
    let ids = state.selected_ids();
    if ids.is_empty() {
        return Err(CommandError::NothingSelected);
    }
    Ok(ids)
}

/// Selected ids that have no selected ancestor
fn selection_roots(state: &SceneState) -> Result<Vec<EntityId>, CommandError> {
    let ids = require_selection(state)?;
    Ok(ids
        .iter()
        .filter(|id| !state.registry.has_ancestor_in(**id, &ids))
        .copied()
        .collect())
}

pub(crate) fn entities_label(count: usize) -> String {
    if count == 1 {
        "1 entity".to_string()
    } else {
        format!("{count} entities")
    }
}

/// Append entities, returning their snapshots.
fn append(state: &mut SceneState, entities: Vec<Entity>) -> Vec<EntitySnapshot> {
    entities
        .into_iter()
        .map(|entity| {
            let snapshot = EntitySnapshot {
                index: state.registry.len(),
                entity: entity.clone(),
            };
            state.registry.push(entity);
            snapshot
        })
        .collect()
}

/// Delete the selection and everything parented under it.
pub fn delete_selected(scene: &mut LoadedScene) -> Result<usize, CommandError> {
    let selected = require_selection(&scene.state)?;
    let targets = scene.state.registry.with_descendants(&selected);

    let snapshots: Vec<EntitySnapshot> = targets
        .iter()
        .filter_map(|id| {
            let index = scene.state.registry.index_of(id)?;
            let entity = scene.state.registry.get(id)?.clone();
            Some(EntitySnapshot { index, entity })
        })
        .collect();
    for snapshot in &snapshots {
        scene.state.remove_entity(&snapshot.entity.id);
    }

    let count = snapshots.len();
    tracing::debug!("Deleted {} entities", count);
    scene.history.record(
        format!("Delete {}", entities_label(count)),
        UndoRecord::DeleteEntities(snapshots),
    );
    Ok(count)
}

/// Clone the selection (with descendants) and select the clones.
///
/// Returns the ids of the cloned selection roots.
pub fn duplicate_selected(scene: &mut LoadedScene) -> Result<Vec<EntityId>, CommandError> {
    let roots = selection_roots(&scene.state)?;
    let sources = scene.state.registry.with_descendants(&roots);

    let mut remap: IndexMap<EntityId, EntityId> = IndexMap::new();
    let mut clones = Vec::with_capacity(sources.len());
    for id in &sources {
        let Some(source) = scene.state.registry.get(id) else {
            continue;
        };
        let clone = source.duplicate();
        remap.insert(*id, clone.id);
        clones.push(clone);
    }
    for clone in &mut clones {
        if let Some(parent) = clone.parent.and_then(|p| remap.get(&p)) {
            clone.parent = Some(*parent);
        }
    }

    let snapshots = append(&mut scene.state, clones);
    let new_roots: Vec<EntityId> = roots.iter().filter_map(|id| remap.get(id)).copied().collect();
    scene.state.selection.clear();
    for id in &new_roots {
        scene.state.selection.add(*id);
    }

    scene.history.record(
        format!("Duplicate {}", entities_label(new_roots.len())),
        UndoRecord::RestoreEntities(snapshots),
    );
    Ok(new_roots)
}

/// Construct a registered type at `position` and select it.
pub fn spawn(
    scene: &mut LoadedScene,
    types: &TypeRegistry,
    type_name: &str,
    position: Vec3,
) -> Result<EntityId, CommandError> {
    let mut fields = AttributeMap::new();
    fields.insert("position".into(), Value::Vec3(position));
    let entity = types.instantiate(&EntityRecipe {
        type_name: type_name.to_string(),
        fields,
    })?;
    let id = entity.id;
    let snapshots = append(&mut scene.state, vec![entity]);
    scene.state.selection.clear();
    scene.state.selection.add(id);

    tracing::info!("Spawned {} at {}", type_name, position);
    scene
        .history
        .record(format!("Spawn {type_name}"), UndoRecord::RestoreEntities(snapshots));
    Ok(id)
}

/// Clipboard text for the selection: one recipe per line, world transforms baked in.
pub fn copy_selected(
    state: &SceneState,
    types: &TypeRegistry,
) -> Result<String, CommandError> {
    let ids = require_selection(state)?;
    let mut text = String::from(CLIPBOARD_HEADER);
    for id in &ids {
        let (Some(entity), Some(world)) = (state.registry.get(id), state.registry.world_transform(id))
        else {
            continue;
        };
        let flattened = entity.clone().with_transform(world);
        let recipe = types.recipe_of(&flattened);
        text.push('\n');
        text.push_str(&ron::to_string(&recipe)?);
    }
    tracing::debug!("Copied {} to clipboard", entities_label(ids.len()));
    Ok(text)
}

/// Append the entities described by clipboard text and select them.
pub fn paste(
    scene: &mut LoadedScene,
    types: &TypeRegistry,
    text: &str,
) -> Result<Vec<EntityId>, CommandError> {
    let mut lines = text.lines();
    if lines.next().map(str::trim) != Some(CLIPBOARD_HEADER) {
        return Err(CommandError::Clipboard("missing header".to_string()));
    }

    let mut entities = Vec::new();
    for line in lines.map(str::trim).filter(|l| !l.is_empty()) {
        let recipe: EntityRecipe =
            ron::from_str(line).map_err(|e| CommandError::Clipboard(e.to_string()))?;
        entities.push(types.instantiate(&recipe)?);
    }
    if entities.is_empty() {
        return Err(CommandError::Clipboard("no entities".to_string()));
    }

    let ids: Vec<EntityId> = entities.iter().map(|e| e.id).collect();
    let snapshots = append(&mut scene.state, entities);
    scene.state.selection.clear();
    for id in &ids {
        scene.state.selection.add(*id);
    }
    scene.history.record(
        format!("Paste {}", entities_label(ids.len())),
        UndoRecord::RestoreEntities(snapshots),
    );
    Ok(ids)
}

/// Parent the selection under a new group entity at its centroid.
pub fn group_selected(scene: &mut LoadedScene) -> Result<EntityId, CommandError> {
    let roots = selection_roots(&scene.state)?;
    let registry = &scene.state.registry;

    let positions: Vec<Vec3> = roots
        .iter()
        .filter_map(|id| registry.world_transform(id))
        .map(|t| t.position)
        .collect();
    let centroid = positions.iter().copied().sum::<Vec3>() / positions.len().max(1) as f32;

    let parents: Vec<Option<EntityId>> = roots
        .iter()
        .map(|id| registry.get(id).and_then(|e| e.parent))
        .collect();
    let common_parent = match parents.first() {
        Some(first) if parents.iter().all(|p| p == first) => *first,
        _ => None,
    };

    let mut group = Entity::new("Entity").with_attribute("name", GROUP_NAME);
    group.parent = common_parent;
    let group_id = group.id;
    let index = scene.state.registry.len();
    scene.state.registry.push(group);
    scene
        .state
        .registry
        .set_world_transform(&group_id, Transform::from_position(centroid));
    let snapshot = scene
        .state
        .registry
        .get(&group_id)
        .cloned()
        .map(|entity| EntitySnapshot { index, entity });

    let mut changes = Vec::with_capacity(roots.len());
    for (id, old_parent) in roots.iter().zip(parents) {
        if scene.state.registry.set_parent_keep_world(id, Some(group_id)) {
            changes.push(AttributeChange {
                entity: *id,
                attribute: Attribute::Parent,
                old: old_parent.map(Value::Entity).unwrap_or_default(),
                new: Value::Entity(group_id),
            });
        }
    }

    scene.state.selection.clear();
    scene.state.selection.add(group_id);
    let count = changes.len();
    scene.history.record(
        format!("Group {}", entities_label(count)),
        UndoRecord::Batch(vec![
            UndoRecord::RestoreEntities(snapshot.into_iter().collect()),
            UndoRecord::AttributeChanges(changes),
        ]),
    );
    Ok(group_id)
}

/// Set one persisted field on several entities.
///
/// Returns how many entities changed.
pub fn set_attribute(
    scene: &mut LoadedScene,
    ids: &[EntityId],
    key: &str,
    value: Value,
) -> Result<usize, CommandError> {
    let mut changes = Vec::new();
    for id in ids {
        let Some(old) = scene.state.field(id, key) else {
            continue;
        };
        if scene.state.set_field(id, key, value.clone()) {
            changes.push(AttributeChange {
                entity: *id,
                attribute: Attribute::Field(key.to_string()),
                old,
                new: value.clone(),
            });
        }
    }
    if changes.is_empty() {
        return Err(CommandError::InvalidField(key.to_string()));
    }

    let count = changes.len();
    scene.history.record(
        format!("Set {key} on {}", entities_label(count)),
        UndoRecord::AttributeChanges(changes),
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MAX_HISTORY;

    fn scene_with(types: &TypeRegistry, positions: &[Vec3]) -> (LoadedScene, Vec<EntityId>) {
        let mut state = SceneState::new();
        let ids = positions
            .iter()
            .map(|p| {
                let mut entity = types
                    .instantiate(&EntityRecipe {
                        type_name: "WhiteCube".into(),
                        fields: Default::default(),
                    })
                    .unwrap();
                entity.transform.position = *p;
                state.registry.push(entity)
            })
            .collect();
        (LoadedScene::new(state, MAX_HISTORY), ids)
    }

    #[test]
    fn test_delete_with_children_and_undo() {
        let types = TypeRegistry::with_builtins();
        let (mut scene, ids) = scene_with(&types, &[Vec3::ZERO, Vec3::X, Vec3::Y]);
        scene.state.registry.set_parent(&ids[2], ids[0]);
        scene.state.selection.add(ids[0]);

        assert_eq!(delete_selected(&mut scene).unwrap(), 2);
        assert_eq!(scene.state.registry.ids(), vec![ids[1]]);
        assert!(scene.state.selection.is_empty());

        scene.undo().unwrap();
        assert_eq!(scene.state.registry.ids(), ids);
        assert_eq!(scene.state.registry.get(&ids[2]).unwrap().parent, Some(ids[0]));
    }

    #[test]
    fn test_delete_requires_selection() {
        let types = TypeRegistry::with_builtins();
        let (mut scene, _) = scene_with(&types, &[Vec3::ZERO]);
        assert!(matches!(delete_selected(&mut scene), Err(CommandError::NothingSelected)));
        assert!(scene.history.is_empty());
    }

    #[test]
    fn test_duplicate_remaps_children() {
        let types = TypeRegistry::with_builtins();
        let (mut scene, ids) = scene_with(&types, &[Vec3::ZERO, Vec3::X]);
        scene.state.registry.set_parent(&ids[1], ids[0]);
        scene.state.selection.add(ids[0]);
        scene.state.selection.add(ids[1]);

        let roots = duplicate_selected(&mut scene).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(scene.state.registry.len(), 4);
        let clone_child = scene.state.registry.get_index(3).unwrap();
        assert_eq!(clone_child.parent, Some(roots[0]));
        assert_eq!(scene.state.selected_ids(), roots);

        scene.undo().unwrap();
        assert_eq!(scene.state.registry.ids(), ids);
    }

    #[test]
    fn test_spawn_unknown_type() {
        let types = TypeRegistry::with_builtins();
        let (mut scene, _) = scene_with(&types, &[]);
        let result = spawn(&mut scene, &types, "Dragon", Vec3::ZERO);
        assert!(matches!(result, Err(CommandError::Construct(ConstructError::UnknownType(_)))));

        let id = spawn(&mut scene, &types, "Rock", Vec3::new(0.0, 0.0, 4.0)).unwrap();
        assert_eq!(scene.state.registry.get(&id).unwrap().transform.position.z, 4.0);
        assert_eq!(scene.history.undo_description(), Some("Spawn Rock"));
    }

    #[test]
    fn test_copy_paste_bakes_world_transform() {
        let types = TypeRegistry::with_builtins();
        let (mut scene, ids) = scene_with(&types, &[Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0)]);
        scene.state.registry.set_parent(&ids[1], ids[0]);
        scene.state.selection.add(ids[1]);

        let text = copy_selected(&scene.state, &types).unwrap();
        assert!(text.starts_with(CLIPBOARD_HEADER));
        assert_eq!(text.lines().count(), 2);

        let pasted = paste(&mut scene, &types, &text).unwrap();
        assert_eq!(pasted.len(), 1);
        let entity = scene.state.registry.get(&pasted[0]).unwrap();
        assert_eq!(entity.parent, None);
        assert!(entity.transform.position.abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-5));
        assert_eq!(scene.state.selected_ids(), pasted);

        scene.undo().unwrap();
        assert!(!scene.state.registry.contains(&pasted[0]));
    }

    #[test]
    fn test_paste_rejects_foreign_text() {
        let types = TypeRegistry::with_builtins();
        let (mut scene, _) = scene_with(&types, &[]);
        assert!(matches!(
            paste(&mut scene, &types, "hello"),
            Err(CommandError::Clipboard(_))
        ));
        assert!(matches!(
            paste(&mut scene, &types, "cellgrid_copy_data:\nnot ron"),
            Err(CommandError::Clipboard(_))
        ));
        assert!(scene.state.registry.is_empty());
    }

    #[test]
    fn test_group_and_undo() {
        let types = TypeRegistry::with_builtins();
        let (mut scene, ids) = scene_with(&types, &[Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 2.0)]);
        scene.state.selection.add(ids[0]);
        scene.state.selection.add(ids[1]);

        let group = group_selected(&mut scene).unwrap();
        let registry = &scene.state.registry;
        assert_eq!(registry.get(&group).unwrap().name(), GROUP_NAME);
        assert!(registry
            .world_transform(&group)
            .unwrap()
            .position
            .abs_diff_eq(Vec3::new(1.0, 0.0, 1.0), 1e-5));
        for id in &ids {
            assert_eq!(registry.get(id).unwrap().parent, Some(group));
        }
        assert!(registry
            .world_transform(&ids[0])
            .unwrap()
            .position
            .abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));

        scene.undo().unwrap();
        assert!(!scene.state.registry.contains(&group));
        for id in &ids {
            assert_eq!(scene.state.registry.get(id).unwrap().parent, None);
        }

        scene.redo().unwrap();
        assert_eq!(scene.state.registry.get(&ids[1]).unwrap().parent, Some(group));
    }

    #[test]
    fn test_set_attribute_undo() {
        let types = TypeRegistry::with_builtins();
        let (mut scene, ids) = scene_with(&types, &[Vec3::ZERO, Vec3::X]);
        let changed = set_attribute(&mut scene, &ids, "texture", "moss".into()).unwrap();
        assert_eq!(changed, 2);
        assert_eq!(
            scene.state.field(&ids[1], "texture"),
            Some(Value::Str("moss".into()))
        );

        scene.undo().unwrap();
        assert_eq!(
            scene.state.field(&ids[1], "texture"),
            Some(Value::Str("white_cube".into()))
        );
        assert!(matches!(
            set_attribute(&mut scene, &ids, "position", "left".into()),
            Err(CommandError::InvalidField(_))
        ));
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transform manipulators.
//!
//! Every manipulator follows the same three phases. Engaging snapshots the
//! selected entities and attaches them to a pivot placed at the selection
//! anchor. Each tick then moves the pivot (or each entity in individual
//! mode) from the sampled pointer input. Releasing puts every entity back
//! under its original parent and records one undo entry if anything moved.

mod rotate;
mod scale;
mod translate;

use crate::entity::EntityId;
use crate::history::{Attribute, AttributeChange, UndoRecord};
use crate::input::InputSample;
use crate::math::{Axis, AxisMask, Transform};
use crate::scene::SceneState;
use crate::selection::{anchor, FrameMode, OriginMode};
use crate::settings::{EditorSettings, SnapSettings};
use crate::value::Value;
use crate::viewport::Viewport;
use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Manipulator errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManipulatorError {
    /// Another drag is in progress
    #[error("A manipulator is already engaged")]
    AlreadyActive,

    /// Nothing to manipulate
    #[error("Nothing is selected")]
    NothingSelected,

    /// Edge scaling needs a face under the pointer
    #[error("No face under the pointer")]
    NoFace,

    /// The handle does not apply to this manipulator
    #[error("{handle:?} is not a valid handle for {kind}")]
    InvalidHandle {
        /// Manipulator name
        kind: &'static str,
        /// Rejected handle
        handle: Handle,
    },
}

/// Gizmo mode for transform operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GizmoMode {
    /// Translate (move) mode - W key
    #[default]
    Translate,
    /// Rotate mode - U key
    Rotate,
    /// Scale mode - E key
    Scale,
    /// No gizmo shown - Q key
    Hidden,
}

impl GizmoMode {
    /// Get the name of this mode
    pub fn name(&self) -> &'static str {
        match self {
            Self::Translate => "Translate",
            Self::Rotate => "Rotate",
            Self::Scale => "Scale",
            Self::Hidden => "Hidden",
        }
    }

    /// Manipulator engaged by dragging a handle in this mode
    pub fn kind(&self) -> Option<ManipulatorKind> {
        match self {
            Self::Translate => Some(ManipulatorKind::Translate),
            Self::Rotate => Some(ManipulatorKind::Rotate),
            Self::Scale => Some(ManipulatorKind::Scale),
            Self::Hidden => None,
        }
    }
}

/// The part of a gizmo grabbed by the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handle {
    /// Single axis arrow / ring / cube
    Axis(Axis),
    /// Plane square, identified by its normal
    Plane(Axis),
    /// Centre handle: free translate, view-axis rotate or uniform scale
    Uniform,
}

/// A face of an entity's unit box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFace {
    /// Face normal axis in entity space
    pub axis: Axis,
    /// `true` for the positive face
    pub positive: bool,
    /// Keep the centre fixed instead of the opposite face
    pub from_center: bool,
}

impl EdgeFace {
    /// Face whose outward normal is closest to `local_normal`
    pub fn from_normal(local_normal: Vec3, from_center: bool) -> Option<Self> {
        if local_normal.length_squared() < 1e-6 {
            return None;
        }
        let axis = Axis::dominant(local_normal);
        Some(Self {
            axis,
            positive: local_normal[axis.index()] > 0.0,
            from_center,
        })
    }

    fn sign(&self) -> f32 {
        if self.positive {
            1.0
        } else {
            -1.0
        }
    }
}

/// Which manipulator a session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManipulatorKind {
    /// Move
    Translate,
    /// Rotate
    Rotate,
    /// Scale about the pivot
    Scale,
    /// Move one face of the primary entity
    EdgeScale(EdgeFace),
}

impl ManipulatorKind {
    /// Get the name of this manipulator
    pub fn name(&self) -> &'static str {
        match self {
            Self::Translate => "Translate",
            Self::Rotate => "Rotate",
            Self::Scale => "Scale",
            Self::EdgeScale(_) => "Edge Scale",
        }
    }
}

/// Parameters a session reads from the editor settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Anchor placement
    pub origin: OriginMode,
    /// Axis basis
    pub frame: FrameMode,
    /// Snap steps
    pub snap: SnapSettings,
    /// Degrees per normalized unit of pointer travel
    pub rotate_sensitivity: f32,
    /// Scale per normalized unit of pointer travel
    pub scale_sensitivity: f32,
    /// Change threshold for recording
    pub epsilon: f32,
}

impl SessionConfig {
    /// Build from settings and the current modes
    pub fn new(settings: &EditorSettings, origin: OriginMode, frame: FrameMode) -> Self {
        Self {
            origin,
            frame,
            snap: settings.snap,
            rotate_sensitivity: settings.rotate_sensitivity,
            scale_sensitivity: settings.scale_sensitivity,
            epsilon: settings.transform_epsilon,
        }
    }
}

/// An entity temporarily carried by the pivot
#[derive(Debug, Clone, Copy, PartialEq)]
struct Attachment {
    entity: EntityId,
    original_parent: Option<EntityId>,
    start: Transform,
    offset: Transform,
}

/// Constraint plane of translate and edge-scale sessions
#[derive(Debug, Clone, Copy, PartialEq)]
struct DragPlane {
    point: Vec3,
    normal: Vec3,
    origin: Option<Vec3>,
}

impl DragPlane {
    /// Plane through `point` containing `axis`, turned to face the camera.
    fn containing_axis(point: Vec3, axis: Vec3, view: Vec3) -> Self {
        let mut normal = view - axis * axis.dot(view);
        if normal.length_squared() < 1e-8 {
            normal = axis.any_orthonormal_vector();
        }
        Self {
            point,
            normal: normal.normalize(),
            origin: None,
        }
    }

    fn with_normal(point: Vec3, normal: Vec3) -> Self {
        Self {
            point,
            normal: normal.normalize_or_zero(),
            origin: None,
        }
    }

    /// Pointer displacement on the plane since the drag origin.
    ///
    /// `None` when the pointer ray misses the plane; the first hit becomes the origin.
    fn displacement(&mut self, viewport: &dyn Viewport, pointer: Vec2) -> Option<Vec3> {
        let hit = viewport
            .pointer_ray(pointer)
            .intersect_plane(self.point, self.normal)?;
        match self.origin {
            Some(origin) => Some(hit - origin),
            None => {
                self.origin = Some(hit);
                Some(Vec3::ZERO)
            }
        }
    }
}

/// One drag, from engage to release.
///
/// Must end with [`DragSession::release`] or [`DragSession::cancel`]; both
/// return every entity to its original parent.
#[derive(Debug)]
pub struct DragSession {
    kind: ManipulatorKind,
    handle: Handle,
    config: SessionConfig,
    lock: AxisMask,
    pivot_start: Transform,
    pivot: Transform,
    attachments: Vec<Attachment>,
    plane: Option<DragPlane>,
    accumulated: f32,
    displacement: Vec3,
    dominant_lock: bool,
    finished: bool,
}

impl DragSession {
    /// Engage a manipulator on the selection of `state`.
    pub fn engage(
        state: &mut SceneState,
        viewport: &dyn Viewport,
        pointer: Vec2,
        kind: ManipulatorKind,
        handle: Handle,
        config: SessionConfig,
    ) -> Result<Self, ManipulatorError> {
        let targets: Vec<EntityId> = match kind {
            ManipulatorKind::EdgeScale(_) => state.selection.primary().copied().into_iter().collect(),
            _ => state.selected_ids(),
        };
        if targets.is_empty() {
            return Err(ManipulatorError::NothingSelected);
        }
        let lock = lock_for(kind, handle)?;
        let anchor = anchor(&state.selection, &state.registry, config.origin, config.frame)
            .ok_or(ManipulatorError::NothingSelected)?;
        let pivot_start = Transform {
            position: anchor.position,
            rotation: anchor.rotation,
            scale: Vec3::ONE,
        };

        let mut attachments = Vec::with_capacity(targets.len());
        for id in targets {
            let Some(start) = state.registry.world_transform(&id) else {
                continue;
            };
            let original_parent = state.registry.get(&id).and_then(|e| e.parent);
            state.registry.set_parent_keep_world(&id, None);
            attachments.push(Attachment {
                entity: id,
                original_parent,
                start,
                offset: pivot_start.relative(&start),
            });
        }

        let view = viewport.view_direction();
        let mut plane = match (kind, handle) {
            (ManipulatorKind::Translate, Handle::Axis(axis)) => Some(DragPlane::containing_axis(
                pivot_start.position,
                pivot_start.rotation * axis.unit(),
                view,
            )),
            (ManipulatorKind::Translate, Handle::Plane(normal)) => Some(DragPlane::with_normal(
                pivot_start.position,
                pivot_start.rotation * normal.unit(),
            )),
            (ManipulatorKind::Translate, Handle::Uniform) => {
                Some(DragPlane::with_normal(pivot_start.position, view))
            }
            (ManipulatorKind::EdgeScale(face), _) => attachments.first().map(|a| {
                let axis = a.start.rotation * face.axis.unit() * face.sign();
                let face_point = a.start.position + axis * a.start.scale[face.axis.index()] * 0.5;
                DragPlane::containing_axis(face_point, axis, view)
            }),
            _ => None,
        };
        if let Some(plane) = plane.as_mut() {
            // A miss here is retried on the first update.
            let _ = plane.displacement(viewport, pointer);
        }

        tracing::debug!(
            "Engaged {} ({:?}) on {} entities",
            kind.name(),
            handle,
            attachments.len()
        );
        Ok(Self {
            kind,
            handle,
            config,
            lock,
            pivot_start,
            pivot: pivot_start,
            attachments,
            plane,
            accumulated: 0.0,
            displacement: Vec3::ZERO,
            dominant_lock: false,
            finished: false,
        })
    }

    /// Manipulator being run
    pub fn kind(&self) -> ManipulatorKind {
        self.kind
    }

    /// Handle grabbed
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Current pivot transform
    pub fn pivot(&self) -> Transform {
        self.pivot
    }

    /// Entities carried by this session
    pub fn entities(&self) -> Vec<EntityId> {
        self.attachments.iter().map(|a| a.entity).collect()
    }

    /// Apply one tick of input
    pub fn update(&mut self, state: &mut SceneState, viewport: &dyn Viewport, sample: &InputSample) {
        match self.kind {
            ManipulatorKind::Translate => translate::update(self, state, viewport, sample),
            ManipulatorKind::Rotate => rotate::update(self, state, viewport, sample),
            ManipulatorKind::Scale => scale::update(self, state, sample),
            ManipulatorKind::EdgeScale(face) => scale::update_edge(self, face, state, viewport, sample),
        }
    }

    /// Lock a translate session to the axis it has moved along most, or unlock it.
    pub fn toggle_dominant_axis_lock(&mut self) {
        if self.kind != ManipulatorKind::Translate {
            return;
        }
        if self.dominant_lock {
            self.lock = lock_for_translate(self.handle);
            self.dominant_lock = false;
        } else if self.displacement.length_squared() > 0.0 {
            self.lock = AxisMask::only(Axis::dominant(self.displacement));
            self.dominant_lock = true;
        }
        tracing::debug!("Translate lock now {:?}", self.lock);
    }

    /// Restrict a scale session to one axis from now on.
    pub fn constrain_scale_axis(&mut self, axis: Axis) {
        if self.kind == ManipulatorKind::Scale {
            self.handle = Handle::Axis(axis);
            self.lock = AxisMask::only(axis);
        }
    }

    /// Move the pivot and carry the grouped entities with it.
    fn apply_pivot(&self, state: &mut SceneState) {
        for attachment in &self.attachments {
            let world = self.pivot.mul_transform(&attachment.offset);
            state.registry.set_world_transform(&attachment.entity, world);
        }
    }

    fn individual(&self) -> bool {
        self.config.origin == OriginMode::Individual
    }

    /// Axis basis of one entity in individual mode.
    fn entity_basis(&self, attachment: &Attachment) -> Quat {
        match self.config.frame {
            FrameMode::Local => attachment.start.rotation,
            FrameMode::Global => Quat::IDENTITY,
        }
    }

    /// Finish the drag and produce the undo record, if anything changed.
    pub fn release(mut self, state: &mut SceneState) -> Option<UndoRecord> {
        self.finished = true;
        let mut changes = Vec::new();
        for attachment in &self.attachments {
            let Some(end) = state.registry.world_transform(&attachment.entity) else {
                tracing::warn!("Entity {} vanished during a drag", attachment.entity);
                continue;
            };
            state
                .registry
                .set_parent_keep_world(&attachment.entity, attachment.original_parent);
            if !end.approx_eq(&attachment.start, self.config.epsilon) {
                changes.push(AttributeChange {
                    entity: attachment.entity,
                    attribute: Attribute::WorldTransform,
                    old: Value::Transform(attachment.start),
                    new: Value::Transform(end),
                });
            }
        }
        // Ancestors first, so replaying a world transform never moves a
        // descendant that was already placed.
        changes.sort_by_key(|change| state.registry.depth(&change.entity));
        tracing::debug!(
            "Released {}: {} of {} entities changed",
            self.kind.name(),
            changes.len(),
            self.attachments.len()
        );
        if changes.is_empty() {
            None
        } else {
            Some(UndoRecord::AttributeChanges(changes))
        }
    }

    /// Abort the drag, restoring every snapshot. Nothing is recorded.
    pub fn cancel(mut self, state: &mut SceneState) {
        self.finished = true;
        for attachment in &self.attachments {
            state
                .registry
                .set_world_transform(&attachment.entity, attachment.start);
            state
                .registry
                .set_parent_keep_world(&attachment.entity, attachment.original_parent);
        }
        tracing::debug!("Cancelled {}", self.kind.name());
    }
}

impl Drop for DragSession {
    fn drop(&mut self) {
        if !self.finished {
            tracing::error!(
                "{} session dropped without release; {} entities left detached",
                self.kind.name(),
                self.attachments.len()
            );
        }
    }
}

fn lock_for_translate(handle: Handle) -> AxisMask {
    match handle {
        Handle::Axis(axis) => AxisMask::only(axis),
        Handle::Plane(normal) => AxisMask::plane(normal),
        Handle::Uniform => AxisMask::FREE,
    }
}

fn lock_for(kind: ManipulatorKind, handle: Handle) -> Result<AxisMask, ManipulatorError> {
    match (kind, handle) {
        (ManipulatorKind::Translate | ManipulatorKind::Scale, _) => Ok(lock_for_translate(handle)),
        (ManipulatorKind::Rotate, Handle::Plane(_)) => Err(ManipulatorError::InvalidHandle {
            kind: kind.name(),
            handle,
        }),
        (ManipulatorKind::Rotate, Handle::Axis(axis)) => Ok(AxisMask::only(axis)),
        (ManipulatorKind::Rotate, Handle::Uniform) => Ok(AxisMask::FREE),
        (ManipulatorKind::EdgeScale(face), _) => Ok(AxisMask::only(face.axis)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::history::UndoEngine;
    use crate::input::Modifiers;
    use crate::viewport::CameraViewport;

    fn top_down() -> CameraViewport {
        CameraViewport::orthographic(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y, 10.0, 1.0)
    }

    fn config(origin: OriginMode) -> SessionConfig {
        SessionConfig::new(&EditorSettings::default(), origin, FrameMode::Global)
    }

    fn sample(pointer: Vec2, delta: Vec2) -> InputSample {
        InputSample {
            pointer,
            delta,
            modifiers: Modifiers::default(),
        }
    }

    fn scene(positions: &[Vec3]) -> (SceneState, Vec<EntityId>) {
        let mut state = SceneState::new();
        let ids: Vec<_> = positions
            .iter()
            .map(|p| {
                state
                    .registry
                    .push(Entity::new("WhiteCube").with_transform(Transform::from_position(*p)))
            })
            .collect();
        state.selection.select_many(&ids, crate::selection::SelectMode::Set);
        (state, ids)
    }

    fn position(state: &SceneState, id: &EntityId) -> Vec3 {
        state.registry.world_transform(id).unwrap().position
    }

    #[test]
    fn test_translate_x_axis_then_undo_redo() {
        let (mut state, ids) = scene(&[Vec3::ZERO]);
        let viewport = top_down();
        let mut session = DragSession::engage(
            &mut state,
            &viewport,
            Vec2::ZERO,
            ManipulatorKind::Translate,
            Handle::Axis(Axis::X),
            config(OriginMode::Center),
        )
        .unwrap();

        // Vertical pointer travel is locked out.
        session.update(&mut state, &viewport, &sample(Vec2::new(0.1, 0.05), Vec2::new(0.1, 0.05)));
        assert!(position(&state, &ids[0]).abs_diff_eq(Vec3::X, 1e-4));

        let record = session.release(&mut state).unwrap();
        let UndoRecord::AttributeChanges(changes) = &record else {
            panic!("expected attribute changes");
        };
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].attribute, Attribute::WorldTransform);

        let mut history = UndoEngine::default();
        history.record("Translate", record);
        history.undo(&mut state).unwrap();
        assert!(position(&state, &ids[0]).abs_diff_eq(Vec3::ZERO, 1e-5));
        history.redo(&mut state).unwrap();
        assert!(position(&state, &ids[0]).abs_diff_eq(Vec3::X, 1e-4));
    }

    #[test]
    fn test_center_rotate_two_entities_single_record() {
        let (mut state, ids) = scene(&[Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)]);
        let viewport = top_down();
        let mut session = DragSession::engage(
            &mut state,
            &viewport,
            Vec2::ZERO,
            ManipulatorKind::Rotate,
            Handle::Axis(Axis::Z),
            config(OriginMode::Center),
        )
        .unwrap();

        // 0.15 units of travel at 600 degrees per unit.
        session.update(&mut state, &viewport, &sample(Vec2::ZERO, Vec2::new(0.1, 0.05)));
        assert!(position(&state, &ids[0]).abs_diff_eq(Vec3::new(0.0, -1.0, 0.0), 1e-4));
        assert!(position(&state, &ids[1]).abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-4));
        let expected = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        for id in &ids {
            let rotation = state.registry.world_transform(id).unwrap().rotation;
            assert!(rotation.abs_diff_eq(expected, 1e-4));
        }

        let Some(UndoRecord::AttributeChanges(changes)) = session.release(&mut state) else {
            panic!("expected one attribute change record");
        };
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn test_individual_scale_keeps_positions() {
        let starts = [Vec3::new(-2.0, 0.0, 0.0), Vec3::new(3.0, 1.0, 0.0)];
        let (mut state, ids) = scene(&starts);
        let viewport = top_down();
        let mut session = DragSession::engage(
            &mut state,
            &viewport,
            Vec2::ZERO,
            ManipulatorKind::Scale,
            Handle::Uniform,
            config(OriginMode::Individual),
        )
        .unwrap();

        session.update(&mut state, &viewport, &sample(Vec2::ZERO, Vec2::new(0.1, 0.1)));
        for (id, start) in ids.iter().zip(starts) {
            let world = state.registry.world_transform(id).unwrap();
            assert!(world.position.abs_diff_eq(start, 1e-5));
            assert!(world.scale.abs_diff_eq(Vec3::splat(2.0), 1e-5));
        }
        assert!(session.release(&mut state).is_some());
    }

    #[test]
    fn test_individual_scale_uses_own_axes_in_global_frame() {
        let (mut state, ids) = scene(&[Vec3::ZERO]);
        let turned = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        state.registry.set_world_transform(
            &ids[0],
            Transform {
                rotation: turned,
                ..Transform::IDENTITY
            },
        );
        let viewport = top_down();
        let mut session = DragSession::engage(
            &mut state,
            &viewport,
            Vec2::ZERO,
            ManipulatorKind::Scale,
            Handle::Axis(Axis::X),
            config(OriginMode::Individual),
        )
        .unwrap();
        session.update(&mut state, &viewport, &sample(Vec2::ZERO, Vec2::new(0.1, 0.0)));
        let world = state.registry.world_transform(&ids[0]).unwrap();
        assert!(world.scale.abs_diff_eq(Vec3::new(1.5, 1.0, 1.0), 1e-4));
        assert!(world.rotation.abs_diff_eq(turned, 1e-4));
        session.release(&mut state);
    }

    #[test]
    fn test_grouped_scale_spreads_from_pivot() {
        let (mut state, ids) = scene(&[Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)]);
        let viewport = top_down();
        let mut session = DragSession::engage(
            &mut state,
            &viewport,
            Vec2::ZERO,
            ManipulatorKind::Scale,
            Handle::Axis(Axis::X),
            config(OriginMode::Center),
        )
        .unwrap();
        session.update(&mut state, &viewport, &sample(Vec2::ZERO, Vec2::new(0.2, 0.0)));
        assert!(position(&state, &ids[0]).abs_diff_eq(Vec3::new(-2.0, 0.0, 0.0), 1e-4));
        assert!(position(&state, &ids[1]).abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-4));
        session.release(&mut state);
    }

    #[test]
    fn test_release_without_change_records_nothing() {
        let (mut state, ids) = scene(&[Vec3::ZERO]);
        let parent = state.registry.push(Entity::new("Entity"));
        state.registry.set_parent_keep_world(&ids[0], Some(parent));

        let viewport = top_down();
        let session = DragSession::engage(
            &mut state,
            &viewport,
            Vec2::ZERO,
            ManipulatorKind::Translate,
            Handle::Plane(Axis::Z),
            config(OriginMode::Last),
        )
        .unwrap();
        // Detached onto the pivot for the duration of the drag.
        assert_eq!(state.registry.get(&ids[0]).unwrap().parent, None);

        assert!(session.release(&mut state).is_none());
        assert_eq!(state.registry.get(&ids[0]).unwrap().parent, Some(parent));
    }

    #[test]
    fn test_parent_restored_after_move() {
        let (mut state, ids) = scene(&[Vec3::new(1.0, 0.0, 0.0)]);
        let parent = state
            .registry
            .push(Entity::new("Entity").with_transform(Transform::from_position(Vec3::new(0.0, 2.0, 0.0))));
        state.registry.set_parent_keep_world(&ids[0], Some(parent));

        let viewport = top_down();
        let mut session = DragSession::engage(
            &mut state,
            &viewport,
            Vec2::new(0.1, 0.0),
            ManipulatorKind::Translate,
            Handle::Plane(Axis::Z),
            config(OriginMode::Last),
        )
        .unwrap();
        session.update(&mut state, &viewport, &sample(Vec2::new(0.1, 0.1), Vec2::new(0.0, 0.1)));
        session.release(&mut state).unwrap();

        let entity = state.registry.get(&ids[0]).unwrap();
        assert_eq!(entity.parent, Some(parent));
        assert!(entity.transform.position.abs_diff_eq(Vec3::new(1.0, -1.0, 0.0), 1e-4));
        assert!(position(&state, &ids[0]).abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-4));
    }

    /// Parent at the origin with a child at world x=2, child selected first.
    fn child_selected_before_parent() -> (SceneState, EntityId, EntityId) {
        let mut state = SceneState::new();
        let parent = state.registry.push(Entity::new("Entity"));
        let child = state
            .registry
            .push(Entity::new("WhiteCube").with_transform(Transform::from_position(Vec3::new(2.0, 0.0, 0.0))));
        state.registry.set_parent_keep_world(&child, Some(parent));
        state
            .selection
            .select_many(&[child, parent], crate::selection::SelectMode::Set);
        (state, parent, child)
    }

    #[test]
    fn test_co_selected_parent_and_child_undo_redo() {
        let (mut state, parent, child) = child_selected_before_parent();
        let viewport = top_down();
        let mut session = DragSession::engage(
            &mut state,
            &viewport,
            Vec2::ZERO,
            ManipulatorKind::Translate,
            Handle::Axis(Axis::X),
            config(OriginMode::Center),
        )
        .unwrap();
        session.update(&mut state, &viewport, &sample(Vec2::new(0.1, 0.0), Vec2::new(0.1, 0.0)));
        let record = session.release(&mut state).unwrap();
        assert_eq!(state.registry.get(&child).unwrap().parent, Some(parent));
        assert!(position(&state, &parent).abs_diff_eq(Vec3::X, 1e-4));
        assert!(position(&state, &child).abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-4));

        let mut history = UndoEngine::default();
        history.record("Translate", record);
        history.undo(&mut state).unwrap();
        assert!(position(&state, &parent).abs_diff_eq(Vec3::ZERO, 1e-4));
        assert!(position(&state, &child).abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-4));

        history.redo(&mut state).unwrap();
        assert!(position(&state, &parent).abs_diff_eq(Vec3::X, 1e-4));
        assert!(position(&state, &child).abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-4));
    }

    #[test]
    fn test_drags_on_hierarchy_undo_to_initial_transforms() {
        let (mut state, parent, child) = child_selected_before_parent();
        let viewport = top_down();
        let snapshot = |state: &SceneState| {
            [parent, child].map(|id| state.registry.world_transform(&id).unwrap())
        };
        let initial = snapshot(&state);

        let drags = [
            (ManipulatorKind::Translate, Handle::Axis(Axis::X), Vec2::new(0.1, 0.0)),
            (ManipulatorKind::Rotate, Handle::Axis(Axis::Z), Vec2::new(0.1, 0.05)),
            (ManipulatorKind::Scale, Handle::Uniform, Vec2::new(0.05, 0.05)),
        ];
        let mut history = UndoEngine::default();
        for (kind, handle, delta) in drags {
            let mut session =
                DragSession::engage(&mut state, &viewport, Vec2::ZERO, kind, handle, config(OriginMode::Center))
                    .unwrap();
            session.update(&mut state, &viewport, &sample(delta, delta));
            history.record(kind.name(), session.release(&mut state).unwrap());
        }
        let edited = snapshot(&state);

        for _ in 0..drags.len() {
            history.undo(&mut state).unwrap();
        }
        for (now, start) in snapshot(&state).iter().zip(&initial) {
            assert!(now.approx_eq(start, 1e-4));
        }

        for _ in 0..drags.len() {
            history.redo(&mut state).unwrap();
        }
        for (now, end) in snapshot(&state).iter().zip(&edited) {
            assert!(now.approx_eq(end, 1e-4));
        }
    }

    #[test]
    fn test_edge_on_plane_skips_frame() {
        let (mut state, ids) = scene(&[Vec3::ZERO]);
        let viewport = top_down();
        let mut session = DragSession::engage(
            &mut state,
            &viewport,
            Vec2::ZERO,
            ManipulatorKind::Translate,
            Handle::Plane(Axis::X),
            config(OriginMode::Center),
        )
        .unwrap();
        session.update(&mut state, &viewport, &sample(Vec2::new(0.2, 0.2), Vec2::new(0.2, 0.2)));
        assert_eq!(position(&state, &ids[0]), Vec3::ZERO);
        assert!(session.release(&mut state).is_none());
    }

    #[test]
    fn test_snap_while_modifier_held() {
        let (mut state, ids) = scene(&[Vec3::ZERO]);
        let viewport = top_down();
        let mut session = DragSession::engage(
            &mut state,
            &viewport,
            Vec2::ZERO,
            ManipulatorKind::Translate,
            Handle::Axis(Axis::X),
            config(OriginMode::Center),
        )
        .unwrap();
        let mut snapped = sample(Vec2::new(0.13, 0.0), Vec2::new(0.13, 0.0));
        snapped.modifiers.ctrl = true;
        session.update(&mut state, &viewport, &snapped);
        assert!(position(&state, &ids[0]).abs_diff_eq(Vec3::X, 1e-4));
        session.cancel(&mut state);
        assert_eq!(position(&state, &ids[0]), Vec3::ZERO);
    }

    #[test]
    fn test_dominant_axis_lock() {
        let (mut state, ids) = scene(&[Vec3::ZERO]);
        let viewport = top_down();
        let mut session = DragSession::engage(
            &mut state,
            &viewport,
            Vec2::ZERO,
            ManipulatorKind::Translate,
            Handle::Plane(Axis::Z),
            config(OriginMode::Center),
        )
        .unwrap();
        session.update(&mut state, &viewport, &sample(Vec2::new(0.1, 0.03), Vec2::ZERO));
        session.toggle_dominant_axis_lock();
        session.update(&mut state, &viewport, &sample(Vec2::new(0.2, 0.1), Vec2::ZERO));
        assert!(position(&state, &ids[0]).abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-4));

        session.toggle_dominant_axis_lock();
        session.update(&mut state, &viewport, &sample(Vec2::new(0.2, 0.1), Vec2::ZERO));
        assert!(position(&state, &ids[0]).abs_diff_eq(Vec3::new(2.0, 1.0, 0.0), 1e-4));
        session.release(&mut state);
    }

    #[test]
    fn test_edge_scale_keeps_opposite_face() {
        let (mut state, ids) = scene(&[Vec3::ZERO]);
        let viewport = top_down();
        let face = EdgeFace {
            axis: Axis::X,
            positive: true,
            from_center: false,
        };
        let mut session = DragSession::engage(
            &mut state,
            &viewport,
            Vec2::new(0.05, 0.0),
            ManipulatorKind::EdgeScale(face),
            Handle::Axis(Axis::X),
            config(OriginMode::Last),
        )
        .unwrap();
        session.update(&mut state, &viewport, &sample(Vec2::new(0.15, 0.0), Vec2::new(0.1, 0.0)));

        let world = state.registry.world_transform(&ids[0]).unwrap();
        assert!(world.scale.abs_diff_eq(Vec3::new(2.0, 1.0, 1.0), 1e-4));
        assert!(world.position.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-4));
        assert!(session.release(&mut state).is_some());
    }

    #[test]
    fn test_engage_errors() {
        let (mut state, _) = scene(&[Vec3::ZERO]);
        let viewport = top_down();
        assert!(matches!(
            DragSession::engage(
                &mut state,
                &viewport,
                Vec2::ZERO,
                ManipulatorKind::Rotate,
                Handle::Plane(Axis::Y),
                config(OriginMode::Center),
            ),
            Err(ManipulatorError::InvalidHandle { .. })
        ));

        state.selection.clear();
        assert!(matches!(
            DragSession::engage(
                &mut state,
                &viewport,
                Vec2::ZERO,
                ManipulatorKind::Translate,
                Handle::Uniform,
                config(OriginMode::Center),
            ),
            Err(ManipulatorError::NothingSelected)
        ));
    }

    #[test]
    fn test_edge_face_from_normal() {
        let face = EdgeFace::from_normal(Vec3::new(0.0, -1.0, 0.0), true).unwrap();
        assert_eq!(face.axis, Axis::Y);
        assert!(!face.positive);
        assert!(face.from_center);
        assert!(EdgeFace::from_normal(Vec3::ZERO, false).is_none());
    }
}

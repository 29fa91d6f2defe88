// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scale and edge-scale manipulator updates.
//!
//! Scale is stored along each entity's own axes, so individual-mode scale
//! always acts in the entity's local frame whatever the frame setting says.
//! A world-aligned axis on a rotated entity would need shear.

use super::{DragSession, EdgeFace};
use crate::input::InputSample;
use crate::math::{snap_f32, MIN_SCALE};
use crate::scene::SceneState;
use crate::viewport::Viewport;
use glam::Vec3;

pub(super) fn update(session: &mut DragSession, state: &mut SceneState, sample: &InputSample) {
    session.accumulated += (sample.delta.x + sample.delta.y) * session.config.scale_sensitivity;
    let amount = if sample.snap() {
        snap_f32(session.accumulated, session.config.snap.scale)
    } else {
        session.accumulated
    };
    let delta = session.lock.factors() * amount;

    if session.individual() {
        for attachment in &session.attachments {
            let mut world = attachment.start;
            world.scale = (world.scale + delta).max(Vec3::splat(MIN_SCALE));
            state.registry.set_world_transform(&attachment.entity, world);
        }
        return;
    }

    session.pivot.scale = (session.pivot_start.scale + delta).max(Vec3::splat(MIN_SCALE));
    session.apply_pivot(state);
}

/// Move one face of the target along its normal; the opposite face (or the
/// centre) stays where it was.
pub(super) fn update_edge(
    session: &mut DragSession,
    face: EdgeFace,
    state: &mut SceneState,
    viewport: &dyn Viewport,
    sample: &InputSample,
) {
    let Some(attachment) = session.attachments.first().copied() else {
        return;
    };
    let Some(plane) = session.plane.as_mut() else {
        return;
    };
    let Some(world_delta) = plane.displacement(viewport, sample.pointer) else {
        return;
    };

    let start = attachment.start;
    let i = face.axis.index();
    let outward = start.rotation * face.axis.unit() * face.sign();
    let mut travel = world_delta.dot(outward);
    if sample.snap() {
        travel = snap_f32(travel, session.config.snap.translation);
    }

    let extent = start.scale[i];
    let mut world = start;
    if face.from_center {
        world.scale[i] = (extent + 2.0 * travel).max(MIN_SCALE);
    } else {
        let new_extent = (extent + travel).max(MIN_SCALE);
        let fixed_face = start.position - outward * extent * 0.5;
        world.scale[i] = new_extent;
        world.position = fixed_face + outward * new_extent * 0.5;
    }
    session.displacement = outward * travel;
    state.registry.set_world_transform(&attachment.entity, world);
}

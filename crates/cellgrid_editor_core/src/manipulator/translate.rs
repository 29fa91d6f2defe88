// SPDX-License-Identifier: MIT OR Apache-2.0
//! Translate manipulator update.

use super::DragSession;
use crate::input::InputSample;
use crate::math::snap_vec3;
use crate::scene::SceneState;
use crate::viewport::Viewport;

pub(super) fn update(
    session: &mut DragSession,
    state: &mut SceneState,
    viewport: &dyn Viewport,
    sample: &InputSample,
) {
    let Some(plane) = session.plane.as_mut() else {
        return;
    };
    // Edge-on plane: skip the frame.
    let Some(world_delta) = plane.displacement(viewport, sample.pointer) else {
        return;
    };

    let basis = session.pivot_start.rotation;
    let mut local = session.lock.apply(basis.inverse() * world_delta);
    if sample.snap() {
        local = snap_vec3(local, session.config.snap.translation);
    }
    session.displacement = local;

    if session.individual() {
        for attachment in &session.attachments {
            let delta = session.entity_basis(attachment) * local;
            let mut world = attachment.start;
            world.position += delta;
            state.registry.set_world_transform(&attachment.entity, world);
        }
        return;
    }

    session.pivot.position = session.pivot_start.position + basis * local;
    session.apply_pivot(state);
}

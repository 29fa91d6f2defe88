// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rotate manipulator update.

use super::{DragSession, Handle};
use crate::input::InputSample;
use crate::math::snap_f32;
use crate::scene::SceneState;
use crate::viewport::Viewport;
use glam::{Quat, Vec3};

pub(super) fn update(
    session: &mut DragSession,
    state: &mut SceneState,
    viewport: &dyn Viewport,
    sample: &InputSample,
) {
    session.accumulated += (sample.delta.x + sample.delta.y) * session.config.rotate_sensitivity;
    let degrees = if sample.snap() {
        snap_f32(session.accumulated, session.config.snap.rotation)
    } else {
        session.accumulated
    };
    let radians = degrees.to_radians();

    // Axis in the session basis; the centre handle spins about the view axis.
    let local_axis = match session.handle {
        Handle::Axis(axis) => axis.unit(),
        Handle::Plane(_) | Handle::Uniform => {
            session.pivot_start.rotation.inverse() * -viewport.view_direction()
        }
    };
    if local_axis.length_squared() < 1e-8 {
        return;
    }

    if session.individual() {
        for attachment in &session.attachments {
            let axis: Vec3 = (session.entity_basis(attachment) * local_axis).normalize();
            let mut world = attachment.start;
            world.rotation = (Quat::from_axis_angle(axis, radians) * world.rotation).normalize();
            state.registry.set_world_transform(&attachment.entity, world);
        }
        return;
    }

    let axis = (session.pivot_start.rotation * local_axis).normalize();
    session.pivot.rotation =
        (Quat::from_axis_angle(axis, radians) * session.pivot_start.rotation).normalize();
    session.apply_pivot(state);
}

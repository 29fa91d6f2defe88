// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera collaborator seen by the editing core.
//!
//! Screen positions are normalized: the origin is the centre of the view,
//! `y` points up and spans `-0.5..=0.5`, `x` spans `±aspect / 2`.

use crate::math::Ray;
use glam::{Mat4, Vec2, Vec3};

/// Projection services the core needs from the renderer's camera.
pub trait Viewport {
    /// Project a world point to normalized screen space.
    ///
    /// Returns `None` for points behind the camera.
    fn world_to_screen(&self, point: Vec3) -> Option<Vec2>;

    /// World-space ray through a normalized screen position.
    fn pointer_ray(&self, pointer: Vec2) -> Ray;

    /// Direction the camera looks along.
    fn view_direction(&self) -> Vec3;
}

/// A camera described by view and projection matrices.
#[derive(Debug, Clone)]
pub struct CameraViewport {
    view_proj: Mat4,
    inv_view_proj: Mat4,
    forward: Vec3,
    aspect: f32,
}

impl CameraViewport {
    /// Build from explicit matrices.
    pub fn from_matrices(view: Mat4, projection: Mat4, aspect: f32) -> Self {
        let view_proj = projection * view;
        let forward = view.inverse().transform_vector3(Vec3::NEG_Z).normalize_or_zero();
        Self {
            view_proj,
            inv_view_proj: view_proj.inverse(),
            forward,
            aspect: aspect.max(f32::EPSILON),
        }
    }

    /// Perspective camera at `eye` looking at `target`.
    pub fn perspective(eye: Vec3, target: Vec3, up: Vec3, fov_y: f32, aspect: f32) -> Self {
        let view = Mat4::look_at_rh(eye, target, up);
        let projection = Mat4::perspective_rh(fov_y, aspect, 0.1, 1000.0);
        Self::from_matrices(view, projection, aspect)
    }

    /// Orthographic camera showing `height` world units vertically.
    pub fn orthographic(eye: Vec3, target: Vec3, up: Vec3, height: f32, aspect: f32) -> Self {
        let view = Mat4::look_at_rh(eye, target, up);
        let half_h = height * 0.5;
        let half_w = half_h * aspect;
        let projection = Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, 0.1, 1000.0);
        Self::from_matrices(view, projection, aspect)
    }

    fn screen_to_ndc(&self, pointer: Vec2) -> Vec2 {
        Vec2::new(pointer.x * 2.0 / self.aspect, pointer.y * 2.0)
    }
}

impl Default for CameraViewport {
    fn default() -> Self {
        Self::perspective(
            Vec3::new(0.0, 10.0, -20.0),
            Vec3::ZERO,
            Vec3::Y,
            std::f32::consts::FRAC_PI_4,
            16.0 / 9.0,
        )
    }
}

impl Viewport for CameraViewport {
    fn world_to_screen(&self, point: Vec3) -> Option<Vec2> {
        let clip = self.view_proj * point.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(ndc.x * self.aspect * 0.5, ndc.y * 0.5))
    }

    fn pointer_ray(&self, pointer: Vec2) -> Ray {
        let ndc = self.screen_to_ndc(pointer);
        let near = self.inv_view_proj.project_point3(ndc.extend(0.0));
        let far = self.inv_view_proj.project_point3(ndc.extend(1.0));
        Ray::new(near, far - near)
    }

    fn view_direction(&self) -> Vec3 {
        self.forward
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transform, axis and ray primitives shared by picking and the manipulators.

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Smallest scale component a manipulator will produce.
pub const MIN_SCALE: f32 = 0.001;

/// Position, rotation and scale of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Translation
    pub position: Vec3,
    /// Orientation
    pub rotation: Quat,
    /// Per-axis scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a transform that only translates.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Build a transform from XYZ Euler angles in degrees.
    pub fn from_euler_degrees(position: Vec3, degrees: Vec3, scale: Vec3) -> Self {
        let radians = degrees * std::f32::consts::PI / 180.0;
        Self {
            position,
            rotation: Quat::from_euler(EulerRot::XYZ, radians.x, radians.y, radians.z),
            scale,
        }
    }

    /// Rotation as XYZ Euler angles in degrees.
    pub fn euler_degrees(&self) -> Vec3 {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        Vec3::new(x, y, z) * 180.0 / std::f32::consts::PI
    }

    /// Affine matrix of this transform.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Decompose an affine matrix. Shear is discarded.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        Self {
            position,
            rotation: rotation.normalize(),
            scale,
        }
    }

    /// `self * child`: the child expressed in this transform's space, as a world transform.
    pub fn mul_transform(&self, child: &Transform) -> Transform {
        Self::from_matrix(self.to_matrix() * child.to_matrix())
    }

    /// Express `world` relative to this transform.
    pub fn relative(&self, world: &Transform) -> Transform {
        Self::from_matrix(self.to_matrix().inverse() * world.to_matrix())
    }

    /// Component-wise comparison with tolerance `epsilon`.
    pub fn approx_eq(&self, other: &Transform, epsilon: f32) -> bool {
        let same_rotation = self.rotation.abs_diff_eq(other.rotation, epsilon)
            || self.rotation.abs_diff_eq(-other.rotation, epsilon);
        self.position.abs_diff_eq(other.position, epsilon)
            && self.scale.abs_diff_eq(other.scale, epsilon)
            && same_rotation
    }
}

/// One of the three basis axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    /// X axis
    X,
    /// Y axis
    Y,
    /// Z axis
    Z,
}

impl Axis {
    /// All axes in order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index of this axis.
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// Unit vector along this axis.
    pub fn unit(self) -> Vec3 {
        match self {
            Self::X => Vec3::X,
            Self::Y => Vec3::Y,
            Self::Z => Vec3::Z,
        }
    }

    /// Axis of the largest absolute component of `v`.
    pub fn dominant(v: Vec3) -> Axis {
        let a = v.abs();
        if a.x >= a.y && a.x >= a.z {
            Self::X
        } else if a.y >= a.z {
            Self::Y
        } else {
            Self::Z
        }
    }
}

/// Which components of a displacement are locked to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AxisMask {
    /// `true` means the component is locked.
    pub locked: [bool; 3],
}

impl AxisMask {
    /// Nothing locked.
    pub const FREE: Self = Self { locked: [false; 3] };

    /// Lock everything except `axis`.
    pub fn only(axis: Axis) -> Self {
        let mut locked = [true; 3];
        locked[axis.index()] = false;
        Self { locked }
    }

    /// Lock only `axis` (the normal of a plane handle).
    pub fn plane(normal: Axis) -> Self {
        let mut locked = [false; 3];
        locked[normal.index()] = true;
        Self { locked }
    }

    /// Zero the locked components of `v`.
    pub fn apply(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            if self.locked[0] { 0.0 } else { v.x },
            if self.locked[1] { 0.0 } else { v.y },
            if self.locked[2] { 0.0 } else { v.z },
        )
    }

    /// 1.0 for free components, 0.0 for locked ones.
    pub fn factors(&self) -> Vec3 {
        self.apply(Vec3::ONE)
    }
}

/// Round each component of `v` to a multiple of `step`.
pub fn snap_vec3(v: Vec3, step: f32) -> Vec3 {
    if step <= 0.0 {
        return v;
    }
    (v / step).round() * step
}

/// Round `value` to a multiple of `step`.
pub fn snap_f32(value: f32, step: f32) -> f32 {
    if step <= 0.0 {
        return value;
    }
    (value / step).round() * step
}

/// A half-line in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point
    pub origin: Vec3,
    /// Normalized direction
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray, normalizing the direction.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at distance `t`.
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Intersect with the plane through `point` with `normal`.
    ///
    /// Returns `None` when the ray is parallel to the plane or the plane is behind it.
    pub fn intersect_plane(&self, point: Vec3, normal: Vec3) -> Option<Vec3> {
        let denom = normal.dot(self.direction);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = (point - self.origin).dot(normal) / denom;
        if t < 0.0 {
            return None;
        }
        Some(self.at(t))
    }

    /// Slab test against the axis-aligned box `[min, max]`.
    ///
    /// Returns the entry distance and the outward normal of the face hit.
    pub fn intersect_aabb(&self, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;
        let mut normal = Vec3::ZERO;

        for axis in Axis::ALL {
            let i = axis.index();
            let origin = self.origin[i];
            let dir = self.direction[i];
            if dir.abs() < 1e-8 {
                if origin < min[i] || origin > max[i] {
                    return None;
                }
                continue;
            }
            let mut t1 = (min[i] - origin) / dir;
            let mut t2 = (max[i] - origin) / dir;
            let mut face = -axis.unit();
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
                face = axis.unit();
            }
            if t1 > t_near {
                t_near = t1;
                normal = face;
            }
            t_far = t_far.min(t2);
            if t_near > t_far || t_far < 0.0 {
                return None;
            }
        }

        if t_near < 0.0 {
            // Origin inside the box.
            return Some((0.0, normal));
        }
        Some((t_near, normal))
    }

    /// Intersect with a sphere; returns the nearest non-negative distance.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let sqrt = disc.sqrt();
        let t = -b - sqrt;
        if t >= 0.0 {
            Some(t)
        } else if -b + sqrt >= 0.0 {
            Some(0.0)
        } else {
            None
        }
    }
}

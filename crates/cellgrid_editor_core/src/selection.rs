// SPDX-License-Identifier: MIT OR Apache-2.0
//! Selection state, pointer picking and box selection.

use crate::entity::{ColliderKind, EntityId, EntityRegistry};
use crate::math::Ray;
use crate::viewport::Viewport;
use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Selection mode for multi-select operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectMode {
    /// Replace current selection
    #[default]
    Set,
    /// Add to current selection (Shift+Click)
    Add,
    /// Remove from current selection (Alt+Click)
    Remove,
    /// Toggle in current selection
    Toggle,
}

/// Where manipulators anchor a multi-entity selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginMode {
    /// The last selected entity
    Last,
    /// Mean world position of the selection
    #[default]
    Center,
    /// Each entity around its own origin
    Individual,
}

impl OriginMode {
    /// Next mode in the cycle used by the origin-mode key
    pub fn next(self) -> Self {
        match self {
            Self::Last => Self::Center,
            Self::Center => Self::Individual,
            Self::Individual => Self::Last,
        }
    }

    /// Get the name of this mode
    pub fn name(self) -> &'static str {
        match self {
            Self::Last => "last",
            Self::Center => "center",
            Self::Individual => "individual",
        }
    }
}

/// Basis the manipulator axes follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameMode {
    /// World axes
    #[default]
    Global,
    /// Axes of the anchor entity
    Local,
}

impl FrameMode {
    /// The other frame mode
    pub fn toggled(self) -> Self {
        match self {
            Self::Global => Self::Local,
            Self::Local => Self::Global,
        }
    }
}

/// Entity selection state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Selection {
    /// Currently selected entities, oldest first
    pub entities: Vec<EntityId>,
}

impl Selection {
    /// Create a new empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a selection with the given entities
    pub fn with_entities(entities: impl Into<Vec<EntityId>>) -> Self {
        let mut selection = Self::new();
        for id in entities.into() {
            selection.add(id);
        }
        selection
    }

    /// Check if an entity is selected
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains(id)
    }

    /// Add an entity to the selection (idempotent)
    pub fn add(&mut self, id: EntityId) {
        if !self.contains(&id) {
            self.entities.push(id);
        }
    }

    /// Remove an entity from the selection
    pub fn remove(&mut self, id: &EntityId) {
        self.entities.retain(|e| e != id);
    }

    /// Toggle an entity in the selection
    pub fn toggle(&mut self, id: EntityId) {
        if self.contains(&id) {
            self.remove(&id);
        } else {
            self.add(id);
        }
    }

    /// Apply `mode` for a single entity
    pub fn select(&mut self, id: EntityId, mode: SelectMode) {
        match mode {
            SelectMode::Set => {
                self.entities.clear();
                self.entities.push(id);
            }
            SelectMode::Add => self.add(id),
            SelectMode::Remove => self.remove(&id),
            SelectMode::Toggle => self.toggle(id),
        }
    }

    /// Apply `mode` for a group of entities
    pub fn select_many(&mut self, ids: &[EntityId], mode: SelectMode) {
        if mode == SelectMode::Set {
            self.entities.clear();
        }
        for id in ids {
            match mode {
                SelectMode::Set | SelectMode::Add => self.add(*id),
                SelectMode::Remove => self.remove(id),
                SelectMode::Toggle => self.toggle(*id),
            }
        }
    }

    /// Clear the selection
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Check if the selection is empty
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get the number of selected entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Iterate over selected entities
    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.iter()
    }

    /// Get the primary (last) selected entity
    pub fn primary(&self) -> Option<&EntityId> {
        self.entities.last()
    }

    /// Drop ids that are no longer in `registry`
    pub fn retain_existing(&mut self, registry: &EntityRegistry) {
        self.entities.retain(|id| registry.contains(id));
    }
}

/// Screen-space rectangle in normalized coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    /// Lower-left corner
    pub min: Vec2,
    /// Upper-right corner
    pub max: Vec2,
}

impl ScreenRect {
    /// Rectangle spanned by two corners, in any order
    pub fn from_corners(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Width and height
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Strict containment
    pub fn contains(&self, point: Vec2) -> bool {
        point.x > self.min.x && point.x < self.max.x && point.y > self.min.y && point.y < self.max.y
    }
}

/// Result of a 3-D pick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    /// Entity hit
    pub entity: EntityId,
    /// Distance along the pointer ray
    pub distance: f32,
    /// Outward normal of the face hit, in entity space
    pub local_normal: Vec3,
}

/// Pick the entity under `pointer`.
///
/// Selectable entities without a collider are matched by screen distance
/// within `radius`; if none is close enough the pointer ray is tested against
/// the colliders of the remaining selectable entities.
pub fn pick(
    registry: &EntityRegistry,
    viewport: &dyn Viewport,
    pointer: Vec2,
    radius: f32,
) -> Option<PickHit> {
    let mut nearest: Option<(f32, EntityId)> = None;
    for entity in registry.iter() {
        if !entity.selectable || entity.editor_only || entity.collider().is_some() {
            continue;
        }
        let Some(world) = registry.world_transform(&entity.id) else {
            continue;
        };
        let Some(screen) = viewport.world_to_screen(world.position) else {
            continue;
        };
        let distance = screen.distance(pointer);
        if distance < radius && nearest.map_or(true, |(best, _)| distance < best) {
            nearest = Some((distance, entity.id));
        }
    }
    if let Some((_, entity)) = nearest {
        return Some(PickHit {
            entity,
            distance: 0.0,
            local_normal: Vec3::ZERO,
        });
    }
    raycast(registry, viewport, pointer)
}

/// Nearest collider hit by the pointer ray, restricted to selectable entities.
pub fn raycast(
    registry: &EntityRegistry,
    viewport: &dyn Viewport,
    pointer: Vec2,
) -> Option<PickHit> {
    let ray = viewport.pointer_ray(pointer);
    let mut best: Option<PickHit> = None;

    for entity in registry.iter() {
        if !entity.selectable || entity.editor_only {
            continue;
        }
        let Some(collider) = entity.collider() else {
            continue;
        };
        let Some(world) = registry.world_transform(&entity.id) else {
            continue;
        };
        let matrix = world.to_matrix();
        let inverse = matrix.inverse();
        let local_ray = Ray {
            origin: inverse.transform_point3(ray.origin),
            direction: inverse.transform_vector3(ray.direction),
        };
        let hit = match collider {
            ColliderKind::Box | ColliderKind::Mesh => local_ray
                .intersect_aabb(Vec3::splat(-0.5), Vec3::splat(0.5))
                .map(|(t, normal)| (local_ray.origin + local_ray.direction * t, normal)),
            ColliderKind::Sphere => {
                let unit = Ray::new(local_ray.origin, local_ray.direction);
                unit.intersect_sphere(Vec3::ZERO, 0.5).map(|t| {
                    let point = unit.at(t);
                    (point, point.normalize_or_zero())
                })
            }
        };
        let Some((local_point, local_normal)) = hit else {
            continue;
        };
        let distance = matrix.transform_point3(local_point).distance(ray.origin);
        if best.map_or(true, |b| distance < b.distance) {
            best = Some(PickHit {
                entity: entity.id,
                distance,
                local_normal,
            });
        }
    }
    best
}

/// Entities whose projected position lies strictly inside `rect`.
pub fn entities_in_rect(
    registry: &EntityRegistry,
    viewport: &dyn Viewport,
    rect: ScreenRect,
) -> Vec<EntityId> {
    registry
        .iter()
        .filter(|e| e.selectable && !e.editor_only)
        .filter(|e| {
            registry
                .world_transform(&e.id)
                .and_then(|t| viewport.world_to_screen(t.position))
                .is_some_and(|screen| rect.contains(screen))
        })
        .map(|e| e.id)
        .collect()
}

/// Pivot placement for a manipulator session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    /// Pivot position
    pub position: Vec3,
    /// Pivot orientation (identity in the global frame)
    pub rotation: Quat,
}

/// Compute the manipulator anchor for the current selection.
pub fn anchor(
    selection: &Selection,
    registry: &EntityRegistry,
    origin: OriginMode,
    frame: FrameMode,
) -> Option<Anchor> {
    let transforms: Vec<_> = selection
        .iter()
        .filter_map(|id| registry.world_transform(id))
        .collect();
    let last = *transforms.last()?;

    let position = match origin {
        OriginMode::Last | OriginMode::Individual => last.position,
        OriginMode::Center => {
            transforms.iter().map(|t| t.position).sum::<Vec3>() / transforms.len() as f32
        }
    };
    let rotation = match frame {
        FrameMode::Local => last.rotation,
        FrameMode::Global => Quat::IDENTITY,
    };
    Some(Anchor { position, rotation })
}

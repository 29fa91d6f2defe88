// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editing core for a grid-cell 3D scene editor.
//!
//! The world is a fixed grid of scene cells. Each cell is a flat list of
//! entities stored in one delimited text file. This crate provides:
//! - Selection by pointer pick and screen-space box
//! - Translate, rotate, scale and edge-scale manipulators driven by sampled input
//! - A per-cell undo/redo log keyed by stable entity ids
//! - Scene file encoding with placeholder recovery for unknown types
//!
//! ## Architecture
//!
//! [`Editor`] is the single context object. It owns the [`SceneGrid`], the
//! [`TypeRegistry`] and the camera behind the [`Viewport`] trait, and routes
//! key and pointer events to the active mode. Everything below it works on
//! plain data and can be driven directly.

pub mod commands;
pub mod editor;
pub mod entity;
pub mod history;
pub mod input;
pub mod manipulator;
pub mod math;
pub mod persistence;
pub mod scene;
pub mod scene_grid;
pub mod selection;
pub mod settings;
pub mod types;
pub mod value;
pub mod viewport;

pub use editor::{ActiveMode, Editor, EditorError};
pub use entity::{Entity, EntityId, EntityRegistry};
pub use history::{UndoEngine, UndoRecord};
pub use input::{InputSampler, Key, KeyEvent, PointerButton};
pub use manipulator::{DragSession, GizmoMode, Handle, ManipulatorKind};
pub use math::{Axis, Transform};
pub use scene::{LoadedScene, SceneState};
pub use scene_grid::{CellCoord, SceneGrid};
pub use selection::{FrameMode, OriginMode, SelectMode, Selection};
pub use settings::EditorSettings;
pub use types::{EntityRecipe, TypeRegistry};
pub use value::Value;
pub use viewport::{CameraViewport, Viewport};

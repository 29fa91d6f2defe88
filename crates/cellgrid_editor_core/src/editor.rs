// SPDX-License-Identifier: MIT OR Apache-2.0
//! The editor context.
//!
//! [`Editor`] owns everything an editing session needs: settings, the type
//! registry, the scene grid, the camera, the input sampler and the active
//! interaction mode. Hosts forward raw key and pointer events, call
//! [`Editor::update`] once per frame, and read state back through accessors.

use crate::commands::{self, CommandError};
use crate::entity::EntityId;
use crate::history::HistoryError;
use crate::input::{InputSampler, Key, KeyEvent, PointerButton};
use crate::manipulator::{
    DragSession, EdgeFace, GizmoMode, Handle, ManipulatorError, ManipulatorKind, SessionConfig,
};
use crate::math::Axis;
use crate::persistence::{LoadReport, PersistenceError, SaveReport};
use crate::scene::LoadedScene;
use crate::scene_grid::{CellCoord, SceneGrid};
use crate::selection::{self, FrameMode, OriginMode, PickHit, ScreenRect, SelectMode};
use crate::settings::{EditorAction, EditorSettings};
use crate::types::TypeRegistry;
use crate::value::Value;
use crate::viewport::{CameraViewport, Viewport};
use glam::{Vec2, Vec3};
use thiserror::Error;

/// Editor errors
#[derive(Debug, Error)]
pub enum EditorError {
    /// A manipulator owns the scene until it is released or cancelled
    #[error("Editor is busy with an active manipulator")]
    Busy,

    /// No cell is current
    #[error("No scene cell is loaded")]
    NoCurrentCell,

    /// Paste with nothing copied
    #[error("Clipboard is empty")]
    EmptyClipboard,

    /// Scene file error
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Manipulator error
    #[error(transparent)]
    Manipulator(#[from] ManipulatorError),

    /// Command error
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Undo/redo error
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Result type for editor operations
pub type Result<T> = std::result::Result<T, EditorError>;

/// What ends a drag session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragTrigger {
    /// Released with the left pointer button
    Pointer,
    /// Released with the key that started it
    HeldKey(Key),
    /// Duplicate-drag, released with the left pointer button
    Duplicate,
}

/// What the editor is doing right now
#[derive(Debug, Default)]
pub enum ActiveMode {
    /// Waiting for input
    #[default]
    Idle,
    /// A drag session owns the selection
    Manipulating {
        /// The session
        session: DragSession,
        /// How it ends
        trigger: DragTrigger,
        /// Clear the selection after release (temporary quick-tool selection)
        clear_selection_on_release: bool,
    },
    /// A selection rectangle is being dragged
    BoxSelecting {
        /// Pointer position at the press
        start: Vec2,
        /// How the boxed entities combine with the selection
        mode: SelectMode,
    },
}

impl ActiveMode {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Manipulating { .. } => "Manipulating",
            Self::BoxSelecting { .. } => "BoxSelecting",
        }
    }
}

/// Editor context
pub struct Editor {
    settings: EditorSettings,
    types: TypeRegistry,
    grid: SceneGrid,
    viewport: Box<dyn Viewport>,
    input: InputSampler,
    mode: ActiveMode,
    gizmo_mode: GizmoMode,
    origin_mode: OriginMode,
    frame_mode: FrameMode,
    clipboard: Option<String>,
}

impl Editor {
    /// Create an editor with the default camera. Nothing is loaded yet.
    pub fn new(settings: EditorSettings, types: TypeRegistry) -> Self {
        let grid = SceneGrid::from_settings(&settings);
        Self {
            origin_mode: settings.origin_mode,
            frame_mode: settings.frame_mode,
            settings,
            types,
            grid,
            viewport: Box::new(CameraViewport::default()),
            input: InputSampler::new(),
            mode: ActiveMode::Idle,
            gizmo_mode: GizmoMode::default(),
            clipboard: None,
        }
    }

    /// Replace the camera
    pub fn set_viewport(&mut self, viewport: Box<dyn Viewport>) {
        self.viewport = viewport;
    }

    /// Current camera
    pub fn viewport(&self) -> &dyn Viewport {
        self.viewport.as_ref()
    }

    /// Editor settings
    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    /// Entity type registry
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Scene grid
    pub fn grid(&self) -> &SceneGrid {
        &self.grid
    }

    /// Input sampler
    pub fn input(&self) -> &InputSampler {
        &self.input
    }

    /// Active interaction mode
    pub fn mode(&self) -> &ActiveMode {
        &self.mode
    }

    /// Whether a drag session is running
    pub fn is_manipulating(&self) -> bool {
        matches!(self.mode, ActiveMode::Manipulating { .. })
    }

    /// Gizmo mode used by handle drags
    pub fn gizmo_mode(&self) -> GizmoMode {
        self.gizmo_mode
    }

    /// Set the gizmo mode
    pub fn set_gizmo_mode(&mut self, mode: GizmoMode) {
        tracing::debug!("Gizmo mode: {}", mode.name());
        self.gizmo_mode = mode;
    }

    /// Anchor placement for new sessions
    pub fn origin_mode(&self) -> OriginMode {
        self.origin_mode
    }

    /// Advance the origin mode
    pub fn cycle_origin_mode(&mut self) -> OriginMode {
        self.origin_mode = self.origin_mode.next();
        tracing::info!("Origin mode: {}", self.origin_mode.name());
        self.origin_mode
    }

    /// Axis basis for new sessions
    pub fn frame_mode(&self) -> FrameMode {
        self.frame_mode
    }

    /// Switch between global and local axes
    pub fn toggle_frame_mode(&mut self) -> FrameMode {
        self.frame_mode = self.frame_mode.toggled();
        tracing::info!("Frame mode: {:?}", self.frame_mode);
        self.frame_mode
    }

    /// Clipboard text
    pub fn clipboard(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    /// Replace the clipboard text
    pub fn set_clipboard(&mut self, text: impl Into<String>) {
        self.clipboard = Some(text.into());
    }

    /// Every command and tool start requires the editor to be idle.
    fn ensure_idle(&self) -> Result<()> {
        if !matches!(self.mode, ActiveMode::Idle) {
            return Err(EditorError::Busy);
        }
        Ok(())
    }

    /// Contents of the current cell
    pub fn current_scene(&self) -> Result<&LoadedScene> {
        self.grid.current_scene().ok_or(EditorError::NoCurrentCell)
    }

    fn scene_mut(&mut self) -> Result<&mut LoadedScene> {
        self.grid.current_scene_mut().ok_or(EditorError::NoCurrentCell)
    }

    // ------------------------------------------------------------------
    // Cells
    // ------------------------------------------------------------------

    /// Attach existing scene files to the grid
    pub fn discover(&mut self) -> Result<usize> {
        Ok(self.grid.discover()?)
    }

    /// Unload everything and make `coord` the current cell
    pub fn goto_cell(&mut self, coord: CellCoord) -> Result<Option<LoadReport>> {
        self.ensure_idle()?;
        self.mode = ActiveMode::Idle;
        Ok(self.grid.goto(coord, &self.types)?)
    }

    /// Load `coord` alongside the loaded cells
    pub fn load(&mut self, coord: CellCoord) -> Result<LoadReport> {
        self.ensure_idle()?;
        Ok(self.grid.load(coord, &self.types)?)
    }

    /// Save `coord`
    pub fn save(&mut self, coord: CellCoord) -> Result<SaveReport> {
        self.ensure_idle()?;
        Ok(self.grid.save(coord, &self.types)?)
    }

    /// Save the current cell
    pub fn save_current(&mut self) -> Result<SaveReport> {
        let coord = self.grid.current().ok_or(EditorError::NoCurrentCell)?;
        self.save(coord)
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Selected ids of the current cell
    pub fn current_selection(&self) -> Vec<EntityId> {
        self.grid
            .current_scene()
            .map(|scene| scene.state.selected_ids())
            .unwrap_or_default()
    }

    /// Replace the selection; unknown ids are ignored
    pub fn set_selection(&mut self, ids: &[EntityId]) -> Result<()> {
        self.select_many(ids, SelectMode::Set)
    }

    /// Combine `ids` with the selection
    pub fn select_many(&mut self, ids: &[EntityId], mode: SelectMode) -> Result<()> {
        self.ensure_idle()?;
        let state = &mut self.scene_mut()?.state;
        let known: Vec<EntityId> = ids
            .iter()
            .filter(|id| state.registry.contains(id))
            .copied()
            .collect();
        state.selection.select_many(&known, mode);
        Ok(())
    }

    /// Combine one entity with the selection
    pub fn select(&mut self, id: EntityId, mode: SelectMode) -> Result<()> {
        self.select_many(&[id], mode)
    }

    /// Select every selectable entity
    pub fn select_all(&mut self) -> Result<usize> {
        self.ensure_idle()?;
        let state = &mut self.scene_mut()?.state;
        let ids: Vec<EntityId> = state
            .registry
            .iter()
            .filter(|e| e.selectable && !e.editor_only)
            .map(|e| e.id)
            .collect();
        state.selection.select_many(&ids, SelectMode::Set);
        Ok(ids.len())
    }

    /// Empty the selection
    pub fn clear_selection(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.scene_mut()?.state.selection.clear();
        Ok(())
    }

    /// Entity under `pointer` in the current cell
    pub fn pick_at(&self, pointer: Vec2) -> Option<PickHit> {
        let scene = self.grid.current_scene()?;
        selection::pick(
            &scene.state.registry,
            self.viewport.as_ref(),
            pointer,
            self.settings.pick_radius,
        )
    }

    /// Select the entities projected inside `rect`
    pub fn box_select(&mut self, rect: ScreenRect, mode: SelectMode) -> Result<usize> {
        self.ensure_idle()?;
        let viewport = self.viewport.as_ref();
        let state = &mut self
            .grid
            .current_scene_mut()
            .ok_or(EditorError::NoCurrentCell)?
            .state;
        let ids = selection::entities_in_rect(&state.registry, viewport, rect);
        state.selection.select_many(&ids, mode);
        tracing::debug!("Box selected {} entities", ids.len());
        Ok(ids.len())
    }

    // ------------------------------------------------------------------
    // Manipulators
    // ------------------------------------------------------------------

    /// Start a pointer-driven drag on the selection
    pub fn engage_manipulator(&mut self, kind: ManipulatorKind, handle: Handle) -> Result<()> {
        self.engage(kind, handle, DragTrigger::Pointer, false)
    }

    fn engage(
        &mut self,
        kind: ManipulatorKind,
        handle: Handle,
        trigger: DragTrigger,
        clear_selection_on_release: bool,
    ) -> Result<()> {
        match self.mode {
            ActiveMode::Idle => {}
            ActiveMode::Manipulating { .. } => return Err(ManipulatorError::AlreadyActive.into()),
            ActiveMode::BoxSelecting { .. } => return Err(EditorError::Busy),
        }
        let frame = match trigger {
            DragTrigger::Duplicate => FrameMode::Global,
            _ => self.frame_mode,
        };
        let config = SessionConfig::new(&self.settings, self.origin_mode, frame);
        let pointer = self.input.pointer();
        let viewport = self.viewport.as_ref();
        let scene = self
            .grid
            .current_scene_mut()
            .ok_or(EditorError::NoCurrentCell)?;
        let session = DragSession::engage(&mut scene.state, viewport, pointer, kind, handle, config)?;
        self.mode = ActiveMode::Manipulating {
            session,
            trigger,
            clear_selection_on_release,
        };
        Ok(())
    }

    /// Finish the active drag. Returns whether an undo entry was recorded.
    pub fn release_manipulator(&mut self) -> Result<bool> {
        if !self.is_manipulating() {
            return Ok(false);
        }
        let ActiveMode::Manipulating {
            session,
            clear_selection_on_release,
            ..
        } = std::mem::take(&mut self.mode)
        else {
            return Ok(false);
        };
        let Some(scene) = self.grid.current_scene_mut() else {
            drop(session);
            return Err(EditorError::NoCurrentCell);
        };

        let kind = session.kind();
        let count = session.entities().len();
        let record = session.release(&mut scene.state);
        let recorded = record.is_some();
        if let Some(record) = record {
            scene.history.record(
                format!("{} {}", kind.name(), commands::entities_label(count)),
                record,
            );
        }
        if clear_selection_on_release {
            scene.state.selection.clear();
        }
        Ok(recorded)
    }

    /// Abort the active drag, restoring every entity. Returns whether one was active.
    pub fn cancel_manipulator(&mut self) -> bool {
        match std::mem::take(&mut self.mode) {
            ActiveMode::Manipulating {
                session,
                clear_selection_on_release,
                ..
            } => match self.grid.current_scene_mut() {
                Some(scene) => {
                    session.cancel(&mut scene.state);
                    if clear_selection_on_release {
                        scene.state.selection.clear();
                    }
                    true
                }
                None => {
                    drop(session);
                    false
                }
            },
            ActiveMode::BoxSelecting { .. } => {
                tracing::debug!("Box selection cancelled");
                true
            }
            ActiveMode::Idle => false,
        }
    }

    /// Start a quick tool bound to a held key.
    fn quick_tool(&mut self, kind: ManipulatorKind, handle: Handle, key: Key) -> Result<()> {
        self.ensure_idle()?;
        let clear = self.select_hovered_if_empty()?;
        let result = self.engage(kind, handle, DragTrigger::HeldKey(key), clear);
        if result.is_err() && clear {
            self.scene_mut()?.state.selection.clear();
        }
        result
    }

    /// Select the hovered entity when nothing is selected. Returns whether it did.
    fn select_hovered_if_empty(&mut self) -> Result<bool> {
        if !self.current_scene()?.state.selected_ids().is_empty() {
            return Ok(false);
        }
        let Some(hit) = self.pick_at(self.input.pointer()) else {
            return Ok(false);
        };
        self.scene_mut()?.state.selection.add(hit.entity);
        Ok(true)
    }

    /// Start an edge-scale drag on the face under the pointer.
    fn edge_scale(&mut self, from_center: bool, key: Key) -> Result<()> {
        self.ensure_idle()?;
        let scene = self.current_scene()?;
        let hit = selection::raycast(
            &scene.state.registry,
            self.viewport.as_ref(),
            self.input.pointer(),
        )
        .ok_or(ManipulatorError::NoFace)?;
        let face = EdgeFace::from_normal(hit.local_normal, from_center)
            .ok_or(ManipulatorError::NoFace)?;

        let was_empty = scene.state.selected_ids().is_empty();
        let primary = scene.state.selection.primary().copied();
        if primary != Some(hit.entity) {
            self.scene_mut()?.state.selection.select(hit.entity, SelectMode::Set);
        }
        let result = self.engage(
            ManipulatorKind::EdgeScale(face),
            Handle::Uniform,
            DragTrigger::HeldKey(key),
            was_empty,
        );
        if result.is_err() && was_empty {
            self.scene_mut()?.state.selection.clear();
        }
        result
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Undo the last edit in the current cell
    pub fn undo(&mut self) -> Result<String> {
        self.ensure_idle()?;
        Ok(self.scene_mut()?.undo()?)
    }

    /// Redo the next edit in the current cell
    pub fn redo(&mut self) -> Result<String> {
        self.ensure_idle()?;
        Ok(self.scene_mut()?.redo()?)
    }

    /// Delete the selection and its descendants
    pub fn delete_selected(&mut self) -> Result<usize> {
        self.ensure_idle()?;
        Ok(commands::delete_selected(self.scene_mut()?)?)
    }

    /// Duplicate the selection and start dragging the copies on the XZ plane
    pub fn duplicate_selected(&mut self) -> Result<Vec<EntityId>> {
        self.ensure_idle()?;
        let ids = commands::duplicate_selected(self.scene_mut()?)?;
        let engaged = self.engage(
            ManipulatorKind::Translate,
            Handle::Plane(Axis::Y),
            DragTrigger::Duplicate,
            false,
        );
        if let Err(err) = engaged {
            // No drag means no duplicate.
            self.scene_mut()?.undo()?;
            return Err(err);
        }
        Ok(ids)
    }

    /// Copy the selection to the clipboard
    pub fn copy_selected(&mut self) -> Result<usize> {
        self.ensure_idle()?;
        let scene = self.current_scene()?;
        let count = scene.state.selected_ids().len();
        let text = commands::copy_selected(&scene.state, &self.types)?;
        self.clipboard = Some(text);
        Ok(count)
    }

    /// Paste the clipboard into the current cell
    pub fn paste(&mut self) -> Result<Vec<EntityId>> {
        self.ensure_idle()?;
        let text = self.clipboard.clone().ok_or(EditorError::EmptyClipboard)?;
        let scene = self
            .grid
            .current_scene_mut()
            .ok_or(EditorError::NoCurrentCell)?;
        Ok(commands::paste(scene, &self.types, &text)?)
    }

    /// Group the selection under a new entity
    pub fn group_selected(&mut self) -> Result<EntityId> {
        self.ensure_idle()?;
        Ok(commands::group_selected(self.scene_mut()?)?)
    }

    /// Construct and select a registered type
    pub fn spawn(&mut self, type_name: &str, position: Vec3) -> Result<EntityId> {
        self.ensure_idle()?;
        let scene = self
            .grid
            .current_scene_mut()
            .ok_or(EditorError::NoCurrentCell)?;
        Ok(commands::spawn(scene, &self.types, type_name, position)?)
    }

    /// Set a field on every selected entity
    pub fn set_attribute(&mut self, key: &str, value: Value) -> Result<usize> {
        self.ensure_idle()?;
        let scene = self.scene_mut()?;
        let ids = scene.state.selected_ids();
        if ids.is_empty() {
            return Err(CommandError::NothingSelected.into());
        }
        Ok(commands::set_attribute(scene, &ids, key, value)?)
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Feed a key event
    pub fn handle_key_event(&mut self, event: KeyEvent) {
        let fresh = self.input.key_event(event);
        if !event.pressed {
            if let ActiveMode::Manipulating {
                trigger: DragTrigger::HeldKey(key),
                ..
            } = self.mode
            {
                if key == event.key {
                    let result = self.release_manipulator().map(|_| ());
                    self.report(result);
                }
            }
            return;
        }
        if !fresh || matches!(event.key, Key::Control | Key::Shift | Key::Alt) {
            return;
        }

        if let ActiveMode::Manipulating { session, .. } = &mut self.mode {
            if session.kind() == ManipulatorKind::Scale {
                let axis = match event.key {
                    Key::Char('x') => Some(Axis::X),
                    Key::Char('y') => Some(Axis::Y),
                    Key::Char('z') => Some(Axis::Z),
                    _ => None,
                };
                if let Some(axis) = axis {
                    session.constrain_scale_axis(axis);
                    return;
                }
            }
        }

        let Some(action) = self
            .settings
            .keys
            .action_for(event.key, self.input.modifiers())
        else {
            return;
        };
        let result = self.run_action(action, event.key);
        self.report(result);
    }

    /// Perform a bound action as if its primary key had been pressed
    pub fn execute_action(&mut self, action: EditorAction) -> Result<()> {
        let key = self.settings.keys.hold_key(action).unwrap_or(Key::Escape);
        self.run_action(action, key)
    }

    fn run_action(&mut self, action: EditorAction, key: Key) -> Result<()> {
        tracing::trace!("Action {:?} in mode {}", action, self.mode.name());
        match action {
            EditorAction::Save => self.save_current().map(|_| ()),
            EditorAction::Undo => self.undo().map(|_| ()),
            EditorAction::Redo => self.redo().map(|_| ()),
            EditorAction::SelectAll => self.select_all().map(|_| ()),
            EditorAction::Delete => self.delete_selected().map(|_| ()),
            EditorAction::Duplicate => self.duplicate_selected().map(|_| ()),
            EditorAction::Copy => self.copy_selected().map(|_| ()),
            EditorAction::Paste => self.paste().map(|_| ()),
            EditorAction::Group => self.group_selected().map(|_| ()),
            EditorAction::Cancel => {
                self.cancel_manipulator();
                Ok(())
            }
            EditorAction::GizmoTranslate => {
                self.set_gizmo_mode(GizmoMode::Translate);
                Ok(())
            }
            EditorAction::GizmoScale => {
                self.set_gizmo_mode(GizmoMode::Scale);
                Ok(())
            }
            EditorAction::GizmoRotate => {
                self.set_gizmo_mode(GizmoMode::Rotate);
                Ok(())
            }
            EditorAction::GizmoNone => {
                self.set_gizmo_mode(GizmoMode::Hidden);
                Ok(())
            }
            EditorAction::CycleOriginMode => {
                self.cycle_origin_mode();
                Ok(())
            }
            EditorAction::ToggleFrameMode => {
                self.toggle_frame_mode();
                Ok(())
            }
            EditorAction::QuickMove(axis) => {
                self.quick_tool(ManipulatorKind::Translate, Handle::Axis(axis), key)
            }
            EditorAction::QuickMovePlane => {
                self.quick_tool(ManipulatorKind::Translate, Handle::Plane(Axis::Y), key)
            }
            EditorAction::QuickScale => self.quick_tool(ManipulatorKind::Scale, Handle::Uniform, key),
            EditorAction::QuickRotate => {
                self.quick_tool(ManipulatorKind::Rotate, Handle::Axis(Axis::Y), key)
            }
            EditorAction::EdgeScale => self.edge_scale(false, key),
            EditorAction::EdgeScaleFromCenter => self.edge_scale(true, key),
        }
    }

    fn report(&self, result: Result<()>) {
        match result {
            Ok(()) => {}
            Err(EditorError::Busy) => {
                tracing::debug!("Ignored input while {}", self.mode.name());
            }
            Err(err) => tracing::warn!("{err}"),
        }
    }

    /// Feed pointer movement in normalized screen units
    pub fn handle_pointer_move(&mut self, delta: Vec2) {
        self.input.pointer_moved(delta);
    }

    /// Place the pointer without generating movement
    pub fn set_pointer(&mut self, position: Vec2) {
        self.input.set_pointer(position);
    }

    /// Feed a pointer button. `handle` is the gizmo handle under the pointer, if any.
    pub fn handle_pointer_button(
        &mut self,
        button: PointerButton,
        pressed: bool,
        handle: Option<Handle>,
    ) -> Result<()> {
        match (button, pressed) {
            (PointerButton::Left, true) => self.pointer_pressed(handle),
            (PointerButton::Left, false) => self.pointer_released(),
            (PointerButton::Middle, true) => {
                if let ActiveMode::Manipulating { session, .. } = &mut self.mode {
                    session.toggle_dominant_axis_lock();
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn pointer_pressed(&mut self, handle: Option<Handle>) -> Result<()> {
        if !matches!(self.mode, ActiveMode::Idle) {
            return Err(EditorError::Busy);
        }
        if let (Some(handle), Some(kind)) = (handle, self.gizmo_mode.kind()) {
            if !self.current_selection().is_empty() {
                return self.engage(kind, handle, DragTrigger::Pointer, false);
            }
        }

        let modifiers = self.input.modifiers();
        let mode = if modifiers.shift {
            SelectMode::Add
        } else if modifiers.alt {
            SelectMode::Remove
        } else {
            SelectMode::Set
        };
        let pointer = self.input.pointer();
        match self.pick_at(pointer) {
            Some(hit) => self.select(hit.entity, mode)?,
            None if mode == SelectMode::Set => self.clear_selection()?,
            None => {}
        }
        self.mode = ActiveMode::BoxSelecting {
            start: pointer,
            mode,
        };
        Ok(())
    }

    fn pointer_released(&mut self) -> Result<()> {
        match self.mode {
            ActiveMode::Manipulating { trigger, .. } => {
                if matches!(trigger, DragTrigger::Pointer | DragTrigger::Duplicate) {
                    self.release_manipulator()?;
                }
                Ok(())
            }
            ActiveMode::BoxSelecting { start, mode } => {
                self.mode = ActiveMode::Idle;
                let rect = ScreenRect::from_corners(start, self.input.pointer());
                let size = rect.size();
                if size.x >= self.settings.min_box_size && size.y >= self.settings.min_box_size {
                    self.box_select(rect, mode)?;
                }
                Ok(())
            }
            ActiveMode::Idle => Ok(()),
        }
    }

    /// Advance one tick: sample input once and feed the active session
    pub fn update(&mut self) {
        let sample = self.input.sample();
        let ActiveMode::Manipulating { session, .. } = &mut self.mode else {
            return;
        };
        let Some(scene) = self.grid.current_scene_mut() else {
            return;
        };
        session.update(&mut scene.state, self.viewport.as_ref(), &sample);
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor settings stored as RON.

use crate::input::{Key, KeyCombo, Modifiers};
use crate::math::Axis;
use crate::selection::{FrameMode, OriginMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Errors loading or saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// File could not be read or written
    #[error("Settings I/O error at {path:?}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid RON for the settings
    #[error("Settings parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Settings serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// File was written by a newer version
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version understood
        supported: u32,
    },
}

/// A command the editor can be asked to perform from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditorAction {
    /// Save the current cell
    Save,
    /// Undo
    Undo,
    /// Redo
    Redo,
    /// Select every selectable entity
    SelectAll,
    /// Delete the selection
    Delete,
    /// Duplicate the selection and drag the copies
    Duplicate,
    /// Copy the selection to the clipboard
    Copy,
    /// Paste from the clipboard
    Paste,
    /// Group the selection under a new entity
    Group,
    /// Cancel the active manipulator
    Cancel,
    /// Pointer drags on handles translate
    GizmoTranslate,
    /// Pointer drags on handles scale
    GizmoScale,
    /// Pointer drags on handles rotate
    GizmoRotate,
    /// Hide the gizmo
    GizmoNone,
    /// Cycle last / center / individual
    CycleOriginMode,
    /// Toggle local / global axes
    ToggleFrameMode,
    /// Hold to move along an axis
    QuickMove(Axis),
    /// Hold to move on the horizontal plane
    QuickMovePlane,
    /// Hold to scale
    QuickScale,
    /// Hold to rotate about the vertical axis
    QuickRotate,
    /// Hold to drag the hovered face
    EdgeScale,
    /// Hold to drag the hovered face symmetrically
    EdgeScaleFromCenter,
}

/// One key binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    /// Action triggered
    pub action: EditorAction,
    /// Key combination
    pub combo: KeyCombo,
}

/// Keyboard layout of the editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    /// All bindings; an action may have several
    pub bindings: Vec<KeyBinding>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        use EditorAction as A;
        let alt_a = KeyCombo {
            key: Key::char('a'),
            modifiers: Modifiers {
                alt: true,
                ..Modifiers::default()
            },
        };
        let table = [
            (A::Save, KeyCombo::ctrl('s')),
            (A::Undo, KeyCombo::ctrl('z')),
            (A::Redo, KeyCombo::ctrl('y')),
            (A::SelectAll, KeyCombo::ctrl('a')),
            (A::Delete, KeyCombo::key(Key::Delete)),
            (A::Delete, KeyCombo::ctrl('x')),
            (A::Duplicate, KeyCombo::shift('d')),
            (A::Copy, KeyCombo::ctrl('c')),
            (A::Paste, KeyCombo::ctrl('v')),
            (A::Group, KeyCombo::ctrl('g')),
            (A::Cancel, KeyCombo::key(Key::Escape)),
            (A::GizmoTranslate, KeyCombo::plain('w')),
            (A::GizmoScale, KeyCombo::plain('e')),
            (A::GizmoRotate, KeyCombo::plain('u')),
            (A::GizmoNone, KeyCombo::plain('q')),
            (A::CycleOriginMode, KeyCombo::plain('o')),
            (A::ToggleFrameMode, KeyCombo::plain('l')),
            (A::QuickMove(Axis::X), KeyCombo::plain('x')),
            (A::QuickMove(Axis::Y), KeyCombo::plain('y')),
            (A::QuickMove(Axis::Z), KeyCombo::plain('z')),
            (A::QuickMovePlane, KeyCombo::plain('d')),
            (A::QuickScale, KeyCombo::plain('s')),
            (A::QuickRotate, KeyCombo::plain('r')),
            (A::EdgeScale, KeyCombo::plain('a')),
            (A::EdgeScaleFromCenter, alt_a),
        ];
        Self {
            bindings: table
                .into_iter()
                .map(|(action, combo)| KeyBinding { action, combo })
                .collect(),
        }
    }
}

impl KeyBindings {
    /// Action bound to `key` with exactly `modifiers` held
    pub fn action_for(&self, key: Key, modifiers: Modifiers) -> Option<EditorAction> {
        self.bindings
            .iter()
            .find(|b| b.combo.matches(key, modifiers))
            .map(|b| b.action)
    }

    /// Keys bound to `action` (first one is the primary)
    pub fn combos_for(&self, action: EditorAction) -> impl Iterator<Item = KeyCombo> + '_ {
        self.bindings
            .iter()
            .filter(move |b| b.action == action)
            .map(|b| b.combo)
    }

    /// Main key of a hold action, used to detect its release
    pub fn hold_key(&self, action: EditorAction) -> Option<Key> {
        self.combos_for(action).next().map(|c| c.key)
    }
}

/// Snap steps used while the snap modifier is held
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapSettings {
    /// Translation grid in world units
    pub translation: f32,
    /// Rotation step in degrees
    pub rotation: f32,
    /// Scale step
    pub scale: f32,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            translation: 1.0,
            rotation: 15.0,
            scale: 0.1,
        }
    }
}

/// Complete editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Settings format version
    pub version: u32,
    /// Folder holding the scene files
    pub scene_folder: PathBuf,
    /// Grid width in cells
    pub grid_width: u32,
    /// Grid height in cells
    pub grid_height: u32,
    /// Scene file extension, without the dot
    pub scene_extension: String,
    /// Field delimiter of scene files
    pub delimiter: char,
    /// Initial origin mode
    pub origin_mode: OriginMode,
    /// Initial frame mode
    pub frame_mode: FrameMode,
    /// Snap steps
    pub snap: SnapSettings,
    /// Degrees of rotation per normalized unit of pointer travel
    pub rotate_sensitivity: f32,
    /// Scale change per normalized unit of pointer travel
    pub scale_sensitivity: f32,
    /// Screen-space pick radius for collider-less entities
    pub pick_radius: f32,
    /// Smallest box-select extent, in normalized units
    pub min_box_size: f32,
    /// Per-component tolerance deciding whether a drag changed anything
    pub transform_epsilon: f32,
    /// Undo log depth per cell
    pub max_undo_depth: usize,
    /// Key bindings
    pub keys: KeyBindings,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            scene_folder: PathBuf::from("scenes"),
            grid_width: 8,
            grid_height: 8,
            scene_extension: "csv".to_string(),
            delimiter: ';',
            origin_mode: OriginMode::Center,
            frame_mode: FrameMode::Global,
            snap: SnapSettings::default(),
            rotate_sensitivity: 600.0,
            scale_sensitivity: 5.0,
            pick_radius: 0.03,
            min_box_size: 0.01,
            transform_epsilon: 1e-4,
            max_undo_depth: crate::history::MAX_HISTORY,
            keys: KeyBindings::default(),
        }
    }
}

impl EditorSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: EditorSettings = ron::from_str(&content)?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }
        tracing::info!("Loaded editor settings from {:?}", path);
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            tracing::info!("No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = EditorSettings::default();
        assert_eq!(settings.version, SETTINGS_FORMAT_VERSION);
        assert_eq!((settings.grid_width, settings.grid_height), (8, 8));
        assert_eq!(settings.delimiter, ';');
        assert_eq!(settings.pick_radius, 0.03);
    }

    #[test]
    fn test_serialization() {
        let mut settings = EditorSettings::default();
        settings.origin_mode = OriginMode::Individual;
        settings.snap.rotation = 45.0;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.ron");

        settings.save(&path).unwrap();
        let loaded = EditorSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = EditorSettings::load_or_default(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(loaded, EditorSettings::default());
    }

    #[test]
    fn test_partial_file_and_newer_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.ron");
        std::fs::write(&path, "(grid_width: 4, pick_radius: 0.05)").unwrap();
        let loaded = EditorSettings::load(&path).unwrap();
        assert_eq!(loaded.grid_width, 4);
        assert_eq!(loaded.grid_height, 8);

        std::fs::write(&path, "(version: 99)").unwrap();
        assert!(matches!(
            EditorSettings::load(&path),
            Err(SettingsError::UnsupportedVersion { found: 99, .. })
        ));

        std::fs::write(&path, "not ron").unwrap();
        assert!(matches!(EditorSettings::load(&path), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_key_lookup() {
        let keys = KeyBindings::default();
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::default()
        };
        assert_eq!(keys.action_for(Key::char('z'), ctrl), Some(EditorAction::Undo));
        assert_eq!(
            keys.action_for(Key::char('z'), Modifiers::default()),
            Some(EditorAction::QuickMove(Axis::Z))
        );
        assert_eq!(keys.action_for(Key::Delete, Modifiers::default()), Some(EditorAction::Delete));
        assert_eq!(keys.combos_for(EditorAction::Delete).count(), 2);
        assert_eq!(keys.hold_key(EditorAction::QuickScale), Some(Key::Char('s')));
    }
}

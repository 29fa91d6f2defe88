// SPDX-License-Identifier: MIT OR Apache-2.0
//! Key and pointer events, and the per-tick input sampler.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A keyboard key as seen by the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// A printable key, lowercase
    Char(char),
    /// Delete
    Delete,
    /// Escape
    Escape,
    /// Either control key
    Control,
    /// Either shift key
    Shift,
    /// Either alt key
    Alt,
}

impl Key {
    /// Printable key, normalized to lowercase
    pub fn char(c: char) -> Self {
        Self::Char(c.to_ascii_lowercase())
    }

    fn is_modifier(self) -> bool {
        matches!(self, Self::Control | Self::Shift | Self::Alt)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            Self::Delete => f.write_str("Delete"),
            Self::Escape => f.write_str("Escape"),
            Self::Control => f.write_str("Ctrl"),
            Self::Shift => f.write_str("Shift"),
            Self::Alt => f.write_str("Alt"),
        }
    }
}

/// A key press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Key involved
    pub key: Key,
    /// `true` for press, `false` for release
    pub pressed: bool,
}

impl KeyEvent {
    /// Key press
    pub fn press(key: Key) -> Self {
        Self { key, pressed: true }
    }

    /// Key release
    pub fn release(key: Key) -> Self {
        Self {
            key,
            pressed: false,
        }
    }
}

/// Pointer buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    /// Primary button
    Left,
    /// Middle button
    Middle,
    /// Secondary button
    Right,
}

/// Held modifier keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    /// Control held
    pub ctrl: bool,
    /// Shift held
    pub shift: bool,
    /// Alt held
    pub alt: bool,
}

impl Modifiers {
    /// Whether no modifier is held
    pub fn is_empty(&self) -> bool {
        !(self.ctrl || self.shift || self.alt)
    }
}

/// A key with the exact set of modifiers that must be held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCombo {
    /// Main key
    pub key: Key,
    /// Required modifiers
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl KeyCombo {
    /// Key without modifiers
    pub fn plain(c: char) -> Self {
        Self {
            key: Key::char(c),
            modifiers: Modifiers::default(),
        }
    }

    /// Non-character key without modifiers
    pub fn key(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    /// Control + key
    pub fn ctrl(c: char) -> Self {
        Self {
            key: Key::char(c),
            modifiers: Modifiers {
                ctrl: true,
                ..Modifiers::default()
            },
        }
    }

    /// Shift + key
    pub fn shift(c: char) -> Self {
        Self {
            key: Key::char(c),
            modifiers: Modifiers {
                shift: true,
                ..Modifiers::default()
            },
        }
    }

    /// Whether `key` with `modifiers` held triggers this combo
    pub fn matches(&self, key: Key, modifiers: Modifiers) -> bool {
        self.key == key && self.modifiers == modifiers
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.modifiers.shift {
            f.write_str("Shift+")?;
        }
        if self.modifiers.alt {
            f.write_str("Alt+")?;
        }
        write!(f, "{}", self.key)
    }
}

/// Input accumulated between two ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSample {
    /// Pointer position in normalized screen space
    pub pointer: Vec2,
    /// Pointer movement since the previous sample
    pub delta: Vec2,
    /// Held modifiers
    pub modifiers: Modifiers,
}

impl InputSample {
    /// Whether discrete snapping is requested
    pub fn snap(&self) -> bool {
        self.modifiers.ctrl
    }
}

/// Collects raw events and hands out one [`InputSample`] per tick
#[derive(Debug, Clone, Default)]
pub struct InputSampler {
    pointer: Vec2,
    pending_delta: Vec2,
    modifiers: Modifiers,
    held: HashSet<Key>,
}

impl InputSampler {
    /// Create a sampler with the pointer at the screen centre
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a key event; returns `false` for repeats of held keys
    pub fn key_event(&mut self, event: KeyEvent) -> bool {
        match event.key {
            Key::Control => self.modifiers.ctrl = event.pressed,
            Key::Shift => self.modifiers.shift = event.pressed,
            Key::Alt => self.modifiers.alt = event.pressed,
            _ => {}
        }
        if event.pressed {
            self.held.insert(event.key)
        } else {
            self.held.remove(&event.key);
            true
        }
    }

    /// Accumulate pointer movement
    pub fn pointer_moved(&mut self, delta: Vec2) {
        self.pointer += delta;
        self.pending_delta += delta;
    }

    /// Place the pointer without generating movement
    pub fn set_pointer(&mut self, position: Vec2) {
        self.pointer = position;
    }

    /// Current pointer position
    pub fn pointer(&self) -> Vec2 {
        self.pointer
    }

    /// Currently held modifiers
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Whether a non-modifier key is held
    pub fn is_held(&self, key: Key) -> bool {
        !key.is_modifier() && self.held.contains(&key)
    }

    /// Take the sample for this tick, resetting the accumulated movement
    pub fn sample(&mut self) -> InputSample {
        InputSample {
            pointer: self.pointer,
            delta: std::mem::take(&mut self.pending_delta),
            modifiers: self.modifiers,
        }
    }
}

//! Keyboard modifier mask carried in every keyboard report.
//!
//! # Bit layout
//!
//! | Bit | Modifier    |
//! |-----|-------------|
//! | 0   | Left Ctrl   |
//! | 1   | Left Shift  |
//! | 2   | Left Alt    |
//! | 3   | Left Win    |
//! | 4   | Right Ctrl  |
//! | 5   | Right Shift |
//! | 6   | Right Alt   |
//! | 7   | Right Win   |
//!
//! This is the standard boot-protocol keyboard modifier byte, so the mask is
//! copied into the report unchanged.

use serde::{Deserialize, Serialize};

/// One of the eight keyboard modifier keys.
///
/// The discriminant is the modifier's bit in the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Modifier {
    LeftCtrl = 1 << 0,
    LeftShift = 1 << 1,
    LeftAlt = 1 << 2,
    LeftWin = 1 << 3,
    RightCtrl = 1 << 4,
    RightShift = 1 << 5,
    RightAlt = 1 << 6,
    RightWin = 1 << 7,
}

impl Modifier {
    /// All modifiers in bit order.
    pub const ALL: [Modifier; 8] = [
        Modifier::LeftCtrl,
        Modifier::LeftShift,
        Modifier::LeftAlt,
        Modifier::LeftWin,
        Modifier::RightCtrl,
        Modifier::RightShift,
        Modifier::RightAlt,
        Modifier::RightWin,
    ];

    /// The modifier's bit in the mask.
    pub fn bit(self) -> u8 {
        self as u8
    }
}

/// Cumulative mask of currently held modifiers.
///
/// Starts empty.  Plain key presses and releases never touch it; only
/// [`set`](Self::set), [`clear`](Self::clear) and [`reset_all`](Self::reset_all) do.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ModifierState {
    mask: u8,
}

impl ModifierState {
    /// Creates an empty mask.
    pub fn new() -> Self {
        Self::default()
    }

    /// ORs `bit` into the mask.
    pub fn set(&mut self, bit: u8) {
        self.mask |= bit;
    }

    /// Clears `bit` from the mask.  Clearing an unset bit is a no-op.
    pub fn clear(&mut self, bit: u8) {
        self.mask &= !bit;
    }

    /// Current mask.
    pub fn current(&self) -> u8 {
        self.mask
    }

    /// Forces the mask to zero.
    pub fn reset_all(&mut self) {
        self.mask = 0;
    }

    /// Returns `true` if `modifier` is held.
    pub fn is_held(&self, modifier: Modifier) -> bool {
        self.mask & modifier.bit() != 0
    }

    /// Returns `true` if either Ctrl is held.
    pub fn ctrl(&self) -> bool {
        self.is_held(Modifier::LeftCtrl) || self.is_held(Modifier::RightCtrl)
    }

    /// Returns `true` if either Shift is held.
    pub fn shift(&self) -> bool {
        self.is_held(Modifier::LeftShift) || self.is_held(Modifier::RightShift)
    }

    /// Returns `true` if either Alt is held.
    pub fn alt(&self) -> bool {
        self.is_held(Modifier::LeftAlt) || self.is_held(Modifier::RightAlt)
    }

    /// Returns `true` if either Win key is held.
    pub fn win(&self) -> bool {
        self.is_held(Modifier::LeftWin) || self.is_held(Modifier::RightWin)
    }
}

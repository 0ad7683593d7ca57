//! Held-button flags for the relative mouse report.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Mouse button identifier.  The discriminant is the button's bit in the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MouseButton {
    Left = 0x01,
    Right = 0x02,
    Middle = 0x04,
    X1 = 0x08,
    X2 = 0x10,
}

impl MouseButton {
    /// All buttons in bit order.
    pub const ALL: [MouseButton; 5] = [
        MouseButton::Left,
        MouseButton::Right,
        MouseButton::Middle,
        MouseButton::X1,
        MouseButton::X2,
    ];

    /// The button's bit in the mask.
    pub fn bit(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
            MouseButton::X1 => "x1",
            MouseButton::X2 => "x2",
        };
        f.write_str(name)
    }
}

impl FromStr for MouseButton {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(MouseButton::Left),
            "right" => Ok(MouseButton::Right),
            "middle" => Ok(MouseButton::Middle),
            "x1" => Ok(MouseButton::X1),
            "x2" => Ok(MouseButton::X2),
            other => Err(format!("unknown mouse button: {other}")),
        }
    }
}

/// Five independent held flags.
///
/// A flag is raised only by [`press`](Self::press) for its own button and
/// lowered only by [`release_all`](Self::release_all).  There is no
/// single-button release; callers needing partial release track it themselves.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MouseButtonState {
    left: bool,
    right: bool,
    middle: bool,
    x1: bool,
    x2: bool,
}

impl MouseButtonState {
    /// Creates a state with no buttons held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `button` as held.
    pub fn press(&mut self, button: MouseButton) {
        match button {
            MouseButton::Left => self.left = true,
            MouseButton::Right => self.right = true,
            MouseButton::Middle => self.middle = true,
            MouseButton::X1 => self.x1 = true,
            MouseButton::X2 => self.x2 = true,
        }
    }

    /// Lowers every flag.
    pub fn release_all(&mut self) {
        *self = Self::default();
    }

    /// Returns `true` if `button` is held.
    pub fn is_held(&self, button: MouseButton) -> bool {
        match button {
            MouseButton::Left => self.left,
            MouseButton::Right => self.right,
            MouseButton::Middle => self.middle,
            MouseButton::X1 => self.x1,
            MouseButton::X2 => self.x2,
        }
    }

    /// OR of the bits of every held button.
    pub fn mask(&self) -> u8 {
        MouseButton::ALL
            .into_iter()
            .filter(|&b| self.is_held(b))
            .fold(0u8, |acc, b| acc | b.bit())
    }
}

//! Key code translation from captured platform codes to HID usages.
//!
//! The encoder speaks HID usages (page 0x07).  Captured key events speak
//! Windows virtual-key codes.  This module is the bridge.

pub mod hid;
pub mod windows_vk;

pub use windows_vk::vk;

use crate::domain::Modifier;

/// What a captured key means to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// One of the eight modifiers: toggles a mask bit.
    Modifier(Modifier),
    /// A plain key: goes into key slot 1.
    Key(u8),
    /// No keyboard usage exists for this code.
    Unmapped,
}

/// Unified key mapper for captured key codes.
pub struct KeyMapper;

impl KeyMapper {
    /// Translates a Windows VK code to a HID usage.
    ///
    /// Returns `None` if no mapping exists for `code`.
    pub fn windows_vk_to_hid(code: u8) -> Option<u8> {
        windows_vk::vk_to_hid(code)
    }

    /// Classifies a Windows VK code for routing.
    pub fn classify_windows_vk(code: u8) -> KeyAction {
        if let Some(modifier) = windows_vk::vk_to_modifier(code) {
            return KeyAction::Modifier(modifier);
        }
        match windows_vk::vk_to_hid(code) {
            Some(usage) => KeyAction::Key(usage),
            None => KeyAction::Unmapped,
        }
    }
}

//! Windows Virtual-Key (VK) code to USB HID usage translation.
//!
//! Input captured on Windows arrives as VK codes (`VK_A = 0x41`,
//! `VK_RETURN = 0x0D`, ...).  The CH9329 wants HID usages, so every key event
//! passes through [`vk_to_hid`] on its way to the encoder.
//!
//! The table is a 256-entry `const` array indexed by VK code, so a lookup is
//! a single bounds-free index.  Entries without a keyboard usage hold
//! [`hid::NONE`].
//!
//! Reference: <https://learn.microsoft.com/windows/win32/inputdev/virtual-key-codes>

use super::hid;
use crate::domain::Modifier;

/// Named VK codes used by the host application.
pub mod vk {
    pub const BACK: u8 = 0x08;
    pub const RETURN: u8 = 0x0D;
    pub const ESCAPE: u8 = 0x1B;
    pub const SPACE: u8 = 0x20;
    pub const KEY_A: u8 = 0x41;
    pub const KEY_E: u8 = 0x45;
    pub const LWIN: u8 = 0x5B;
    pub const RWIN: u8 = 0x5C;
    pub const SCROLL: u8 = 0x91;
    pub const LSHIFT: u8 = 0xA0;
    pub const RSHIFT: u8 = 0xA1;
    pub const LCONTROL: u8 = 0xA2;
    pub const RCONTROL: u8 = 0xA3;
    pub const LMENU: u8 = 0xA4;
    pub const RMENU: u8 = 0xA5;
}

/// Translates a VK code to a HID usage, or `None` if it has no keyboard usage.
pub fn vk_to_hid(code: u8) -> Option<u8> {
    match VK_TO_HID[code as usize] {
        hid::NONE => None,
        usage => Some(usage),
    }
}

/// Returns the modifier for the eight side-specific modifier VKs.
///
/// The generic `VK_SHIFT`/`VK_CONTROL`/`VK_MENU` codes are not mapped: a
/// low-level hook always reports the sided variants.
pub fn vk_to_modifier(code: u8) -> Option<Modifier> {
    vk_to_hid(code).and_then(hid::modifier_for_usage)
}

const VK_TO_HID: [u8; 256] = {
    let mut t = [hid::NONE; 256];

    // Contiguous runs: letters, digits 1-9, function keys, numpad 1-9.
    let mut i = 0;
    while i < 26 {
        t[0x41 + i] = hid::KEY_A + i as u8;
        i += 1;
    }
    i = 0;
    while i < 9 {
        t[0x31 + i] = hid::DIGIT_1 + i as u8;
        t[0x61 + i] = hid::NUMPAD_1 + i as u8;
        i += 1;
    }
    i = 0;
    while i < 12 {
        t[0x70 + i] = hid::F1 + i as u8;
        i += 1;
    }
    t[0x30] = hid::DIGIT_0;
    t[0x60] = hid::NUMPAD_0;

    t[0x08] = hid::BACKSPACE;
    t[0x09] = hid::TAB;
    t[0x0D] = hid::ENTER;
    t[0x13] = hid::PAUSE;
    t[0x14] = hid::CAPS_LOCK;
    t[0x1B] = hid::ESCAPE;
    t[0x20] = hid::SPACE;
    t[0x21] = hid::PAGE_UP;
    t[0x22] = hid::PAGE_DOWN;
    t[0x23] = hid::END;
    t[0x24] = hid::HOME;
    t[0x25] = hid::ARROW_LEFT;
    t[0x26] = hid::ARROW_UP;
    t[0x27] = hid::ARROW_RIGHT;
    t[0x28] = hid::ARROW_DOWN;
    t[0x2C] = hid::PRINT_SCREEN;
    t[0x2D] = hid::INSERT;
    t[0x2E] = hid::DELETE;
    t[0x5D] = hid::CONTEXT_MENU;

    t[0x6A] = hid::NUMPAD_MULTIPLY;
    t[0x6B] = hid::NUMPAD_ADD;
    t[0x6D] = hid::NUMPAD_SUBTRACT;
    t[0x6E] = hid::NUMPAD_DECIMAL;
    t[0x6F] = hid::NUMPAD_DIVIDE;
    t[0x90] = hid::NUM_LOCK;
    t[0x91] = hid::SCROLL_LOCK;

    // OEM punctuation, US layout.
    t[0xBA] = hid::SEMICOLON;
    t[0xBB] = hid::EQUAL;
    t[0xBC] = hid::COMMA;
    t[0xBD] = hid::MINUS;
    t[0xBE] = hid::PERIOD;
    t[0xBF] = hid::SLASH;
    t[0xC0] = hid::BACKQUOTE;
    t[0xDB] = hid::BRACKET_LEFT;
    t[0xDC] = hid::BACKSLASH;
    t[0xDD] = hid::BRACKET_RIGHT;
    t[0xDE] = hid::QUOTE;

    // Modifiers.  Usages 0xE0..=0xE7 run Ctrl, Shift, Alt, Win for the left
    // side, then the same for the right.
    t[0xA2] = 0xE0;
    t[0xA0] = 0xE1;
    t[0xA4] = 0xE2;
    t[0x5B] = 0xE3;
    t[0xA3] = 0xE4;
    t[0xA1] = 0xE5;
    t[0xA5] = 0xE6;
    t[0x5C] = 0xE7;

    t
};

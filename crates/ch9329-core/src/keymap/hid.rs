//! USB HID Usage IDs (page 0x07, Keyboard/Keypad page).
//!
//! The CH9329 keyboard report carries raw usage bytes in its key slots, so
//! usages are kept as plain `u8` values here rather than wrapped in an enum.
//!
//! # What is a HID Usage ID? (for beginners)
//!
//! The USB HID standard assigns a number to every physical key position.
//! Letters start at `0x04` (A) rather than at ASCII `0x41`, because the number
//! names a *position*, not a character: the same usage produces "a" on QWERTY
//! and "q" on AZERTY.
//!
//! | Key          | Usage |
//! |--------------|-------|
//! | A            | 0x04  |
//! | 1            | 0x1E  |
//! | Enter        | 0x28  |
//! | Scroll Lock  | 0x47  |
//! | Left Ctrl    | 0xE0  |
//!
//! Usage `0x00` means "no key" and doubles as the unmapped sentinel.
//!
//! Reference: USB HID Usage Tables 1.3, Section 10.

use crate::domain::Modifier;

/// Empty key slot / unmapped key.
pub const NONE: u8 = 0x00;

pub const KEY_A: u8 = 0x04;
pub const KEY_E: u8 = 0x08;
pub const KEY_Z: u8 = 0x1D;
pub const DIGIT_1: u8 = 0x1E;
pub const DIGIT_0: u8 = 0x27;
pub const ENTER: u8 = 0x28;
pub const ESCAPE: u8 = 0x29;
pub const BACKSPACE: u8 = 0x2A;
pub const TAB: u8 = 0x2B;
pub const SPACE: u8 = 0x2C;
pub const MINUS: u8 = 0x2D;
pub const EQUAL: u8 = 0x2E;
pub const BRACKET_LEFT: u8 = 0x2F;
pub const BRACKET_RIGHT: u8 = 0x30;
pub const BACKSLASH: u8 = 0x31;
pub const SEMICOLON: u8 = 0x33;
pub const QUOTE: u8 = 0x34;
pub const BACKQUOTE: u8 = 0x35;
pub const COMMA: u8 = 0x36;
pub const PERIOD: u8 = 0x37;
pub const SLASH: u8 = 0x38;
pub const CAPS_LOCK: u8 = 0x39;
pub const F1: u8 = 0x3A;
pub const F12: u8 = 0x45;
pub const PRINT_SCREEN: u8 = 0x46;
pub const SCROLL_LOCK: u8 = 0x47;
pub const PAUSE: u8 = 0x48;
pub const INSERT: u8 = 0x49;
pub const HOME: u8 = 0x4A;
pub const PAGE_UP: u8 = 0x4B;
pub const DELETE: u8 = 0x4C;
pub const END: u8 = 0x4D;
pub const PAGE_DOWN: u8 = 0x4E;
pub const ARROW_RIGHT: u8 = 0x4F;
pub const ARROW_LEFT: u8 = 0x50;
pub const ARROW_DOWN: u8 = 0x51;
pub const ARROW_UP: u8 = 0x52;
pub const NUM_LOCK: u8 = 0x53;
pub const NUMPAD_DIVIDE: u8 = 0x54;
pub const NUMPAD_MULTIPLY: u8 = 0x55;
pub const NUMPAD_SUBTRACT: u8 = 0x56;
pub const NUMPAD_ADD: u8 = 0x57;
pub const NUMPAD_1: u8 = 0x59;
pub const NUMPAD_0: u8 = 0x62;
pub const NUMPAD_DECIMAL: u8 = 0x63;
pub const CONTEXT_MENU: u8 = 0x65;

/// First modifier usage (Left Ctrl).  The eight modifiers occupy
/// `0xE0..=0xE7` in the same order as the bits of the modifier mask.
pub const LEFT_CTRL: u8 = 0xE0;
pub const RIGHT_WIN: u8 = 0xE7;

/// Returns `true` for the eight modifier usages.
pub fn is_modifier(usage: u8) -> bool {
    (LEFT_CTRL..=RIGHT_WIN).contains(&usage)
}

/// Returns the modifier named by `usage`, if it is one.
pub fn modifier_for_usage(usage: u8) -> Option<Modifier> {
    if !is_modifier(usage) {
        return None;
    }
    Modifier::ALL.get((usage - LEFT_CTRL) as usize).copied()
}

//! Device state tracked across independent encoder calls.
//!
//! The CH9329 reports are *stateful snapshots*: every keyboard report carries
//! the full set of held modifiers and every mouse report carries the full set
//! of held buttons.  The encoder therefore has to remember what is currently
//! held between calls.  This module contains that memory and nothing else:
//! no I/O, no timing, just bit arithmetic.

pub mod buttons;
pub mod modifiers;

pub use buttons::{MouseButton, MouseButtonState};
pub use modifiers::{Modifier, ModifierState};

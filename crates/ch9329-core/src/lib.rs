//! # ch9329-core
//!
//! Frame builder, device state and HID encoder for the WCH CH9329
//! HID-over-serial adapter.
//!
//! This crate has no dependency on serial-port APIs, UI frameworks or input
//! hooks.  Finished frames leave through the [`TransportSink`] trait, which the
//! host application implements over a real UART.
//!
//! # Architecture overview (for beginners)
//!
//! The CH9329 sits between a UART and a USB port.  Bytes written to the UART
//! in the right shape make the chip appear, on the USB side, as a keyboard
//! and mouse being used.  A controlling machine can therefore drive a second
//! machine with no software installed on the second one.
//!
//! - **`protocol`** – The wire format: a `57 AB 00` header, a command byte, a
//!   length byte, the payload and a one-byte additive checksum.  Also the
//!   media-key payload table.
//!
//! - **`domain`** – What is currently held: the modifier mask and the mouse
//!   button flags.  Pure bit arithmetic, no I/O.
//!
//! - **`encoder`** – [`HidEncoder`], the public operations (key down/up, tap,
//!   modifiers, mouse move/buttons/scroll, media keys) that combine state and
//!   protocol into frames.
//!
//! - **`transport`** – The [`TransportSink`] seam and an in-memory
//!   [`RecordingSink`].
//!
//! - **`keymap`** – Windows virtual-key code to HID usage translation for
//!   captured key events.

pub mod domain;
pub mod encoder;
pub mod keymap;
pub mod protocol;
pub mod transport;

pub use domain::{Modifier, ModifierState, MouseButton, MouseButtonState};
pub use encoder::{EncodeError, EncoderTiming, HidEncoder, MoveDispatch};
pub use keymap::{KeyAction, KeyMapper};
pub use protocol::{build_packet, checksum, Command, Frame, MediaKey, MediaKeyTable};
pub use transport::{RecordingSink, TransportError, TransportSink};

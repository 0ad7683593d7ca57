//! HID encoder: turns high-level input operations into CH9329 frames.
//!
//! # Overview (for beginners)
//!
//! The CH9329 is a small chip that pretends to be a USB keyboard and mouse.
//! It listens on a UART and expects fixed-shape *reports* describing the
//! complete state of the keyboard or mouse at that instant.  "The user pressed
//! A while holding Shift" therefore becomes one keyboard report with the Shift
//! bit set in the modifier byte and `0x04` (the HID usage for A) in the first
//! key slot.
//!
//! [`HidEncoder`] owns the remembered state (held modifiers, held mouse
//! buttons), builds the report for each operation, and hands the finished
//! frame to a [`TransportSink`].
//!
//! # Ordering
//!
//! Frames are written in call order.  Every synchronous write first waits for
//! a dispatched mouse move (see [`HidEncoder::dispatch_mouse_move_rel`]) to
//! finish, so a button or key change can never overtake a move that was
//! issued before it.
//!
//! # Errors
//!
//! A transport failure is returned to the caller as [`EncodeError::Transport`].
//! The encoder never retries, and state already updated by the operation
//! (for example the modifier bit in [`HidEncoder::press_modifier`]) is kept,
//! so the next successful report carries it.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};

use crate::domain::{Modifier, ModifierState, MouseButton, MouseButtonState};
use crate::protocol::frame::{MEDIA_RELEASE_FRAME, MOUSE_RELEASE_FRAME};
use crate::protocol::{command_frame, Command, Frame, MediaKey, MediaKeyTable};
use crate::transport::{TransportError, TransportSink};

mod dispatch;

pub use dispatch::MoveDispatch;

use dispatch::MoveDispatcher;

/// Default pause between the press and release halves of [`HidEncoder::tap_key`].
pub const DEFAULT_TAP_DELAY: Duration = Duration::from_millis(5);

/// Default pause between a media press frame and its release frame.
pub const DEFAULT_MEDIA_RELEASE_DELAY: Duration = Duration::from_millis(10);

/// Shortest delay the encoder will honour; zero would collapse a tap into a
/// single scan cycle on the target.
const MIN_DELAY: Duration = Duration::from_millis(1);

/// Relative-mode flag, first byte of every mouse payload.
const MOUSE_RELATIVE_MODE: u8 = 0x01;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors returned by encoder operations.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The media table has no payload for this action.
    #[error("unknown media key: {0}")]
    UnknownMediaKey(String),
}

// ── Timing ────────────────────────────────────────────────────────────────────

/// Delays used by the two-frame operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderTiming {
    pub tap_delay: Duration,
    pub media_release_delay: Duration,
}

impl Default for EncoderTiming {
    fn default() -> Self {
        Self {
            tap_delay: DEFAULT_TAP_DELAY,
            media_release_delay: DEFAULT_MEDIA_RELEASE_DELAY,
        }
    }
}

impl EncoderTiming {
    /// Raises any zero delay to the 1 ms minimum.
    fn sanitized(self) -> Self {
        Self {
            tap_delay: self.tap_delay.max(MIN_DELAY),
            media_release_delay: self.media_release_delay.max(MIN_DELAY),
        }
    }
}

// ── Encoder ───────────────────────────────────────────────────────────────────

/// Encodes keyboard, mouse and media operations for one serial session.
///
/// All operations take `&mut self`: the encoder must be driven by a single
/// logical caller.  Share it behind a mutex if several tasks need it.
pub struct HidEncoder {
    sink: Arc<dyn TransportSink>,
    modifiers: ModifierState,
    buttons: MouseButtonState,
    media_keys: MediaKeyTable,
    timing: EncoderTiming,
    mover: MoveDispatcher,
}

impl HidEncoder {
    /// Creates an encoder with default timing and the standard media table.
    pub fn new(sink: Arc<dyn TransportSink>) -> Self {
        Self::with_timing(sink, EncoderTiming::default())
    }

    /// Creates an encoder with custom delays.
    pub fn with_timing(sink: Arc<dyn TransportSink>, timing: EncoderTiming) -> Self {
        Self {
            mover: MoveDispatcher::new(Arc::clone(&sink)),
            sink,
            modifiers: ModifierState::new(),
            buttons: MouseButtonState::new(),
            media_keys: MediaKeyTable::new(),
            timing: timing.sanitized(),
        }
    }

    /// Replaces the media-key table.
    pub fn with_media_keys(mut self, table: MediaKeyTable) -> Self {
        self.media_keys = table;
        self
    }

    /// Current modifier mask.
    pub fn modifier_mask(&self) -> u8 {
        self.modifiers.current()
    }

    /// Held-modifier state, for chord detection.
    pub fn modifiers(&self) -> &ModifierState {
        &self.modifiers
    }

    /// Current mouse button mask.
    pub fn button_mask(&self) -> u8 {
        self.buttons.mask()
    }

    pub fn timing(&self) -> EncoderTiming {
        self.timing
    }

    // ── Keyboard ──────────────────────────────────────────────────────────────

    /// Reports `key` in slot 1 together with the held modifiers.
    pub fn key_down(&mut self, key: u8) -> Result<(), EncodeError> {
        self.send_keyboard_report(key)
    }

    /// Releases every plain key.  Held modifiers stay held.
    pub fn key_up(&mut self) -> Result<(), EncodeError> {
        self.send_keyboard_report(0)
    }

    /// Clears the modifier mask and sends an all-zero keyboard report.
    pub fn release_all(&mut self) -> Result<(), EncodeError> {
        self.modifiers.reset_all();
        debug!("keyboard released (modifiers cleared)");
        self.send_keyboard_report(0)
    }

    pub fn press_modifier(&mut self, modifier: Modifier) -> Result<(), EncodeError> {
        self.modifiers.set(modifier.bit());
        debug!(?modifier, mask = self.modifiers.current(), "modifier pressed");
        self.send_keyboard_report(0)
    }

    pub fn release_modifier(&mut self, modifier: Modifier) -> Result<(), EncodeError> {
        self.modifiers.clear(modifier.bit());
        debug!(?modifier, mask = self.modifiers.current(), "modifier released");
        self.send_keyboard_report(0)
    }

    /// Presses and releases `key`, pausing the tap delay in between.
    ///
    /// Blocks the caller for the duration of the delay.
    pub fn tap_key(&mut self, key: u8) -> Result<(), EncodeError> {
        self.send_keyboard_report(key)?;
        thread::sleep(self.timing.tap_delay);
        self.send_keyboard_report(0)
    }

    // ── Media ─────────────────────────────────────────────────────────────────

    /// Sends the press report for `key`, waits, then the fixed release report.
    pub fn media_key_press(&mut self, key: MediaKey) -> Result<(), EncodeError> {
        let payload = self.media_keys.lookup(key)?;
        self.write(command_frame(Command::Media, &payload))?;
        thread::sleep(self.timing.media_release_delay);
        self.write(Frame::from_static(&MEDIA_RELEASE_FRAME))
    }

    // ── Mouse ─────────────────────────────────────────────────────────────────

    /// Sends a relative move, saturating each axis to `[-128, 127]`.
    pub fn mouse_move_rel(&mut self, dx: i32, dy: i32) -> Result<(), EncodeError> {
        let frame = self.mouse_move_frame(dx, dy);
        self.write(frame)
    }

    /// Hands a relative move to the writer thread without blocking.
    ///
    /// Returns [`MoveDispatch::Busy`] and sends nothing while an earlier move
    /// is still being written.  Failures of the background write are
    /// collected by [`take_move_failures`](Self::take_move_failures).
    pub fn dispatch_mouse_move_rel(&mut self, dx: i32, dy: i32) -> Result<MoveDispatch, EncodeError> {
        let frame = self.mouse_move_frame(dx, dy);
        Ok(self.mover.dispatch(frame)?)
    }

    /// Returns `true` while a dispatched move is being written.
    pub fn move_in_flight(&self) -> bool {
        self.mover.in_flight()
    }

    /// Blocks until no dispatched move is in flight.
    pub fn wait_for_moves(&self) {
        self.mover.wait_idle();
    }

    /// Drains the failures of dispatched moves since the last call.
    pub fn take_move_failures(&self) -> Vec<TransportError> {
        self.mover.take_failures()
    }

    /// Marks `button` held and sends a zero-displacement move carrying the
    /// new mask.
    pub fn mouse_button_down(&mut self, button: MouseButton) -> Result<(), EncodeError> {
        self.buttons.press(button);
        debug!(%button, mask = self.buttons.mask(), "mouse button down");
        self.mouse_move_rel(0, 0)
    }

    /// Releases every button.  There is no single-button release.
    pub fn mouse_button_up_all(&mut self) -> Result<(), EncodeError> {
        self.buttons.release_all();
        debug!("mouse buttons released");
        self.write(Frame::from_static(&MOUSE_RELEASE_FRAME))
    }

    /// Sends a wheel step.  The held-button mask is carried along.
    pub fn mouse_scroll(&mut self, count: i8) -> Result<(), EncodeError> {
        let payload = [
            MOUSE_RELATIVE_MODE,
            self.buttons.mask(),
            0x00,
            0x00,
            count as u8,
        ];
        self.write(command_frame(Command::MouseRelative, &payload))
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn send_keyboard_report(&self, key: u8) -> Result<(), EncodeError> {
        let payload = [self.modifiers.current(), 0x00, key, 0x00, 0x00, 0x00, 0x00, 0x00];
        self.write(command_frame(Command::Keyboard, &payload))
    }

    fn mouse_move_frame(&self, dx: i32, dy: i32) -> Frame {
        let payload = [
            MOUSE_RELATIVE_MODE,
            self.buttons.mask(),
            encode_axis(dx),
            encode_axis(dy),
            0x00,
        ];
        command_frame(Command::MouseRelative, &payload)
    }

    fn write(&self, frame: Frame) -> Result<(), EncodeError> {
        self.mover.wait_idle();
        trace!(frame = %frame, "tx");
        self.sink.write(frame.as_bytes())?;
        Ok(())
    }
}

/// Saturates `value` into `[-128, 127]` and returns its two's-complement byte.
pub fn encode_axis(value: i32) -> u8 {
    value.clamp(i8::MIN as i32, i8::MAX as i32) as i8 as u8
}

//! Input sources feeding the remote session.
//!
//! A source produces [`RawInputEvent`]s on a `std::sync::mpsc` channel.  The
//! binary drains that channel on a blocking thread and hands each event to
//! [`RemoteSession::handle_event`](crate::application::session::RemoteSession::handle_event).
//!
//! Key events carry Windows virtual-key codes, mouse movement carries
//! relative deltas, mirroring what a low-level Windows hook reports.
//!
//! # Testability
//!
//! The [`InputSource`] trait allows tests to inject synthetic events through
//! [`mock::MockInputSource`]; the binary uses [`script::ScriptInputSource`].

use std::path::PathBuf;
use std::sync::mpsc;

use ch9329_core::{MediaKey, MouseButton};

pub mod mock;
pub mod script;

/// A raw input event produced by an input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInputEvent {
    /// A key was pressed down.
    KeyDown {
        /// Windows Virtual Key code.
        vk_code: u8,
    },
    /// A key was released.
    KeyUp { vk_code: u8 },
    /// The mouse moved by a relative amount since the last event.
    MouseMove { dx: i32, dy: i32 },
    /// A mouse button was pressed.
    MouseButtonDown { button: MouseButton },
    /// A mouse button was released.
    MouseButtonUp { button: MouseButton },
    /// The vertical wheel was scrolled; positive is away from the user.
    MouseWheel { delta: i16 },
    /// One-shot media action.
    MediaKey { key: MediaKey },
    /// One-shot press-and-release of a key.
    TapKey { vk_code: u8 },
    /// Start forwarding input to the target.
    SessionEnter,
    /// Stop forwarding input and release everything held.
    SessionExit,
}

/// Error type for input source operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to read input script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid input script: {0}")]
    Script(#[from] script::ScriptError),
    #[error("failed to start input thread: {0}")]
    Spawn(std::io::Error),
    #[error("input source has already been started")]
    AlreadyStarted,
}

/// Trait abstracting input event production.
pub trait InputSource: Send {
    /// Starts the source and returns a receiver for its events.
    ///
    /// The channel closes when the source runs out of input or is stopped.
    fn start(&self) -> Result<mpsc::Receiver<RawInputEvent>, CaptureError>;

    /// Stops the source.  Events already queued stay in the channel.
    fn stop(&self);
}

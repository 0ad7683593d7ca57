//! Transport sink abstraction: where finished frames go.
//!
//! The encoder never touches a serial port directly.  It hands each frame to
//! a [`TransportSink`], which the host application implements over a real
//! serial port (or a recorder in tests).  Opening and closing the underlying
//! channel is the implementation's concern.

use thiserror::Error;

pub mod recording;

pub use recording::RecordingSink;

/// Errors reported by a [`TransportSink`].
///
/// These are link failures, not protocol failures: the frame itself was
/// well-formed.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying channel could not be opened.
    #[error("failed to open {port}: {reason}")]
    Open { port: String, reason: String },

    /// Writing the frame failed.
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),

    /// The sink (or the writer feeding it) has shut down.
    #[error("transport closed")]
    Closed,
}

/// Accepts complete frames and writes them to the wire.
///
/// Implementations must write `frame` verbatim: no bytes added, stripped or
/// reordered.  A frame is either written whole or reported as failed.
///
/// The sink is shared between the caller's thread and the encoder's
/// mouse-move writer thread, hence `&self` and `Send + Sync`.
#[cfg_attr(test, mockall::automock)]
pub trait TransportSink: Send + Sync {
    /// Writes one frame.
    fn write(&self, frame: &[u8]) -> Result<(), TransportError>;
}

//! Serial transport for the CH9329 adapter.
//!
//! [`SerialSink`] implements [`TransportSink`] over the `serialport` crate.
//! The port handle sits behind a `parking_lot::Mutex` because the encoder
//! writes from two threads: the caller's thread for keys, buttons and media,
//! and its mouse-move writer thread.
//!
//! # Frame spacing (for beginners)
//!
//! The CH9329 parses its UART input one frame at a time.  Back-to-back frames
//! with no idle time between them are occasionally merged or dropped by the
//! chip, so after each frame the sink keeps the lock for a short gap
//! (default 1 ms) before the next writer may start.

use std::io::Write;
use std::time::Duration;

use ch9329_core::transport::{TransportError, TransportSink};
use parking_lot::Mutex;
use serialport::SerialPort;
use tracing::{debug, info};

pub mod dry_run;

pub use dry_run::DryRunSink;

/// Factory default baud rate of the CH9329.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Write timeout applied to the port.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Idle time after every frame.
pub const DEFAULT_FRAME_GAP: Duration = Duration::from_millis(1);

/// Parameters for opening a [`SerialSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    pub timeout: Duration,
    pub frame_gap: Duration,
}

impl SerialSettings {
    /// Settings for `port` with the adapter's factory defaults.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_WRITE_TIMEOUT,
            frame_gap: DEFAULT_FRAME_GAP,
        }
    }
}

/// A [`TransportSink`] writing to a real serial port.
pub struct SerialSink {
    port: Mutex<Box<dyn SerialPort>>,
    name: String,
    frame_gap: Duration,
}

impl SerialSink {
    /// Opens the port described by `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Open`] if the port does not exist, is busy,
    /// or rejects the requested settings.
    pub fn open(settings: &SerialSettings) -> Result<Self, TransportError> {
        let port = serialport::new(&settings.port, settings.baud_rate)
            .timeout(settings.timeout)
            .open()
            .map_err(|e| TransportError::Open {
                port: settings.port.clone(),
                reason: e.to_string(),
            })?;

        info!(
            "CH9329 serial port opened: {} @ {} baud",
            settings.port, settings.baud_rate
        );

        Ok(Self {
            port: Mutex::new(port),
            name: settings.port.clone(),
            frame_gap: settings.frame_gap,
        })
    }

    /// Name of the open port.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TransportSink for SerialSink {
    fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        let mut port = self.port.lock();
        port.write_all(frame)?;
        port.flush()?;
        debug!(port = %self.name, len = frame.len(), "frame written");
        if !self.frame_gap.is_zero() {
            std::thread::sleep(self.frame_gap);
        }
        Ok(())
    }
}

impl std::fmt::Debug for SerialSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialSink")
            .field("name", &self.name)
            .field("frame_gap", &self.frame_gap)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_use_adapter_defaults() {
        let settings = SerialSettings::new("COM3");

        assert_eq!(settings.port, "COM3");
        assert_eq!(settings.baud_rate, 57_600);
        assert_eq!(settings.timeout, Duration::from_millis(500));
        assert_eq!(settings.frame_gap, Duration::from_millis(1));
    }

    #[test]
    fn test_open_missing_port_reports_open_error() {
        // Arrange
        let settings = SerialSettings::new("/dev/ch9329-test-port-that-does-not-exist");

        // Act
        let result = SerialSink::open(&settings);

        // Assert
        match result {
            Err(TransportError::Open { port, .. }) => {
                assert_eq!(port, "/dev/ch9329-test-port-that-does-not-exist");
            }
            other => panic!("expected Open error, got {other:?}"),
        }
    }
}

//! Transport sink for `--dry-run`: logs every frame instead of sending it.

use std::sync::atomic::{AtomicU64, Ordering};

use ch9329_core::transport::{TransportError, TransportSink};
use tracing::info;

/// Logs each frame as hex at `info` level and counts them.
#[derive(Debug, Default)]
pub struct DryRunSink {
    written: AtomicU64,
}

impl DryRunSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames accepted so far.
    pub fn frames_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }
}

impl TransportSink for DryRunSink {
    fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        let n = self.written.fetch_add(1, Ordering::Relaxed) + 1;
        let decoded = ch9329_core::build_packet(frame, false);
        info!(n, command = ?decoded.command(), "dry-run frame: {decoded}");
        Ok(())
    }
}

//! In-memory transport sink for tests and dry runs.
//!
//! Every frame written is pushed into a `Mutex<Vec<...>>` together with the
//! instant it arrived, so assertions can check both content and spacing.
//!
//! # Usage in tests
//!
//! ```rust
//! use std::sync::Arc;
//! use ch9329_core::{HidEncoder, RecordingSink};
//!
//! let sink = Arc::new(RecordingSink::new());
//! let mut encoder = HidEncoder::new(sink.clone());
//!
//! encoder.key_down(0x04).unwrap();
//!
//! let frames = sink.frames();
//! assert_eq!(frames.len(), 1);
//! assert_eq!(frames[0][7], 0x04);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use super::{TransportError, TransportSink};

/// A sink that records frames instead of writing them anywhere.
#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<(Instant, Vec<u8>)>>,
    should_fail: AtomicBool,
}

impl RecordingSink {
    /// Creates an empty recorder that accepts every write.
    pub fn new() -> Self {
        Self::default()
    }

    /// When `true`, subsequent writes fail with a broken-pipe error and are
    /// not recorded.
    pub fn set_failing(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every recorded frame, oldest first.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.lock().iter().map(|(_, f)| f.clone()).collect()
    }

    /// Arrival instants, parallel to [`frames`](Self::frames).
    pub fn timestamps(&self) -> Vec<Instant> {
        self.lock().iter().map(|(t, _)| *t).collect()
    }

    /// Number of recorded frames.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Discards everything recorded so far.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Instant, Vec<u8>)>> {
        // A panic while holding the lock only happens inside a failing test;
        // the recorded data is still meaningful.
        self.frames.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TransportSink for RecordingSink {
    fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(TransportError::Write(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "recording sink set to fail",
            )));
        }
        self.lock().push((Instant::now(), frame.to_vec()));
        Ok(())
    }
}

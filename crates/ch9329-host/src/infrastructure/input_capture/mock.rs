//! Mock input source for unit testing.
//!
//! Allows tests to inject synthetic [`RawInputEvent`]s without a script file
//! or an OS hook.

use std::sync::mpsc::{self, Sender};

use parking_lot::Mutex;

use super::{CaptureError, InputSource, RawInputEvent};

/// A mock implementation of [`InputSource`] that allows tests to inject events.
#[derive(Default)]
pub struct MockInputSource {
    sender: Mutex<Option<Sender<RawInputEvent>>>,
}

impl MockInputSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Injects a synthetic event, as if captured from hardware.
    ///
    /// Returns `false` if the source is not started or the receiver is gone.
    pub fn inject_event(&self, event: RawInputEvent) -> bool {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Injects several events in order.
    pub fn inject_all(&self, events: impl IntoIterator<Item = RawInputEvent>) -> bool {
        events.into_iter().all(|e| self.inject_event(e))
    }
}

impl InputSource for MockInputSource {
    fn start(&self) -> Result<mpsc::Receiver<RawInputEvent>, CaptureError> {
        let mut sender = self.sender.lock();
        if sender.is_some() {
            return Err(CaptureError::AlreadyStarted);
        }
        let (tx, rx) = mpsc::channel();
        *sender = Some(tx);
        Ok(rx)
    }

    fn stop(&self) {
        // Dropping the sender closes the channel.
        *self.sender.lock() = None;
    }
}

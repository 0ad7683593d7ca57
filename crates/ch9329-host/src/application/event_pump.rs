//! Drains an input channel into the shared [`RemoteSession`].
//!
//! Runs on a blocking thread: every session operation writes to the serial
//! port and may sleep for the encoder's tap or media delays.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::session::{EventOutcome, RemoteSession};
use crate::infrastructure::input_capture::RawInputEvent;

/// How often the pump rechecks the `running` flag while the channel is idle.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Counters reported when the pump stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpStats {
    pub events: u64,
    pub forwarded: u64,
    pub suppressed: u64,
    pub errors: u64,
}

/// Feeds events from `events` to `session` until the channel closes or
/// `running` is cleared.
///
/// Session errors are logged and counted; one failed frame does not stop
/// the pump.
pub fn pump_events(
    events: &Receiver<RawInputEvent>,
    session: &Mutex<RemoteSession>,
    running: &AtomicBool,
) -> PumpStats {
    let mut stats = PumpStats::default();

    while running.load(Ordering::Relaxed) {
        let event = match events.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("input source closed");
                break;
            }
        };

        stats.events += 1;
        match session.lock().handle_event(event) {
            Ok(EventOutcome::Forwarded) => stats.forwarded += 1,
            Ok(EventOutcome::Suppressed) => stats.suppressed += 1,
            Ok(_) => {}
            Err(e) => {
                stats.errors += 1;
                warn!(?event, "failed to forward event: {e}");
            }
        }
    }

    stats
}

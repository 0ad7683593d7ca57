//! Single-slot dispatch of relative mouse moves to a writer thread.
//!
//! Mouse movement arrives far faster than a 57600-baud link can carry it.
//! Queuing every move would make the remote cursor lag further and further
//! behind, so at most one move frame may be in transit at a time: while the
//! slot is occupied, new moves are rejected with [`MoveDispatch::Busy`] and
//! the event source simply samples the accumulated delta again later.
//!
//! The writer thread is spawned lazily on the first dispatched move, so an
//! encoder used purely synchronously never owns a thread.
//!
//! ```text
//! caller thread                    writer thread
//! ─────────────                    ─────────────
//! try_acquire slot ──► frame ──►   sink.write(frame)
//!   (Busy if held)                 report failure (bounded channel)
//!                                  release slot ──► wake wait_idle()
//! ```

use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace, warn};

use crate::protocol::Frame;
use crate::transport::{TransportError, TransportSink};

/// Failures buffered for the caller before further reports are dropped.
const FAILURE_BACKLOG: usize = 16;

/// Outcome of a dispatched move request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDispatch {
    /// The frame was handed to the writer thread.
    Accepted,
    /// A previous move is still in transit; nothing was sent.
    Busy,
}

/// The in-flight indicator.
#[derive(Default)]
struct MoveSlot {
    busy: Mutex<bool>,
    idle: Condvar,
}

impl MoveSlot {
    fn try_acquire(&self) -> bool {
        let mut busy = self.lock();
        if *busy {
            return false;
        }
        *busy = true;
        true
    }

    fn release(&self) {
        *self.lock() = false;
        self.idle.notify_all();
    }

    fn is_busy(&self) -> bool {
        *self.lock()
    }

    fn wait_idle(&self) {
        let mut busy = self.lock();
        while *busy {
            busy = self.idle.wait(busy).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.busy.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Frees the slot when dropped, including during unwinding.
struct SlotRelease<'a>(&'a MoveSlot);

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        self.0.release();
    }
}

struct Worker {
    requests: SyncSender<Frame>,
    handle: JoinHandle<()>,
}

/// Owns the in-flight slot, the writer thread, and the failure channel.
pub(crate) struct MoveDispatcher {
    sink: Arc<dyn TransportSink>,
    slot: Arc<MoveSlot>,
    worker: Option<Worker>,
    failures_tx: SyncSender<TransportError>,
    failures_rx: Receiver<TransportError>,
}

impl MoveDispatcher {
    pub(crate) fn new(sink: Arc<dyn TransportSink>) -> Self {
        let (failures_tx, failures_rx) = mpsc::sync_channel(FAILURE_BACKLOG);
        Self {
            sink,
            slot: Arc::new(MoveSlot::default()),
            worker: None,
            failures_tx,
            failures_rx,
        }
    }

    /// Hands `frame` to the writer thread unless a move is already in flight.
    pub(crate) fn dispatch(&mut self, frame: Frame) -> Result<MoveDispatch, TransportError> {
        if !self.slot.try_acquire() {
            trace!("mouse move suppressed: previous move still in flight");
            return Ok(MoveDispatch::Busy);
        }

        if let Err(e) = self.ensure_worker() {
            self.slot.release();
            return Err(e);
        }

        let sent = match &self.worker {
            Some(worker) => worker.requests.send(frame).is_ok(),
            None => false,
        };
        if !sent {
            // The writer exited (its sink panicked); start afresh next time.
            self.slot.release();
            self.stop_worker();
            return Err(TransportError::Closed);
        }
        Ok(MoveDispatch::Accepted)
    }

    /// Returns `true` while a dispatched move has not finished writing.
    pub(crate) fn in_flight(&self) -> bool {
        self.slot.is_busy()
    }

    /// Blocks until no move is in flight.
    pub(crate) fn wait_idle(&self) {
        self.slot.wait_idle();
    }

    /// Drains write failures reported by the writer thread.
    pub(crate) fn take_failures(&self) -> Vec<TransportError> {
        self.failures_rx.try_iter().collect()
    }

    fn ensure_worker(&mut self) -> Result<(), TransportError> {
        if self.worker.is_some() {
            return Ok(());
        }

        let (requests, rx) = mpsc::sync_channel::<Frame>(1);
        let sink = Arc::clone(&self.sink);
        let slot = Arc::clone(&self.slot);
        let failures = self.failures_tx.clone();

        let handle = thread::Builder::new()
            .name("ch9329-move-writer".to_string())
            .spawn(move || write_loop(rx, sink, slot, failures))?;

        debug!("mouse move writer thread started");
        self.worker = Some(Worker { requests, handle });
        Ok(())
    }

    fn stop_worker(&mut self) {
        if let Some(Worker { requests, handle }) = self.worker.take() {
            drop(requests);
            if handle.join().is_err() {
                warn!("mouse move writer thread panicked");
            }
        }
    }
}

impl Drop for MoveDispatcher {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn write_loop(
    requests: Receiver<Frame>,
    sink: Arc<dyn TransportSink>,
    slot: Arc<MoveSlot>,
    failures: SyncSender<TransportError>,
) {
    for frame in requests {
        let _release = SlotRelease(&slot);
        trace!(frame = %frame, "tx (dispatched)");
        if let Err(e) = sink.write(frame.as_bytes()) {
            warn!("dispatched mouse move failed: {e}");
            if let Err(TrySendError::Full(_)) = failures.try_send(e) {
                debug!("move failure backlog full; report dropped");
            }
        }
    }
    debug!("mouse move writer thread exiting");
}

//! Application layer use cases for the host.
//!
//! Use cases here orchestrate the `ch9329_core` encoder to fulfil an operator
//! goal.  They depend on the [`TransportSink`](ch9329_core::TransportSink)
//! abstraction, never on a concrete serial port, so tests drive them with an
//! in-memory sink.
//!
//! # Sub-modules
//!
//! - **`session`**    – Routes captured input into the encoder while the
//!   remote session is active, and handles the exit gestures.
//!
//! - **`event_pump`** – Drains an input channel into the session on a
//!   blocking thread.
//!
//! - **`keep_awake`** – Periodically taps a harmless key so the target does
//!   not lock or sleep.

pub mod event_pump;
pub mod keep_awake;
pub mod session;

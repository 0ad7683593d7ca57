//! Infrastructure layer for the host.
//!
//! Contains OS-facing adapters: input sources, the serial port sink and
//! file-system storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `ch9329_core`, but MUST NOT be imported by the core crate.

pub mod input_capture;
pub mod serial;
pub mod storage;

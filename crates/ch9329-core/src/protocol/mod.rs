//! CH9329 wire protocol: frame layout, command codes and media payloads.

pub mod frame;
pub mod media;

pub use frame::{build_packet, checksum, command_frame, Command, Frame};
pub use media::{MediaKey, MediaKeyTable};

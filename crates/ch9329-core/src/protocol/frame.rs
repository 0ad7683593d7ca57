//! Frame construction for the CH9329 serial command protocol.
//!
//! Wire format:
//! ```text
//! [0x57][0xAB][addr:1][cmd:1][len:1][payload:len][checksum:1]
//! ```
//! The checksum is the low byte of the sum of every preceding byte, including
//! the sync header and address byte.
//!
//! # Why a checksum over the header too? (for beginners)
//!
//! The CH9329 resynchronises on the `57 AB` sync pair.  Summing the whole
//! frame (not just the payload) means a frame whose header bytes were
//! corrupted in transit is also rejected by the chip rather than being
//! interpreted as a valid command with the wrong address.

use std::fmt;

/// Sync bytes plus the default device address (`0x00` accepts any chip).
pub const FRAME_HEADER: [u8; 3] = [0x57, 0xAB, 0x00];

/// Offset of the command byte inside a frame.
pub const COMMAND_OFFSET: usize = 3;

/// Offset of the length byte inside a frame.
pub const LENGTH_OFFSET: usize = 4;

/// Offset of the first payload byte inside a frame.
pub const PAYLOAD_OFFSET: usize = 5;

/// Release report for the media-key bit field, sent after every media press.
pub const MEDIA_RELEASE_FRAME: [u8; 10] = [0x57, 0xAB, 0x00, 0x03, 0x04, 0x02, 0x00, 0x00, 0x00, 0x0B];

/// Relative-mouse report with no buttons held and no displacement.
pub const MOUSE_RELEASE_FRAME: [u8; 11] =
    [0x57, 0xAB, 0x00, 0x05, 0x05, 0x01, 0x00, 0x00, 0x00, 0x00, 0x0D];

/// Command codes emitted by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Standard 8-byte keyboard report.
    Keyboard = 0x02,
    /// Multimedia keyboard report.
    Media = 0x03,
    /// Relative mouse report.
    MouseRelative = 0x05,
}

impl Command {
    /// Payload length the chip expects for this command.
    pub fn payload_len(self) -> u8 {
        match self {
            Command::Keyboard => 0x08,
            Command::Media => 0x04,
            Command::MouseRelative => 0x05,
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x02 => Ok(Command::Keyboard),
            0x03 => Ok(Command::Media),
            0x05 => Ok(Command::MouseRelative),
            _ => Err(()),
        }
    }
}

/// Returns the low byte of the sum of `bytes`.
///
/// # Examples
///
/// ```rust
/// use ch9329_core::protocol::frame::checksum;
///
/// assert_eq!(checksum(&[0x57, 0xAB, 0x00, 0x03, 0x04, 0x02, 0x00, 0x00, 0x00]), 0x0B);
/// ```
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Assembles `bytes` into a [`Frame`], appending the checksum when requested.
///
/// The input is taken verbatim; callers are responsible for the header,
/// command and length bytes.  Use [`command_frame`] for the common case.
pub fn build_packet(bytes: &[u8], append_checksum: bool) -> Frame {
    let mut out = Vec::with_capacity(bytes.len() + 1);
    out.extend_from_slice(bytes);
    if append_checksum {
        out.push(checksum(bytes));
    }
    Frame { bytes: out }
}

/// Builds a complete, checksummed frame for `command` carrying `payload`.
///
/// `payload` must be exactly [`Command::payload_len`] bytes long.
pub fn command_frame(command: Command, payload: &[u8]) -> Frame {
    debug_assert_eq!(
        payload.len(),
        command.payload_len() as usize,
        "payload length does not match {command:?}"
    );

    let mut raw = Vec::with_capacity(PAYLOAD_OFFSET + payload.len());
    raw.extend_from_slice(&FRAME_HEADER);
    raw.push(command as u8);
    raw.push(payload.len() as u8);
    raw.extend_from_slice(payload);
    build_packet(&raw, true)
}

/// An encoded frame, ready to be written verbatim to the serial link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Wraps pre-computed literal bytes (e.g. [`MEDIA_RELEASE_FRAME`]).
    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Raw frame bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the frame, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Total length including header and checksum.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the frame holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The command byte, if the frame is long enough to carry one.
    pub fn command(&self) -> Option<Command> {
        self.bytes
            .get(COMMAND_OFFSET)
            .and_then(|&b| Command::try_from(b).ok())
    }

    /// Payload bytes as declared by the length byte.
    ///
    /// Returns an empty slice for truncated frames.
    pub fn payload(&self) -> &[u8] {
        let Some(&len) = self.bytes.get(LENGTH_OFFSET) else {
            return &[];
        };
        let end = PAYLOAD_OFFSET + len as usize;
        self.bytes.get(PAYLOAD_OFFSET..end).unwrap_or(&[])
    }

    /// Returns `true` when the last byte equals the checksum of all others.
    pub fn has_valid_checksum(&self) -> bool {
        match self.bytes.split_last() {
            Some((&last, rest)) => checksum(rest) == last,
            None => false,
        }
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

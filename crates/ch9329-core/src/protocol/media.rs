//! Multimedia key payloads for the CH9329 media command (`0x03`).
//!
//! The chip exposes a consumer-control report whose first byte is a report
//! id (`0x02`) and whose second byte is a bit field, one bit per action.
//! Pressing a key sets its bit; the release report clears the field.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::encoder::EncodeError;

/// The closed set of media actions the encoder can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKey {
    Eject,
    Stop,
    PreviousTrack,
    NextTrack,
    PlayPause,
    Mute,
    VolumeDown,
    VolumeUp,
}

impl MediaKey {
    /// Every media action, in bit order from most to least significant.
    pub const ALL: [MediaKey; 8] = [
        MediaKey::Eject,
        MediaKey::Stop,
        MediaKey::PreviousTrack,
        MediaKey::NextTrack,
        MediaKey::PlayPause,
        MediaKey::Mute,
        MediaKey::VolumeDown,
        MediaKey::VolumeUp,
    ];

    /// Lower-case name used in scripts and configuration.
    pub fn name(self) -> &'static str {
        match self {
            MediaKey::Eject => "eject",
            MediaKey::Stop => "stop",
            MediaKey::PreviousTrack => "previous_track",
            MediaKey::NextTrack => "next_track",
            MediaKey::PlayPause => "play_pause",
            MediaKey::Mute => "mute",
            MediaKey::VolumeDown => "volume_down",
            MediaKey::VolumeUp => "volume_up",
        }
    }

    fn payload(self) -> [u8; 4] {
        let bit = match self {
            MediaKey::Eject => 0x80,
            MediaKey::Stop => 0x40,
            MediaKey::PreviousTrack => 0x20,
            MediaKey::NextTrack => 0x10,
            MediaKey::PlayPause => 0x08,
            MediaKey::Mute => 0x04,
            MediaKey::VolumeDown => 0x02,
            MediaKey::VolumeUp => 0x01,
        };
        [0x02, bit, 0x00, 0x00]
    }
}

impl fmt::Display for MediaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MediaKey {
    type Err = EncodeError;

    /// Accepts the snake_case name, ignoring case and `-` vs `_`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        MediaKey::ALL
            .into_iter()
            .find(|k| k.name() == normalized)
            .ok_or_else(|| EncodeError::UnknownMediaKey(s.to_string()))
    }
}

/// Lookup table from [`MediaKey`] to its 4-byte report payload.
///
/// Built once per encoder and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct MediaKeyTable {
    entries: HashMap<MediaKey, [u8; 4]>,
}

impl MediaKeyTable {
    /// Builds the full table covering every [`MediaKey`].
    pub fn new() -> Self {
        Self::with_entries(MediaKey::ALL.into_iter().map(|k| (k, k.payload())))
    }

    /// Builds a table from explicit entries.
    pub fn with_entries(entries: impl IntoIterator<Item = (MediaKey, [u8; 4])>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Returns the payload for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::UnknownMediaKey`] if the table has no entry.
    pub fn lookup(&self, key: MediaKey) -> Result<[u8; 4], EncodeError> {
        self.entries
            .get(&key)
            .copied()
            .ok_or_else(|| EncodeError::UnknownMediaKey(key.to_string()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MediaKeyTable {
    fn default() -> Self {
        Self::new()
    }
}

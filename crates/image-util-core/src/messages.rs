//! Image message types exchanged over the transport

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall-clock timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Time {
    pub sec: i32,
    pub nanosec: u32,
}

impl Time {
    pub fn new(sec: i32, nanosec: u32) -> Self {
        Self { sec, nanosec }
    }

    /// Current wall-clock time. Clocks set before the epoch read as zero.
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from_unix(elapsed)
    }

    /// Seconds past `i32::MAX` saturate
    pub fn from_unix(elapsed: Duration) -> Self {
        Self {
            sec: i32::try_from(elapsed.as_secs()).unwrap_or(i32::MAX),
            nanosec: elapsed.subsec_nanos(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub stamp: Time,
    pub frame_id: String,
}

/// Uncompressed image, laid out row by row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMessage {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub encoding: String,
    pub is_bigendian: u8,
    /// Row length in bytes
    pub step: u32,
    pub data: Vec<u8>,
}

impl ImageMessage {
    /// Bytes of actual pixel data in one row, ignoring any padding in `step`
    pub fn row_bytes(&self) -> Option<usize> {
        let channels = encodings::num_channels(&self.encoding)?;
        let depth = encodings::bit_depth(&self.encoding)?;
        Some(self.width as usize * channels as usize * (depth as usize / 8))
    }
}

/// Pixel encoding names and their layout
pub mod encodings {
    pub const BGR8: &str = "bgr8";
    pub const RGB8: &str = "rgb8";
    pub const BGRA8: &str = "bgra8";
    pub const RGBA8: &str = "rgba8";
    pub const MONO8: &str = "mono8";
    pub const MONO16: &str = "mono16";

    pub fn num_channels(encoding: &str) -> Option<u32> {
        match encoding {
            MONO8 | MONO16 => Some(1),
            BGR8 | RGB8 => Some(3),
            BGRA8 | RGBA8 => Some(4),
            _ => None,
        }
    }

    pub fn bit_depth(encoding: &str) -> Option<u32> {
        match encoding {
            MONO16 => Some(16),
            MONO8 | BGR8 | RGB8 | BGRA8 | RGBA8 => Some(8),
            _ => None,
        }
    }
}

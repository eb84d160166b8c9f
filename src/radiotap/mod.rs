//! Radiotap header decoding
//!
//! Captures taken in monitor mode prefix every 802.11 frame with a radiotap
//! header. Only the fields needed to reach the channel field are understood:
//!
//! 1. **Fixed header** (8 bytes) - version, pad, little-endian length,
//!    little-endian 32-bit present bitmap
//! 2. **TSFT** (8 bytes) - present bit 0
//! 3. **Flags** (1 byte) - present bit 1
//! 4. **Rate** (1 byte) - present bit 2
//! 5. **Channel** - present bit 3, starts with the 16-bit centre frequency
//!
//! Field widths are accumulated in that canonical order with no alignment
//! padding.

mod frequency;

pub use frequency::{FREQUENCIES_24GHZ, channel_to_frequency, frequency_to_channel};

use crate::{ReplayError, Result};
use tracing::trace;

/// The only radiotap header version in use.
pub const RADIOTAP_VERSION: u8 = 0;

/// Size of the fixed part of the header; the first optional field starts here.
pub const RADIOTAP_BASE_LEN: usize = 8;

const LENGTH_OFFSET: usize = 2;
const PRESENT_OFFSET: usize = 4;
const FREQUENCY_WIDTH: usize = 2;

/// Present-bitmap bits understood by the decoder.
pub mod present {
    pub const TSFT: u32 = 1 << 0;
    pub const FLAGS: u32 = 1 << 1;
    pub const RATE: u32 = 1 << 2;
    pub const CHANNEL: u32 = 1 << 3;
}

/// Optional fields preceding the channel field, with their widths in bytes.
const FIELDS_BEFORE_CHANNEL: [(u32, usize); 3] =
    [(present::TSFT, 8), (present::FLAGS, 1), (present::RATE, 1)];

/// Borrowed view over the radiotap header at the start of a frame.
#[derive(Debug, Clone, Copy)]
pub struct RadiotapHeader<'a> {
    bytes: &'a [u8],
    present: u32,
}

impl<'a> RadiotapHeader<'a> {
    /// Validate the fixed header and read the present bitmap.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let version = *bytes
            .first()
            .ok_or(ReplayError::RadiotapTruncated { needed: 1, available: 0 })?;
        if version != RADIOTAP_VERSION {
            return Err(ReplayError::InvalidRadiotapVersion { found: version });
        }

        if bytes.len() < RADIOTAP_BASE_LEN {
            return Err(ReplayError::RadiotapTruncated {
                needed: RADIOTAP_BASE_LEN,
                available: bytes.len(),
            });
        }

        let present = u32::from_le_bytes([
            bytes[PRESENT_OFFSET],
            bytes[PRESENT_OFFSET + 1],
            bytes[PRESENT_OFFSET + 2],
            bytes[PRESENT_OFFSET + 3],
        ]);

        Ok(Self { bytes, present })
    }

    pub fn version(&self) -> u8 {
        self.bytes[0]
    }

    /// Header length as declared by the header itself.
    pub fn length(&self) -> u16 {
        u16::from_le_bytes([self.bytes[LENGTH_OFFSET], self.bytes[LENGTH_OFFSET + 1]])
    }

    pub fn present(&self) -> u32 {
        self.present
    }

    pub fn has(&self, bit: u32) -> bool {
        self.present & bit != 0
    }

    /// Byte offset of the channel field from the start of the frame.
    pub fn channel_offset(&self) -> Result<usize> {
        if !self.has(present::CHANNEL) {
            return Err(ReplayError::ChannelFieldAbsent { present: self.present });
        }

        let skipped: usize = FIELDS_BEFORE_CHANNEL
            .iter()
            .filter(|(bit, _)| self.has(*bit))
            .map(|(_, width)| width)
            .sum();

        Ok(RADIOTAP_BASE_LEN + skipped)
    }

    /// Centre frequency (MHz) stored at the start of the channel field.
    pub fn frequency(&self) -> Result<u16> {
        let offset = self.channel_offset()?;
        let end = offset + FREQUENCY_WIDTH;
        let available = usize::from(self.length()).min(self.bytes.len());
        if end > available {
            return Err(ReplayError::RadiotapTruncated { needed: end, available });
        }

        Ok(u16::from_le_bytes([self.bytes[offset], self.bytes[offset + 1]]))
    }

    /// 2.4 GHz channel number announced by the header.
    pub fn channel(&self) -> Result<u8> {
        let frequency = self.frequency()?;
        let channel = frequency_to_channel(frequency)?;
        trace!("Radiotap present={:#010x} frequency={} channel={}", self.present, frequency, channel);
        Ok(channel)
    }
}

/// Decode the channel number of a captured radiotap frame.
pub fn channel_from_frame(frame: &[u8]) -> Result<u8> {
    RadiotapHeader::parse(frame)?.channel()
}

//! Captured frame type consumed by the replay engine

use super::Timespec;

/// One frame as stored in a capture file.
///
/// The bytes start with the link-layer header of the capture (the radiotap
/// header for 802.11 monitor captures). `data.len()` is the captured length,
/// which may be shorter than the length originally seen on the air.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFrame {
    /// Captured bytes, radiotap header included
    pub data: Vec<u8>,

    /// Wall-clock time of the original capture
    pub timestamp: Timespec,

    /// Length of the frame on the wire when it was captured
    pub original_len: u32,
}

impl CaptureFrame {
    /// Create a frame whose captured length equals its original length.
    pub fn new(data: Vec<u8>, timestamp: Timespec) -> Self {
        let original_len = data.len() as u32;
        Self { data, timestamp, original_len }
    }

    /// Set the on-wire length recorded by the capture.
    pub fn with_original_len(mut self, original_len: u32) -> Self {
        self.original_len = original_len;
        self
    }

    /// Number of bytes actually stored, and therefore injected.
    pub fn captured_len(&self) -> usize {
        self.data.len()
    }

    /// Whether the capture snap length cut this frame short.
    pub fn is_truncated(&self) -> bool {
        (self.data.len() as u64) < u64::from(self.original_len)
    }
}

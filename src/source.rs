//! Capture source trait

use crate::Result;
use crate::types::CaptureFrame;

/// Link-layer type of a capture, as numbered by the pcap format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkType(pub i32);

impl LinkType {
    pub const ETHERNET: LinkType = LinkType(1);
    pub const IEEE802_11: LinkType = LinkType(105);
    pub const IEEE802_11_RADIOTAP: LinkType = LinkType(127);

    /// Whether frames start with a radiotap header.
    pub fn is_radiotap(self) -> bool {
        self == Self::IEEE802_11_RADIOTAP
    }
}

impl std::fmt::Display for LinkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::ETHERNET => write!(f, "EN10MB"),
            Self::IEEE802_11 => write!(f, "IEEE802_11"),
            Self::IEEE802_11_RADIOTAP => write!(f, "IEEE802_11_RADIO"),
            LinkType(other) => write!(f, "linktype {}", other),
        }
    }
}

/// Ordered, finite supply of captured frames.
///
/// The scheduler pulls one frame at a time until the source is exhausted.
/// A source is read once; frames are not retained after they are returned.
#[async_trait::async_trait]
pub trait CaptureSource: Send {
    /// Get the next captured frame
    ///
    /// Returns:
    /// - `Ok(Some(frame))` - next frame in capture order
    /// - `Ok(None)` - capture exhausted
    /// - `Err(e)` - the capture could not be read
    async fn next_frame(&mut self) -> Result<Option<CaptureFrame>>;

    /// Link-layer type shared by every frame of the capture.
    fn link_type(&self) -> LinkType;
}

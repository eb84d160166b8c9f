//! In-memory capture source

use std::collections::VecDeque;

use crate::source::{CaptureSource, LinkType};
use crate::types::CaptureFrame;
use crate::Result;

/// Capture source over frames already held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    frames: VecDeque<CaptureFrame>,
    link_type: LinkType,
}

impl MemorySource {
    /// Radiotap source yielding `frames` in order.
    pub fn new(frames: impl IntoIterator<Item = CaptureFrame>) -> Self {
        Self { frames: frames.into_iter().collect(), link_type: LinkType::IEEE802_11_RADIOTAP }
    }

    pub fn with_link_type(mut self, link_type: LinkType) -> Self {
        self.link_type = link_type;
        self
    }

    /// Frames not yet handed out.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait::async_trait]
impl CaptureSource for MemorySource {
    async fn next_frame(&mut self) -> Result<Option<CaptureFrame>> {
        Ok(self.frames.pop_front())
    }

    fn link_type(&self) -> LinkType {
        self.link_type
    }
}

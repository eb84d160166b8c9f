//! Capture source for legacy pcap files

use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

use crate::source::{CaptureSource, LinkType};
use crate::types::{CaptureFrame, Timespec};
use crate::{ReplayError, Result};

/// Read buffer size; must hold the largest record of the file.
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Reads frames from a classic (non-ng) pcap file, micro- or nanosecond
/// timestamp precision.
pub struct PcapFileSource {
    reader: LegacyPcapReader<File>,
    path: PathBuf,
    link_type: LinkType,
    nanosecond: bool,
    frames_read: u64,
}

impl PcapFileSource {
    /// Open `path` and read its global header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| ReplayError::capture_io(&path, e))?;

        let mut reader = LegacyPcapReader::new(READ_BUFFER_SIZE, file).map_err(|e| {
            ReplayError::capture_error(&path, format!("not a pcap capture: {:?}", e))
        })?;

        let (link_type, nanosecond) = loop {
            match reader.next() {
                Ok((offset, PcapBlockOwned::LegacyHeader(header))) => {
                    let info = (LinkType(header.network.0), header.is_nanosecond_precision());
                    reader.consume(offset);
                    break info;
                }
                Ok(_) => {
                    return Err(ReplayError::capture_error(&path, "missing pcap global header"));
                }
                Err(PcapError::Incomplete(_)) => {
                    reader.refill().map_err(|e| {
                        ReplayError::capture_error(&path, format!("read failed: {:?}", e))
                    })?;
                }
                Err(e) => {
                    return Err(ReplayError::capture_error(&path, format!("bad header: {:?}", e)));
                }
            }
        };

        info!(
            "Opened capture {} ({}, {} timestamps)",
            path.display(),
            link_type,
            if nanosecond { "nanosecond" } else { "microsecond" }
        );

        Ok(Self { reader, path, link_type, nanosecond, frames_read: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Whether sub-second timestamps are stored in nanoseconds.
    pub fn is_nanosecond_precision(&self) -> bool {
        self.nanosecond
    }

    fn read_frame(&mut self) -> Result<Option<CaptureFrame>> {
        loop {
            match self.reader.next() {
                Ok((offset, PcapBlockOwned::Legacy(block))) => {
                    let timestamp = if self.nanosecond {
                        Timespec::from_nanos(i64::from(block.ts_sec), block.ts_usec)
                    } else {
                        Timespec::from_micros(i64::from(block.ts_sec), block.ts_usec)
                    };
                    let captured = (block.caplen as usize).min(block.data.len());
                    let frame = CaptureFrame::new(block.data[..captured].to_vec(), timestamp)
                        .with_original_len(block.origlen);
                    self.reader.consume(offset);

                    self.frames_read += 1;
                    trace!(
                        "Frame {}: {} bytes at {}",
                        self.frames_read,
                        frame.captured_len(),
                        frame.timestamp
                    );
                    return Ok(Some(frame));
                }
                Ok((offset, _)) => {
                    self.reader.consume(offset);
                }
                Err(PcapError::Eof) => {
                    debug!("Capture {} exhausted after {} frames", self.path.display(), self.frames_read);
                    return Ok(None);
                }
                Err(PcapError::Incomplete(_)) => {
                    self.reader.refill().map_err(|e| {
                        ReplayError::capture_error(&self.path, format!("read failed: {:?}", e))
                    })?;
                }
                Err(e) => {
                    return Err(ReplayError::capture_error(
                        &self.path,
                        format!("corrupt record after frame {}: {:?}", self.frames_read, e),
                    ));
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl CaptureSource for PcapFileSource {
    async fn next_frame(&mut self) -> Result<Option<CaptureFrame>> {
        self.read_frame()
    }

    fn link_type(&self) -> LinkType {
        self.link_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{RadiotapFrameBuilder, write_pcap};

    #[tokio::test]
    async fn reads_frames_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.pcap");
        let first = RadiotapFrameBuilder::new().channel(2412).build();
        let second = RadiotapFrameBuilder::new().rate(2).channel(2437).build();
        write_pcap(
            &path,
            LinkType::IEEE802_11_RADIOTAP,
            false,
            &[(Timespec::from_micros(100, 250), first.clone()), (Timespec::from_micros(101, 0), second.clone())],
        );

        let mut source = PcapFileSource::open(&path).unwrap();
        assert!(source.link_type().is_radiotap());
        assert!(!source.is_nanosecond_precision());

        let a = source.next_frame().await.unwrap().unwrap();
        assert_eq!(a.data, first);
        assert_eq!(a.timestamp, Timespec::new(100, 250_000));

        let b = source.next_frame().await.unwrap().unwrap();
        assert_eq!(b.data, second);
        assert_eq!(b.timestamp, Timespec::new(101, 0));

        assert!(source.next_frame().await.unwrap().is_none());
        assert_eq!(source.frames_read(), 2);
    }

    #[tokio::test]
    async fn nanosecond_captures_keep_their_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.pcap");
        write_pcap(
            &path,
            LinkType::IEEE802_11_RADIOTAP,
            true,
            &[(Timespec::from_nanos(7, 123_456_789), vec![0u8; 16])],
        );

        let mut source = PcapFileSource::open(&path).unwrap();
        assert!(source.is_nanosecond_precision());
        let frame = source.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.timestamp, Timespec::new(7, 123_456_789));
    }

    #[test]
    fn missing_file_is_a_capture_error() {
        let result = PcapFileSource::open("/nonexistent/airreplay.pcap");
        assert!(matches!(result, Err(ReplayError::Capture { source: Some(_), .. })));
    }

    #[test]
    fn garbage_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.pcap");
        std::fs::write(&path, b"definitely not a capture file at all").unwrap();

        assert!(matches!(PcapFileSource::open(&path), Err(ReplayError::Capture { .. })));
    }
}

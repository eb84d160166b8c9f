//! Test utilities: frame builders and scripted collaborators
//!
//! Shared by unit tests and benchmarks. Nothing here touches a radio: sinks
//! and spawners are scripted in memory, the clock follows tokio's (pausable)
//! timer, and pcap fixtures are written wherever the caller asks.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use crate::channel::{ProcessExit, ProcessSpawner};
use crate::inject::InjectionSink;
use crate::radiotap::present;
use crate::scheduler::Clock;
use crate::source::LinkType;
use crate::types::{CaptureFrame, Timespec};
use crate::{ReplayError, Result};

/// Minimal 802.11 data frame body appended after the radiotap header.
const DOT11_STUB: [u8; 24] = [
    0x08, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02, 0x00, 0x00, 0x00, 0x00,
    0x01, 0x02, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00,
];

/// Builds radiotap-prefixed frames field by field.
#[derive(Debug, Clone, Default)]
pub struct RadiotapFrameBuilder {
    tsft: Option<u64>,
    flags: Option<u8>,
    rate: Option<u8>,
    frequency: Option<u16>,
    body: Option<Vec<u8>>,
}

impl RadiotapFrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tsft(mut self, value: u64) -> Self {
        self.tsft = Some(value);
        self
    }

    pub fn flags(mut self, value: u8) -> Self {
        self.flags = Some(value);
        self
    }

    pub fn rate(mut self, value: u8) -> Self {
        self.rate = Some(value);
        self
    }

    /// Add a channel field announcing `frequency` MHz.
    pub fn channel(mut self, frequency: u16) -> Self {
        self.frequency = Some(frequency);
        self
    }

    /// Replace the default 802.11 body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bitmap = 0u32;
        let mut fields = Vec::new();

        if let Some(tsft) = self.tsft {
            bitmap |= present::TSFT;
            fields.extend_from_slice(&tsft.to_le_bytes());
        }
        if let Some(flags) = self.flags {
            bitmap |= present::FLAGS;
            fields.push(flags);
        }
        if let Some(rate) = self.rate {
            bitmap |= present::RATE;
            fields.push(rate);
        }
        if let Some(frequency) = self.frequency {
            bitmap |= present::CHANNEL;
            fields.extend_from_slice(&frequency.to_le_bytes());
            // channel flags: 2 GHz spectrum, CCK
            fields.extend_from_slice(&0x00a0u16.to_le_bytes());
        }

        let header_len = (8 + fields.len()) as u16;
        let mut frame = Vec::with_capacity(usize::from(header_len) + DOT11_STUB.len());
        frame.extend_from_slice(&[0, 0]);
        frame.extend_from_slice(&header_len.to_le_bytes());
        frame.extend_from_slice(&bitmap.to_le_bytes());
        frame.extend_from_slice(&fields);
        frame.extend_from_slice(self.body.as_deref().unwrap_or(&DOT11_STUB));
        frame
    }
}

/// Frame of `len` zero bytes captured at `secs`.`micros`.
pub fn frame_at(secs: i64, micros: u32, len: usize) -> CaptureFrame {
    CaptureFrame::new(vec![0u8; len], Timespec::from_micros(secs, micros))
}

/// Radiotap frame on `frequency` captured at `secs`.`micros`.
pub fn radiotap_frame_at(secs: i64, micros: u32, frequency: u16) -> CaptureFrame {
    let data = RadiotapFrameBuilder::new().rate(2).channel(frequency).build();
    CaptureFrame::new(data, Timespec::from_micros(secs, micros))
}

/// One scripted sink response.
#[derive(Debug, Clone)]
pub enum SinkStep {
    /// Accept the whole frame
    Full,
    /// Accept only this many bytes
    Accept(usize),
    /// Fail with this error kind
    Fail(std::io::ErrorKind),
}

/// A frame submission seen by [`ScriptedSink`].
#[derive(Debug, Clone)]
pub struct Submission {
    pub at: Instant,
    pub len: usize,
    pub data: Vec<u8>,
}

#[derive(Debug)]
struct SinkScript {
    steps: VecDeque<SinkStep>,
    fallback: SinkStep,
    submissions: Vec<Submission>,
}

/// [`InjectionSink`] that replays a script of responses and records every
/// submission. Clones share the same script and log.
#[derive(Debug, Clone)]
pub struct ScriptedSink {
    inner: Arc<Mutex<SinkScript>>,
}

impl Default for ScriptedSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSink {
    /// Sink that accepts every frame in full.
    pub fn new() -> Self {
        Self::always(SinkStep::Full)
    }

    /// Sink answering with `steps` first, then full writes.
    pub fn with_steps(steps: impl IntoIterator<Item = SinkStep>) -> Self {
        let sink = Self::new();
        sink.inner.lock().unwrap().steps.extend(steps);
        sink
    }

    /// Sink answering every submission with `step`.
    pub fn always(step: SinkStep) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SinkScript {
                steps: VecDeque::new(),
                fallback: step,
                submissions: Vec::new(),
            })),
        }
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.inner.lock().unwrap().submissions.clone()
    }
}

impl InjectionSink for ScriptedSink {
    fn inject(&mut self, frame: &[u8]) -> std::io::Result<usize> {
        let mut script = self.inner.lock().unwrap();
        script.submissions.push(Submission { at: Instant::now(), len: frame.len(), data: frame.to_vec() });

        let step = script.steps.pop_front().unwrap_or_else(|| script.fallback.clone());
        match step {
            SinkStep::Full => Ok(frame.len()),
            SinkStep::Accept(n) => Ok(n.min(frame.len())),
            SinkStep::Fail(kind) => Err(std::io::Error::new(kind, "scripted sink failure")),
        }
    }
}

#[derive(Debug)]
enum SpawnStep {
    Exit(ProcessExit),
    SpawnFailure,
}

#[derive(Debug, Default)]
struct SpawnScript {
    steps: VecDeque<SpawnStep>,
    calls: Vec<(PathBuf, Vec<String>)>,
    run_time: Duration,
}

/// [`ProcessSpawner`] that records calls and answers from a script; once the
/// script is empty every process exits with status 0.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSpawner {
    inner: Arc<Mutex<SpawnScript>>,
}

impl ScriptedSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every spawned process take `run_time` to finish.
    pub fn with_run_time(self, run_time: Duration) -> Self {
        self.inner.lock().unwrap().run_time = run_time;
        self
    }

    pub fn push_exit(&self, exit: ProcessExit) {
        self.inner.lock().unwrap().steps.push_back(SpawnStep::Exit(exit));
    }

    pub fn push_spawn_failure(&self) {
        self.inner.lock().unwrap().steps.push_back(SpawnStep::SpawnFailure);
    }

    pub fn calls(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.inner.lock().unwrap().calls.clone()
    }
}

#[async_trait::async_trait]
impl ProcessSpawner for ScriptedSpawner {
    async fn spawn(&self, program: &Path, args: &[String]) -> Result<ProcessExit> {
        let (step, run_time) = {
            let mut script = self.inner.lock().unwrap();
            script.calls.push((program.to_path_buf(), args.to_vec()));
            (script.steps.pop_front(), script.run_time)
        };

        match step {
            None => {
                tokio::time::sleep(run_time).await;
                Ok(ProcessExit::from_code(0))
            }
            Some(SpawnStep::Exit(exit)) => {
                tokio::time::sleep(run_time).await;
                Ok(exit)
            }
            Some(SpawnStep::SpawnFailure) => Err(ReplayError::SpawnFailure {
                program: program.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "scripted spawn failure"),
            }),
        }
    }
}

/// Wall clock that advances with tokio's timer, so paused-time tests see
/// consistent wall and monotonic time.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    wall_base: Timespec,
    instant_base: Instant,
}

impl TokioClock {
    pub fn starting_at(wall_base: Timespec) -> Self {
        Self { wall_base, instant_base: Instant::now() }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Timespec {
        let elapsed = Instant::now().saturating_duration_since(self.instant_base);
        self.wall_base + Timespec::from_duration(elapsed)
    }
}

/// Write a little-endian classic pcap file.
pub fn write_pcap(path: &Path, link_type: LinkType, nanosecond: bool, frames: &[(Timespec, Vec<u8>)]) {
    let magic: u32 = if nanosecond { 0xa1b2_3c4d } else { 0xa1b2_c3d4 };
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&magic.to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&4u16.to_le_bytes());
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&65_535u32.to_le_bytes());
    bytes.extend_from_slice(&(link_type.0 as u32).to_le_bytes());

    for (timestamp, data) in frames {
        let fraction =
            if nanosecond { timestamp.subsec_nanos() } else { timestamp.subsec_nanos() / 1_000 };
        bytes.extend_from_slice(&(timestamp.secs() as u32).to_le_bytes());
        bytes.extend_from_slice(&fraction.to_le_bytes());
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(data);
    }

    std::fs::write(path, bytes).expect("failed to write pcap fixture");
}

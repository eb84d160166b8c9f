//! Capture source implementations

pub mod memory;
pub mod pcap;

pub use memory::MemorySource;
pub use pcap::PcapFileSource;

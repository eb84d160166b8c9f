//! Raw `AF_PACKET` transmit path (Linux)

use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use tracing::{debug, info};

use super::InjectionSink;
use crate::{ReplayError, Result};

/// Sends complete link-layer frames (radiotap header included) out of one
/// interface through a `SOCK_RAW` packet socket.
///
/// A full kernel queue (`ENOBUFS`, `EAGAIN`) and interrupted calls are
/// reported as a zero-byte short write so the retrier backs off and resubmits.
#[derive(Debug)]
pub struct PacketSocketSink {
    fd: OwnedFd,
    interface: String,
    index: u32,
}

impl PacketSocketSink {
    /// Open a packet socket bound to `interface`.
    ///
    /// Requires `CAP_NET_RAW`.
    pub fn open(interface: &str) -> Result<Self> {
        let name = CString::new(interface)
            .map_err(|_| ReplayError::interface(interface, "name contains a NUL byte"))?;

        // SAFETY: `name` is a valid NUL-terminated string for the whole call.
        let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
        if index == 0 {
            return Err(ReplayError::interface(interface, io::Error::last_os_error().to_string()));
        }

        let protocol = (libc::ETH_P_ALL as u16).to_be();

        // SAFETY: plain socket(2) call, the result is checked before use.
        let raw = unsafe { libc::socket(libc::AF_PACKET, libc::SOCK_RAW, libc::c_int::from(protocol)) };
        if raw < 0 {
            return Err(ReplayError::injection_io(
                "failed to open packet socket",
                io::Error::last_os_error(),
            ));
        }
        // SAFETY: `raw` is a freshly created descriptor nobody else owns.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        // SAFETY: sockaddr_ll is plain old data; all-zero is a valid value.
        let mut address: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
        address.sll_family = libc::AF_PACKET as libc::c_ushort;
        address.sll_protocol = protocol;
        address.sll_ifindex = index as libc::c_int;

        // SAFETY: `address` outlives the call and the length matches its type.
        let rc = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                (&address as *const libc::sockaddr_ll).cast::<libc::sockaddr>(),
                std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(ReplayError::injection_io(
                format!("failed to bind packet socket to {}", interface),
                io::Error::last_os_error(),
            ));
        }

        info!("Injection socket bound to {} (index {})", interface, index);
        Ok(Self { fd, interface: interface.to_string(), index })
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn interface_index(&self) -> u32 {
        self.index
    }
}

impl InjectionSink for PacketSocketSink {
    fn inject(&mut self, frame: &[u8]) -> io::Result<usize> {
        // SAFETY: the pointer/length pair comes from a live slice.
        let sent = unsafe { libc::send(self.fd.as_raw_fd(), frame.as_ptr().cast(), frame.len(), 0) };
        if sent >= 0 {
            return Ok(sent as usize);
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(code) if code == libc::ENOBUFS || code == libc::EAGAIN || code == libc::EINTR => {
                debug!("Transmit queue of {} busy: {}", self.interface, err);
                Ok(0)
            }
            _ => Err(err),
        }
    }
}

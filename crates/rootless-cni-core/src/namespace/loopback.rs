//! Loopback bring-up inside a freshly created network namespace.

use rootless_cni_common::error::{InfraError, Result};

/// Name of the loopback device.
pub const LOOPBACK_IFNAME: &str = "lo";

/// `struct ifreq` restricted to the flags member of its union.
///
/// Padded to the kernel's full 40-byte `ifreq` so `SIOC[GS]IFFLAGS` never
/// read or write past the end of the buffer.
#[cfg(target_os = "linux")]
#[repr(C)]
struct IfFlagsRequest {
    name: [libc::c_char; libc::IFNAMSIZ],
    flags: libc::c_short,
    _pad: [u8; 22],
}

#[cfg(target_os = "linux")]
impl IfFlagsRequest {
    fn new(ifname: &str) -> Result<Self> {
        let bytes = ifname.as_bytes();
        if bytes.is_empty() || bytes.len() >= libc::IFNAMSIZ {
            return Err(InfraError::Namespace {
                message: format!("invalid interface name: {ifname:?}"),
            });
        }
        let mut name = [0 as libc::c_char; libc::IFNAMSIZ];
        for (dst, src) in name.iter_mut().zip(bytes) {
            *dst = *src as libc::c_char;
        }
        Ok(Self {
            name,
            flags: 0,
            _pad: [0; 22],
        })
    }
}

/// Sets `lo` administratively up in the current network namespace.
///
/// # Errors
///
/// Returns an error if the control socket cannot be opened or either
/// `ioctl(2)` fails.
#[cfg(target_os = "linux")]
pub fn bring_up_loopback() -> Result<()> {
    set_link_up(LOOPBACK_IFNAME)
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: network namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn bring_up_loopback() -> Result<()> {
    Err(InfraError::Namespace {
        message: "Linux required for network namespaces".into(),
    })
}

/// Reports whether `ifname` is administratively up in the current network
/// namespace.
///
/// # Errors
///
/// Returns an error if the control socket cannot be opened or the device
/// does not exist.
#[cfg(target_os = "linux")]
pub fn is_link_up(ifname: &str) -> Result<bool> {
    let sock = control_socket()?;
    let req = read_flags(&sock, ifname)?;
    Ok(req.flags & libc::IFF_UP as libc::c_short != 0)
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: network namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn is_link_up(_ifname: &str) -> Result<bool> {
    Err(InfraError::Namespace {
        message: "Linux required for network namespaces".into(),
    })
}

#[cfg(target_os = "linux")]
fn set_link_up(ifname: &str) -> Result<()> {
    use std::os::fd::AsRawFd;

    let sock = control_socket()?;
    let mut req = read_flags(&sock, ifname)?;
    if req.flags & libc::IFF_UP as libc::c_short != 0 {
        tracing::debug!(ifname, "link already up");
        return Ok(());
    }

    req.flags |= libc::IFF_UP as libc::c_short;

    // SAFETY: `sock` is an open socket for the duration of the call and
    // `req` is a live buffer at least as large as `struct ifreq`; the kernel
    // only reads it for SIOCSIFFLAGS.
    let rc = unsafe { libc::ioctl(sock.as_raw_fd(), libc::SIOCSIFFLAGS as _, &raw const req) };
    if rc < 0 {
        return Err(InfraError::Namespace {
            message: format!(
                "SIOCSIFFLAGS on {ifname} failed: {}",
                std::io::Error::last_os_error()
            ),
        });
    }

    tracing::debug!(ifname, "link set up");
    Ok(())
}

#[cfg(target_os = "linux")]
fn control_socket() -> Result<std::os::fd::OwnedFd> {
    use nix::sys::socket::{AddressFamily, SockFlag, SockType, socket};

    socket(
        AddressFamily::Inet,
        SockType::Datagram,
        SockFlag::SOCK_CLOEXEC,
        None,
    )
    .map_err(|e| InfraError::Namespace {
        message: format!("failed to open control socket: {e}"),
    })
}

#[cfg(target_os = "linux")]
fn read_flags(sock: &std::os::fd::OwnedFd, ifname: &str) -> Result<IfFlagsRequest> {
    use std::os::fd::AsRawFd;

    let mut req = IfFlagsRequest::new(ifname)?;

    // SAFETY: `sock` is an open socket for the duration of the call and
    // `req` is a live, writable buffer at least as large as `struct ifreq`.
    let rc = unsafe { libc::ioctl(sock.as_raw_fd(), libc::SIOCGIFFLAGS as _, &raw mut req) };
    if rc < 0 {
        return Err(InfraError::Namespace {
            message: format!(
                "SIOCGIFFLAGS on {ifname} failed: {}",
                std::io::Error::last_os_error()
            ),
        });
    }
    Ok(req)
}

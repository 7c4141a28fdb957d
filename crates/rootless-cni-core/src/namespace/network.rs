//! Network namespace isolation.
//!
//! Gives the calling thread its own network stack (interfaces, routes,
//! firewall tables), initially containing only a down loopback device.

use rootless_cni_common::error::{InfraError, Result};

/// Moves the calling thread into a new network namespace.
///
/// Children forked from this thread afterwards are born inside the new
/// namespace.
///
/// # Errors
///
/// Returns an error if the `unshare(CLONE_NEWNET)` syscall fails, typically
/// because the caller lacks `CAP_SYS_ADMIN` in its user namespace.
#[cfg(target_os = "linux")]
pub fn unshare_network_namespace() -> Result<()> {
    use nix::sched::{CloneFlags, unshare};

    unshare(CloneFlags::CLONE_NEWNET).map_err(|e| InfraError::Namespace {
        message: format!("network namespace creation failed: {e}"),
    })?;
    tracing::debug!("network namespace created");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: network namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn unshare_network_namespace() -> Result<()> {
    Err(InfraError::Namespace {
        message: "Linux required for network namespaces".into(),
    })
}

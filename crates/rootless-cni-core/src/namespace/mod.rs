//! Network namespace management for rootless CNI.
//!
//! A lease's namespace is never bind-mounted anywhere: it is pinned by a
//! keep-alive process and addressed through that process's
//! `/proc/<pid>/ns/net` entry.

pub mod loopback;
pub mod network;

use std::fs;
use std::path::{Path, PathBuf};

use rootless_cni_common::error::{InfraError, Result};

use crate::process::Spawner;

/// Returns the namespace handle path for a process.
#[must_use]
pub fn netns_path(pid: i32) -> PathBuf {
    PathBuf::from(format!("/proc/{pid}/ns/net"))
}

/// Parses the content of a PID file.
///
/// Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`InfraError::Consistency`] unless the content is a positive
/// decimal integer.
pub fn parse_pid(content: &str) -> Result<i32> {
    match content.trim().parse::<i32>() {
        Ok(pid) if pid > 0 => Ok(pid),
        _ => Err(InfraError::Consistency {
            message: format!("PID file does not contain a valid PID: {content:?}"),
        }),
    }
}

/// Writes `pid` in decimal to `path`, replacing any previous content.
///
/// The PID is written to a sibling temporary file first and renamed into
/// place, so readers never observe an empty or partial PID file.
///
/// # Errors
///
/// Returns an error if the file cannot be written or renamed.
pub fn write_pid_file(path: &Path, pid: u32) -> Result<()> {
    let staging = path.with_extension("tmp");
    fs::write(&staging, pid.to_string()).map_err(|e| InfraError::io(&staging, e))?;
    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(InfraError::io(path, e));
    }
    tracing::debug!(path = %path.display(), pid, "wrote PID file");
    Ok(())
}

/// Sets up a new network namespace and pins it with a keep-alive process.
///
/// Runs inside the `create-netns` sub-command, which must be a fresh,
/// single-threaded process: `unshare(2)` only moves the calling thread, and
/// the keep-alive child inherits the namespace of the thread that forks it.
///
/// Steps, in order: create the PID file's parent directory, unshare the
/// network namespace, spawn the keep-alive sub-command, record the
/// keep-alive's PID (not this process's), bring `lo` up. If anything after
/// the spawn fails, the keep-alive is killed and the PID file removed.
///
/// # Errors
///
/// Returns an error if any step fails.
#[cfg(target_os = "linux")]
pub fn create_network_namespace(pid_file: &Path, spawner: &dyn Spawner) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    if let Some(parent) = pid_file.parent() {
        fs::DirBuilder::new()
            .recursive(true)
            .mode(rootless_cni_common::constants::STATE_DIR_MODE)
            .create(parent)
            .map_err(|e| InfraError::io(parent, e))?;
    }

    network::unshare_network_namespace()?;
    let mut keep_alive = spawn_keep_alive(spawner)?;
    let pid = keep_alive.id();

    if let Err(e) = write_pid_file(pid_file, pid).and_then(|()| loopback::bring_up_loopback()) {
        let _ = fs::remove_file(pid_file);
        if let Err(kill_err) = keep_alive.kill() {
            tracing::warn!(pid, error = %kill_err, "failed to kill keep-alive after setup error");
        }
        let _ = keep_alive.wait();
        return Err(e);
    }

    tracing::info!(pid, pid_file = %pid_file.display(), "network namespace ready");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: network namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn create_network_namespace(_pid_file: &Path, _spawner: &dyn Spawner) -> Result<()> {
    Err(InfraError::Namespace {
        message: "Linux required for network namespaces".into(),
    })
}

/// Starts the keep-alive sub-command detached from the caller's stdio and
/// process group.
#[cfg(target_os = "linux")]
fn spawn_keep_alive(spawner: &dyn Spawner) -> Result<std::process::Child> {
    use std::os::unix::process::CommandExt;
    use std::process::Stdio;

    let mut cmd = spawner.named_command(crate::process::SLEEP_COMMAND, &[]);
    let _ = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0);
    let child = cmd.spawn().map_err(|e| InfraError::Namespace {
        message: format!("failed to spawn keep-alive process: {e}"),
    })?;
    tracing::debug!(pid = child.id(), "spawned keep-alive process");
    Ok(child)
}

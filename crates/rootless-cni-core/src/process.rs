//! Re-execution of the running binary under a named sub-command.
//!
//! The infra binary needs fresh, single-threaded process images to unshare
//! a network namespace and to host the keep-alive process. Both are obtained
//! by executing the binary again with an internal sub-command name as the
//! first argument; the CLI's dispatcher maps those names back to entry
//! points in this crate.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Internal sub-command that unshares a network namespace and records its
/// keep-alive PID. Takes the PID-file path as its only argument.
pub const CREATE_NETNS_COMMAND: &str = "create-netns";

/// Internal sub-command that blocks until signalled.
pub const SLEEP_COMMAND: &str = "sleep";

/// Builds commands that run a named sub-command of a binary.
///
/// The returned [`Command`] is not yet spawned so callers can choose stdio
/// wiring and process attributes.
pub trait Spawner: Send + Sync {
    /// Returns a command that runs sub-command `name` with `args`.
    fn named_command(&self, name: &str, args: &[&OsStr]) -> Command;
}

/// [`Spawner`] that re-executes a fixed binary path.
///
/// Defaults to `/proc/self/exe`, which the kernel resolves to the running
/// binary regardless of `$PATH` or the current namespace's view of `/usr`.
#[derive(Debug, Clone)]
pub struct SelfExec {
    exe: PathBuf,
}

impl SelfExec {
    /// Creates a spawner that executes `exe`.
    #[must_use]
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self { exe: exe.into() }
    }

    /// Returns the binary this spawner executes.
    #[must_use]
    pub fn exe(&self) -> &Path {
        &self.exe
    }
}

impl Default for SelfExec {
    fn default() -> Self {
        Self::new(rootless_cni_common::constants::SELF_EXE_PATH)
    }
}

impl Spawner for SelfExec {
    fn named_command(&self, name: &str, args: &[&OsStr]) -> Command {
        let mut cmd = Command::new(&self.exe);
        let _ = cmd.arg(name).args(args);
        cmd
    }
}

/// Blocks the calling process forever.
///
/// This is the body of the keep-alive process: it exists only so that the
/// network namespace it lives in stays referenced. It terminates when it
/// receives `SIGTERM` (default disposition).
#[cfg(target_os = "linux")]
pub fn keep_alive() -> ! {
    tracing::debug!(pid = std::process::id(), "keep-alive process parked");
    loop {
        nix::unistd::pause();
    }
}

/// Blocks the calling process forever.
#[cfg(not(target_os = "linux"))]
pub fn keep_alive() -> ! {
    loop {
        std::thread::park();
    }
}

//! Infra process launcher.
//!
//! Creates a lease's namespace by running the `create-netns` sub-command in
//! a fresh process and waiting for it. The sub-command itself lives in
//! [`rootless_cni_core::namespace::create_network_namespace`].

use std::path::PathBuf;
use std::process::Stdio;

use rootless_cni_common::error::{InfraError, Result};
use rootless_cni_common::types::LeaseId;
use rootless_cni_core::process::{CREATE_NETNS_COMMAND, Spawner};

use crate::resolver;
use crate::store::LeaseStore;

/// Creates the namespace and keep-alive process for a lease.
pub trait NamespaceLauncher: Send + Sync {
    /// Creates a namespace for `id`, records its keep-alive PID in the
    /// store, and returns the namespace path.
    ///
    /// # Errors
    ///
    /// Returns an error if any setup step fails. No PID file is left
    /// behind in that case.
    fn create_namespace(&self, store: &LeaseStore, id: &LeaseId) -> Result<PathBuf>;
}

/// [`NamespaceLauncher`] that re-executes the running binary.
#[derive(Debug, Clone)]
pub struct ReexecLauncher<S> {
    spawner: S,
}

impl<S: Spawner> ReexecLauncher<S> {
    /// Creates a launcher that starts sub-commands through `spawner`.
    #[must_use]
    pub const fn new(spawner: S) -> Self {
        Self { spawner }
    }
}

impl<S: Spawner> NamespaceLauncher for ReexecLauncher<S> {
    fn create_namespace(&self, store: &LeaseStore, id: &LeaseId) -> Result<PathBuf> {
        let pid_file = store.pid_path(id);
        tracing::info!(id = %id, pid_file = %pid_file.display(), "creating network namespace");

        let output = self
            .spawner
            .named_command(CREATE_NETNS_COMMAND, &[pid_file.as_os_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| InfraError::Namespace {
                message: format!("failed to run {CREATE_NETNS_COMMAND}: {e}"),
            })?;

        if !output.status.success() {
            if let Err(e) = store.remove_pid(id) {
                tracing::warn!(id = %id, error = %e, "failed to remove PID file after setup error");
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InfraError::Namespace {
                message: format!(
                    "{CREATE_NETNS_COMMAND} exited with {}: {}",
                    output.status,
                    stderr.trim()
                ),
            });
        }

        resolver::resolve(store, id)?.ok_or_else(|| InfraError::Consistency {
            message: format!("{CREATE_NETNS_COMMAND} succeeded but wrote no PID file for {id}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;
    use std::process::Command;

    use super::*;

    /// Runs a shell snippet in place of the real sub-command; `$1` is the
    /// sub-command name and `$2` the PID-file path.
    struct ShellSpawner(&'static str);

    impl Spawner for ShellSpawner {
        fn named_command(&self, name: &str, args: &[&OsStr]) -> Command {
            let mut cmd = Command::new("/bin/sh");
            let _ = cmd.arg("-c").arg(self.0).arg("sh").arg(name).args(args);
            cmd
        }
    }

    #[test]
    fn successful_setup_resolves_written_pid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LeaseStore::new(dir.path());
        let id = LeaseId::new("abc").unwrap();
        let launcher =
            ReexecLauncher::new(ShellSpawner(r#"mkdir -p "$(dirname "$2")" && echo 4242 > "$2""#));

        let path = launcher.create_namespace(&store, &id).unwrap();
        assert_eq!(path, PathBuf::from("/proc/4242/ns/net"));
    }

    #[test]
    fn failed_setup_leaves_no_pid_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LeaseStore::new(dir.path());
        let id = LeaseId::new("abc").unwrap();
        let launcher = ReexecLauncher::new(ShellSpawner(
            r#"mkdir -p "$(dirname "$2")" && echo 4242 > "$2"; echo "unshare: EPERM" >&2; exit 1"#,
        ));

        let err = launcher.create_namespace(&store, &id).unwrap_err();
        assert!(err.to_string().contains("unshare: EPERM"));
        assert_eq!(store.read_pid(&id).unwrap(), None);
    }

    #[test]
    fn setup_without_pid_file_is_inconsistent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LeaseStore::new(dir.path());
        let id = LeaseId::new("abc").unwrap();
        let launcher = ReexecLauncher::new(ShellSpawner("true"));

        let err = launcher.create_namespace(&store, &id).unwrap_err();
        assert!(matches!(err, InfraError::Consistency { .. }));
    }

    #[test]
    fn sub_command_receives_pid_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LeaseStore::new(dir.path());
        let id = LeaseId::new("abc").unwrap();
        let launcher = ReexecLauncher::new(ShellSpawner(
            r#"[ "$1" = create-netns ] || exit 3; mkdir -p "$(dirname "$2")" && echo 7 > "$2""#,
        ));

        let _ = launcher.create_namespace(&store, &id).unwrap();
        assert_eq!(store.read_pid(&id).unwrap().as_deref(), Some("7\n"));
    }
}

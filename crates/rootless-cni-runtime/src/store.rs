//! Filesystem state store for leases.
//!
//! Owns the directory layout under the state directory and nothing else:
//! no process or namespace handling happens here. Callers serialize
//! mutations with [`LeaseStore::lock`].

use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};
use rootless_cni_common::constants::{NETWORKS_DIR_NAME, PID_FILE_NAME, STATE_DIR_MODE};
use rootless_cni_common::error::{InfraError, Result};
use rootless_cni_common::types::{LeaseId, NetworkName};

/// Exclusive advisory lock over the whole state directory.
///
/// Released when dropped.
pub struct StateLock {
    _lock: Flock<File>,
}

/// On-disk lease records rooted at a state directory.
#[derive(Debug, Clone)]
pub struct LeaseStore {
    root: PathBuf,
}

impl LeaseStore {
    /// Creates a store rooted at `root`. Nothing is touched on disk.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the state directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory of a lease.
    #[must_use]
    pub fn lease_dir(&self, id: &LeaseId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Returns the keep-alive PID file of a lease.
    #[must_use]
    pub fn pid_path(&self, id: &LeaseId) -> PathBuf {
        self.lease_dir(id).join(PID_FILE_NAME)
    }

    /// Returns the attachment-marker directory of a lease.
    #[must_use]
    pub fn networks_dir(&self, id: &LeaseId) -> PathBuf {
        self.lease_dir(id).join(NETWORKS_DIR_NAME)
    }

    /// Returns the attachment marker for one network of a lease.
    #[must_use]
    pub fn attachment_path(&self, id: &LeaseId, network: &NetworkName) -> PathBuf {
        self.networks_dir(id).join(network.as_str())
    }

    /// Reads the raw content of a lease's PID file.
    ///
    /// Returns `None` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn read_pid(&self, id: &LeaseId) -> Result<Option<String>> {
        let path = self.pid_path(id);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(InfraError::io(path, e)),
        }
    }

    /// Records `pid` as the keep-alive process of a lease, creating the
    /// lease directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn write_pid(&self, id: &LeaseId, pid: u32) -> Result<()> {
        create_dir(&self.lease_dir(id))?;
        rootless_cni_core::namespace::write_pid_file(&self.pid_path(id), pid)
    }

    /// Removes a lease's PID file. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn remove_pid(&self, id: &LeaseId) -> Result<()> {
        remove_file_if_present(&self.pid_path(id))
    }

    /// Creates the empty attachment marker for `network`.
    ///
    /// Returns `true` if the marker was created by this call and `false`
    /// if it already existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker directory or file cannot be created.
    pub fn create_attachment(&self, id: &LeaseId, network: &NetworkName) -> Result<bool> {
        create_dir(&self.networks_dir(id))?;
        let path = self.attachment_path(id, network);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => {
                tracing::debug!(id = %id, network = %network, "attachment marker created");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(InfraError::io(path, e)),
        }
    }

    /// Removes the attachment marker for `network`. A missing marker is
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker exists but cannot be removed.
    pub fn remove_attachment(&self, id: &LeaseId, network: &NetworkName) -> Result<()> {
        remove_file_if_present(&self.attachment_path(id, network))?;
        tracing::debug!(id = %id, network = %network, "attachment marker removed");
        Ok(())
    }

    /// Returns whether a lease has no attachment markers left.
    ///
    /// Reads at most one directory entry. A missing marker directory counts
    /// as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker directory cannot be read.
    pub fn is_lease_empty(&self, id: &LeaseId) -> Result<bool> {
        let dir = self.networks_dir(id);
        match fs::read_dir(&dir) {
            Ok(mut entries) => match entries.next() {
                None => Ok(true),
                Some(Ok(_)) => Ok(false),
                Some(Err(e)) => Err(InfraError::io(dir, e)),
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(InfraError::io(dir, e)),
        }
    }

    /// Recursively removes a lease directory. A missing directory is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be removed.
    pub fn destroy_lease(&self, id: &LeaseId) -> Result<()> {
        let dir = self.lease_dir(id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::debug!(id = %id, "lease directory removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(InfraError::io(dir, e)),
        }
    }

    /// Returns whether the state directory contains no leases.
    ///
    /// A missing state directory counts as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be read.
    pub fn is_empty(&self) -> Result<bool> {
        match fs::read_dir(&self.root) {
            Ok(mut entries) => match entries.next() {
                None => Ok(true),
                Some(Ok(_)) => Ok(false),
                Some(Err(e)) => Err(InfraError::io(&self.root, e)),
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(InfraError::io(&self.root, e)),
        }
    }

    /// Takes the exclusive state-directory lock, creating the directory
    /// first if needed. Blocks until the lock is available.
    ///
    /// The lock is global, not per lease: it covers every lease under the
    /// root, so operations on unrelated leases (plugin chains included) run
    /// one at a time. A per-lease lock file cannot live inside the lease
    /// directory, which teardown removes, nor beside it, where it would
    /// count as a lease for `is_empty`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, opened, or
    /// locked.
    pub fn lock(&self) -> Result<StateLock> {
        create_dir(&self.root)?;
        let dir = File::open(&self.root).map_err(|e| InfraError::io(&self.root, e))?;
        let lock = Flock::lock(dir, FlockArg::LockExclusive)
            .map_err(|(_, errno)| InfraError::io(&self.root, errno.into()))?;
        tracing::debug!(root = %self.root.display(), "state lock acquired");
        Ok(StateLock { _lock: lock })
    }
}

fn create_dir(path: &Path) -> Result<()> {
    DirBuilder::new()
        .recursive(true)
        .mode(STATE_DIR_MODE)
        .create(path)
        .map_err(|e| InfraError::io(path, e))
}

fn remove_file_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(InfraError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> LeaseId {
        LeaseId::new(s).unwrap()
    }

    fn net(s: &str) -> NetworkName {
        NetworkName::new(s).unwrap()
    }

    #[test]
    fn layout_paths() {
        let store = LeaseStore::new("/run/rootless-cni-infra");
        assert_eq!(
            store.pid_path(&id("abc")),
            PathBuf::from("/run/rootless-cni-infra/abc/pid")
        );
        assert_eq!(
            store.attachment_path(&id("abc"), &net("podman")),
            PathBuf::from("/run/rootless-cni-infra/abc/networks/podman")
        );
    }

    #[test]
    fn read_pid_missing_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LeaseStore::new(dir.path());
        assert_eq!(store.read_pid(&id("abc")).unwrap(), None);
    }

    #[test]
    fn write_then_read_pid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LeaseStore::new(dir.path());
        store.write_pid(&id("abc"), 4242).unwrap();
        assert_eq!(store.read_pid(&id("abc")).unwrap().as_deref(), Some("4242"));
    }

    #[test]
    fn attachment_markers_are_zero_length() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LeaseStore::new(dir.path());
        assert!(store.create_attachment(&id("abc"), &net("podman")).unwrap());
        assert!(!store.create_attachment(&id("abc"), &net("podman")).unwrap());

        let meta = fs::metadata(store.attachment_path(&id("abc"), &net("podman"))).unwrap();
        assert_eq!(meta.len(), 0);
    }

    #[test]
    fn lease_emptiness_follows_markers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LeaseStore::new(dir.path());
        assert!(store.is_lease_empty(&id("abc")).unwrap());

        let _ = store.create_attachment(&id("abc"), &net("a")).unwrap();
        let _ = store.create_attachment(&id("abc"), &net("b")).unwrap();
        assert!(!store.is_lease_empty(&id("abc")).unwrap());

        store.remove_attachment(&id("abc"), &net("a")).unwrap();
        assert!(!store.is_lease_empty(&id("abc")).unwrap());
        store.remove_attachment(&id("abc"), &net("b")).unwrap();
        assert!(store.is_lease_empty(&id("abc")).unwrap());
    }

    #[test]
    fn removing_missing_things_is_tolerated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LeaseStore::new(dir.path());
        store.remove_attachment(&id("abc"), &net("a")).unwrap();
        store.remove_pid(&id("abc")).unwrap();
        store.destroy_lease(&id("abc")).unwrap();
    }

    #[test]
    fn destroy_removes_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LeaseStore::new(dir.path());
        store.write_pid(&id("abc"), 1).unwrap();
        let _ = store.create_attachment(&id("abc"), &net("a")).unwrap();
        assert!(!store.is_empty().unwrap());

        store.destroy_lease(&id("abc")).unwrap();
        assert!(!store.lease_dir(&id("abc")).exists());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn missing_root_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LeaseStore::new(dir.path().join("never-created"));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn lock_creates_root_without_adding_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LeaseStore::new(dir.path().join("state"));
        let guard = store.lock().unwrap();
        assert!(store.root().is_dir());
        assert!(store.is_empty().unwrap());
        drop(guard);
        let _again = store.lock().unwrap();
    }
}

//! Lease lifecycle controller: `alloc` and `dealloc`.
//!
//! Per `(lease, network)` pair the controller moves between *absent* and
//! *attached*. The lease itself is born by the first successful `alloc`
//! for its ID and destroyed when its last attachment is removed.
//!
//! Both operations run under the state-directory lock, so concurrent
//! requests for the same lease cannot interleave the "resolve or create"
//! and "detach, then maybe destroy" sections.

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use rootless_cni_common::config::InfraConfig;
use rootless_cni_common::error::InfraError;
use rootless_cni_common::request::RequestConfig;
use rootless_cni_common::types::{LeaseId, NetworkName};
use rootless_cni_core::namespace::parse_pid;
use rootless_cni_core::process::SelfExec;
use rootless_cni_plugin::engine::{CniEngine, NetworkEngine};
use serde_json::Value;

use crate::error::{LeaseError, Result};
use crate::invoker::NetworkInvoker;
use crate::launcher::{NamespaceLauncher, ReexecLauncher};
use crate::resolver;
use crate::store::LeaseStore;

/// Orchestrates namespace creation, network attachment, and teardown.
pub struct LeaseController {
    store: LeaseStore,
    launcher: Box<dyn NamespaceLauncher>,
    invoker: NetworkInvoker,
}

impl LeaseController {
    /// Creates a controller from its collaborators.
    #[must_use]
    pub fn new(
        store: LeaseStore,
        launcher: Box<dyn NamespaceLauncher>,
        engine: Box<dyn NetworkEngine>,
    ) -> Self {
        Self {
            store,
            launcher,
            invoker: NetworkInvoker::new(engine),
        }
    }

    /// Creates the production controller: re-exec launcher and CNI plugin
    /// engine.
    #[must_use]
    pub fn from_config(config: &InfraConfig) -> Self {
        Self::new(
            LeaseStore::new(&config.state_dir),
            Box::new(ReexecLauncher::new(SelfExec::new(&config.self_exe))),
            Box::new(CniEngine::new()),
        )
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &LeaseStore {
        &self.store
    }

    /// Attaches `config.network` to the lease `config.id`, creating the
    /// lease's namespace first if it has none.
    ///
    /// The attachment marker is written before the plugins run, so a crash
    /// mid-attach leaves visible state. On failure the marker (if this call
    /// created it) is removed and, if no other network remains attached,
    /// the whole lease is torn down.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace cannot be created, the marker
    /// cannot be written, or the plugin chain fails.
    pub fn alloc(&self, config: &RequestConfig) -> Result<Value> {
        let id = &config.id;
        let network = &config.network;
        let _lock = self.store.lock()?;

        let resolved = match resolver::resolve(&self.store, id) {
            Err(e @ InfraError::Consistency { .. }) => {
                tracing::warn!(id = %id, error = %e, "discarding unusable PID file");
                self.store.remove_pid(id)?;
                None
            }
            other => other?,
        };

        let netns = match resolved {
            Some(path) => {
                tracing::debug!(id = %id, netns = %path.display(), "reusing lease namespace");
                path
            }
            None => match self.launcher.create_namespace(&self.store, id) {
                Ok(path) => {
                    tracing::info!(id = %id, netns = %path.display(), "lease created");
                    path
                }
                Err(e) => {
                    self.rollback(id, network, false);
                    return Err(e.into());
                }
            },
        };

        let created_marker = match self.store.create_attachment(id, network) {
            Ok(created) => created,
            Err(e) => {
                self.rollback(id, network, false);
                return Err(e.into());
            }
        };

        match self.invoker.attach(&netns, config) {
            Ok(result) => {
                tracing::info!(id = %id, network = %network, "network attached");
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(id = %id, network = %network, error = %e, "attach failed, rolling back");
                self.rollback(id, network, created_marker);
                Err(e)
            }
        }
    }

    /// Detaches `config.network` from the lease `config.id`, destroying the
    /// lease once no network remains attached.
    ///
    /// A lease without a PID file is treated as already torn down and the
    /// call succeeds without touching the filesystem. A PID file that does
    /// not hold a valid PID leaves no namespace to run the plugins in: the
    /// plugin chain is skipped and the marker and lease are cleaned up as
    /// usual. If the plugin chain fails, the marker stays in place so the
    /// call can be retried.
    ///
    /// # Errors
    ///
    /// Returns an error if the plugin chain fails, the marker or lease
    /// directory cannot be removed, or the keep-alive process could not be
    /// signalled during final teardown.
    pub fn dealloc(&self, config: &RequestConfig) -> Result<()> {
        let id = &config.id;
        let network = &config.network;

        if !self.store.lease_dir(id).exists() {
            tracing::debug!(id = %id, "no lease, nothing to deallocate");
            return Ok(());
        }
        let _lock = self.store.lock()?;

        match resolver::resolve(&self.store, id) {
            Ok(Some(netns)) => {
                self.invoker.detach(&netns, config)?;
                tracing::info!(id = %id, network = %network, "network detached");
            }
            Ok(None) => {
                tracing::debug!(id = %id, "lease has no PID file, nothing to deallocate");
                return Ok(());
            }
            Err(e @ InfraError::Consistency { .. }) => {
                tracing::warn!(
                    id = %id,
                    network = %network,
                    error = %e,
                    "namespace unresolvable, skipping plugin teardown"
                );
            }
            Err(e) => return Err(e.into()),
        }
        self.store.remove_attachment(id, network)?;

        if !self.store.is_lease_empty(id)? {
            tracing::debug!(id = %id, "other networks still attached, keeping lease");
            return Ok(());
        }
        self.destroy(id)
    }

    /// Stops the keep-alive process and removes the lease directory.
    ///
    /// The directory is removed even if signalling fails. A removal failure
    /// takes priority over a signalling failure.
    fn destroy(&self, id: &LeaseId) -> Result<()> {
        let stopped = self.stop_keep_alive(id);
        if let Err(e) = self.store.destroy_lease(id) {
            if let Err(signal_err) = &stopped {
                tracing::warn!(id = %id, error = %signal_err, "keep-alive was not stopped");
            }
            return Err(e.into());
        }
        tracing::info!(id = %id, "lease destroyed");
        stopped.map_err(|source| LeaseError::Teardown {
            id: id.clone(),
            source,
        })
    }

    /// Sends `SIGTERM` to the lease's keep-alive process.
    ///
    /// A missing PID file or an already-exited process is not an error.
    fn stop_keep_alive(&self, id: &LeaseId) -> std::result::Result<(), InfraError> {
        let Some(content) = self.store.read_pid(id)? else {
            tracing::debug!(id = %id, "lease has no PID file, no keep-alive to stop");
            return Ok(());
        };
        let pid = parse_pid(&content)?;
        match kill(Pid::from_raw(pid), Signal::SIGTERM) {
            Ok(()) => {
                tracing::debug!(id = %id, pid, "keep-alive signalled");
                Ok(())
            }
            Err(Errno::ESRCH) => {
                tracing::debug!(id = %id, pid, "keep-alive already gone");
                Ok(())
            }
            Err(errno) => Err(InfraError::Consistency {
                message: format!("failed to signal keep-alive process {pid}: {errno}"),
            }),
        }
    }

    /// Undoes a failed `alloc` as far as it is safe to.
    ///
    /// Cleanup errors are logged, never returned, so they cannot mask the
    /// error that triggered the rollback.
    fn rollback(&self, id: &LeaseId, network: &NetworkName, created_marker: bool) {
        if created_marker {
            if let Err(e) = self.store.remove_attachment(id, network) {
                tracing::warn!(id = %id, network = %network, error = %e, "rollback: marker not removed");
            }
        }
        match self.store.is_lease_empty(id) {
            Ok(true) => {
                if let Err(e) = self.destroy(id) {
                    tracing::warn!(id = %id, error = %e, "rollback: lease not fully destroyed");
                }
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(id = %id, error = %e, "rollback: cannot inspect lease"),
        }
    }
}

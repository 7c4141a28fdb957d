//! Read-only status queries: `is-idle` and `print-netns-path`.

use std::path::PathBuf;

use rootless_cni_common::error::{InfraError, Result};
use rootless_cni_common::types::LeaseId;
use serde::Serialize;

use crate::resolver;
use crate::store::LeaseStore;

/// Response body of `is-idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdleStatus {
    /// Whether no lease exists on this host.
    pub idle: bool,
}

/// Response body of `print-netns-path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetnsPathStatus {
    /// Namespace handle of the lease.
    pub path: PathBuf,
}

/// Reports whether there are zero leases, i.e. whether the state directory
/// is empty or absent.
///
/// # Errors
///
/// Returns an error if the state directory exists but cannot be read.
pub fn is_idle(store: &LeaseStore) -> Result<IdleStatus> {
    let idle = store.is_empty()?;
    tracing::debug!(idle, "idle check");
    Ok(IdleStatus { idle })
}

/// Resolves the current namespace path of a lease.
///
/// # Errors
///
/// Returns [`InfraError::NotFound`] if the lease has no PID file, or an
/// error if the PID file is unreadable or malformed.
pub fn netns_path(store: &LeaseStore, id: &LeaseId) -> Result<NetnsPathStatus> {
    let path = resolver::resolve(store, id)?.ok_or_else(|| InfraError::NotFound {
        kind: "lease",
        id: id.to_string(),
    })?;
    Ok(NetnsPathStatus { path })
}

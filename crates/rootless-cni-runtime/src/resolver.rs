//! Namespace handle resolution.
//!
//! The PID file is trusted: the resolver does not check that the process
//! is alive or that `/proc/<pid>/ns/net` is still the namespace this lease
//! created. A recycled PID therefore resolves to the wrong namespace.

use std::path::PathBuf;

use rootless_cni_common::error::Result;
use rootless_cni_common::types::LeaseId;
use rootless_cni_core::namespace::{netns_path, parse_pid};

use crate::store::LeaseStore;

/// Resolves the namespace path of a lease.
///
/// Returns `None` when the lease has no PID file, which callers read as
/// "no namespace yet".
///
/// # Errors
///
/// Returns an error if the PID file cannot be read or does not contain a
/// valid PID.
pub fn resolve(store: &LeaseStore, id: &LeaseId) -> Result<Option<PathBuf>> {
    let Some(content) = store.read_pid(id)? else {
        return Ok(None);
    };
    let pid = parse_pid(&content)?;
    Ok(Some(netns_path(pid)))
}

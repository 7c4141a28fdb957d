//! Errors raised by the lease lifecycle.

use rootless_cni_common::error::InfraError;
use rootless_cni_common::types::{LeaseId, NetworkName};
use rootless_cni_plugin::error::CniError;
use thiserror::Error;

/// Lease lifecycle error.
#[derive(Debug, Error)]
pub enum LeaseError {
    /// Filesystem, namespace, or consistency failure.
    #[error(transparent)]
    Infra(#[from] InfraError),

    /// Attaching a network inside the namespace failed.
    #[error("failed to configure network {network}")]
    Attach {
        /// Network being attached.
        network: NetworkName,
        /// Engine failure.
        #[source]
        source: CniError,
    },

    /// Detaching a network from the namespace failed.
    #[error("failed to tear down network {network}")]
    Detach {
        /// Network being detached.
        network: NetworkName,
        /// Engine failure.
        #[source]
        source: CniError,
    },

    /// The lease directory was removed but its keep-alive process could not
    /// be signalled.
    #[error("lease {id} removed, but its keep-alive process was not stopped")]
    Teardown {
        /// Lease that was torn down.
        id: LeaseId,
        /// Why signalling failed.
        #[source]
        source: InfraError,
    },
}

/// Convenience alias for lifecycle results.
pub type Result<T> = std::result::Result<T, LeaseError>;

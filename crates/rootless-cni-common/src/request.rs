//! The per-invocation request body accepted by `alloc` and `dealloc`.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{LeaseId, NetworkName};

/// Request read from standard input for `alloc` and `dealloc`.
///
/// Field names follow the wire format used by the container tooling that
/// drives this binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Lease to operate on (the container ID).
    #[serde(rename = "ID")]
    pub id: LeaseId,
    /// Network to attach or detach.
    #[serde(rename = "Network")]
    pub network: NetworkName,
    /// Pod name handed to plugins as `K8S_POD_NAME`.
    #[serde(rename = "CNIPodName", default)]
    pub pod_name: String,
    /// Static IP address request.
    #[serde(rename = "IP", default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Static MAC address request.
    #[serde(rename = "MAC", default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    /// DNS aliases keyed by network name.
    #[serde(rename = "Aliases", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, Vec<String>>,
    /// Interface name to create inside the namespace.
    #[serde(rename = "InterfaceName")]
    pub interface_name: String,
    /// Directories searched for plugin binaries.
    #[serde(rename = "PluginPaths", default)]
    pub plugin_paths: Vec<PathBuf>,
    /// Directory containing network configuration files.
    #[serde(rename = "NetConfPath")]
    pub net_conf_path: PathBuf,
}

impl RequestConfig {
    /// Decodes a request from a reader.
    ///
    /// Empty `IP` and `MAC` strings are normalized to `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON, is missing a
    /// required field, or carries an invalid identifier.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut config: Self = serde_json::from_reader(reader)?;
        config.ip = config.ip.filter(|ip| !ip.is_empty());
        config.mac = config.mac.filter(|mac| !mac.is_empty());
        Ok(config)
    }
}

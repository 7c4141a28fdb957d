//! Network configuration invoker.
//!
//! Translates a [`RequestConfig`] into a CNI runtime context and runs the
//! requested network's plugin chain through a [`NetworkEngine`].

use std::path::Path;

use rootless_cni_common::request::RequestConfig;
use rootless_cni_plugin::conf::load_network_list;
use rootless_cni_plugin::engine::NetworkEngine;
use rootless_cni_plugin::error::CniError;
use rootless_cni_plugin::runtime::RuntimeConf;
use serde_json::Value;

use crate::error::{LeaseError, Result};

/// Capability key under which DNS aliases are delivered to plugins.
pub const ALIASES_CAPABILITY: &str = "aliases";

/// Runs attach and detach requests against a network engine.
pub struct NetworkInvoker {
    engine: Box<dyn NetworkEngine>,
}

impl NetworkInvoker {
    /// Creates an invoker backed by `engine`.
    #[must_use]
    pub fn new(engine: Box<dyn NetworkEngine>) -> Self {
        Self { engine }
    }

    /// Attaches `config.network` inside the namespace at `netns` and
    /// returns the plugin chain's result.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::Attach`] if the configuration cannot be loaded
    /// or any plugin fails.
    pub fn attach(&self, netns: &Path, config: &RequestConfig) -> Result<Value> {
        let attach_error = |source| LeaseError::Attach {
            network: config.network.clone(),
            source,
        };
        let list = load_network_list(&config.net_conf_path, config.network.as_str())
            .map_err(attach_error)?;
        let rt = runtime_conf(netns, config).map_err(attach_error)?;
        self.engine
            .add_network_list(&list, &rt, &config.plugin_paths)
            .map_err(attach_error)
    }

    /// Detaches `config.network` from the namespace at `netns`.
    ///
    /// # Errors
    ///
    /// Returns [`LeaseError::Detach`] if the configuration cannot be loaded
    /// or any plugin fails.
    pub fn detach(&self, netns: &Path, config: &RequestConfig) -> Result<()> {
        let detach_error = |source| LeaseError::Detach {
            network: config.network.clone(),
            source,
        };
        let list = load_network_list(&config.net_conf_path, config.network.as_str())
            .map_err(detach_error)?;
        let rt = runtime_conf(netns, config).map_err(detach_error)?;
        self.engine
            .del_network_list(&list, &rt, &config.plugin_paths)
            .map_err(detach_error)
    }
}

/// Builds the CNI runtime context for a request.
///
/// `CNI_ARGS` always carries `IgnoreUnknown=1` and `K8S_POD_NAME`, followed
/// by `IP` and `MAC` when requested. Aliases, if any, go out as the
/// `aliases` capability.
///
/// # Errors
///
/// Returns an error if the aliases cannot be encoded.
pub fn runtime_conf(netns: &Path, config: &RequestConfig) -> std::result::Result<RuntimeConf, CniError> {
    let mut args = vec![
        ("IgnoreUnknown".to_owned(), "1".to_owned()),
        ("K8S_POD_NAME".to_owned(), config.pod_name.clone()),
    ];
    if let Some(ip) = &config.ip {
        args.push(("IP".to_owned(), ip.clone()));
    }
    if let Some(mac) = &config.mac {
        args.push(("MAC".to_owned(), mac.clone()));
    }

    let mut rt = RuntimeConf {
        container_id: config.id.to_string(),
        netns: netns.to_path_buf(),
        if_name: config.interface_name.clone(),
        args,
        ..RuntimeConf::default()
    };
    if !config.aliases.is_empty() {
        let _ = rt.capability_args.insert(
            ALIASES_CAPABILITY.to_owned(),
            serde_json::to_value(&config.aliases)?,
        );
    }
    Ok(rt)
}

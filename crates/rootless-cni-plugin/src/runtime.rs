//! Per-invocation runtime context handed to every plugin in a chain.

use std::path::PathBuf;

use serde_json::{Map, Value};

/// Runtime context for one `ADD` or `DEL` of a network list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeConf {
    /// Container identifier (`CNI_CONTAINERID`).
    pub container_id: String,
    /// Network namespace handle (`CNI_NETNS`).
    pub netns: PathBuf,
    /// Interface to create or remove (`CNI_IFNAME`).
    pub if_name: String,
    /// Ordered `CNI_ARGS` key/value pairs.
    pub args: Vec<(String, String)>,
    /// Capability arguments, delivered to plugins that declare the
    /// matching capability.
    pub capability_args: Map<String, Value>,
}

impl RuntimeConf {
    /// Renders [`RuntimeConf::args`] as a `CNI_ARGS` value (`K=V;K=V`).
    #[must_use]
    pub fn cni_args(&self) -> String {
        self.args
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Returns the `runtimeConfig` object for a plugin with the given
    /// capabilities.
    #[must_use]
    pub fn runtime_config_for<'a>(
        &self,
        capabilities: impl IntoIterator<Item = (&'a String, &'a bool)>,
    ) -> Map<String, Value> {
        capabilities
            .into_iter()
            .filter(|(_, enabled)| **enabled)
            .filter_map(|(cap, _)| {
                self.capability_args
                    .get(cap)
                    .map(|value| (cap.clone(), value.clone()))
            })
            .collect()
    }
}

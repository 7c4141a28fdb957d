//! Plugin-chain execution behind the [`NetworkEngine`] seam.

use std::path::PathBuf;

use serde_json::Value;

use crate::conf::{NetworkConfigList, PluginConf};
use crate::error::{CniError, Result};
use crate::exec::{CniCommand, PluginExec};
use crate::runtime::RuntimeConf;

/// Applies and removes network configuration lists inside a namespace.
///
/// The production implementation is [`CniEngine`]; tests substitute fakes.
pub trait NetworkEngine: Send + Sync {
    /// Runs `ADD` through every plugin of `list` and returns the final
    /// plugin's result.
    ///
    /// # Errors
    ///
    /// Returns the first plugin failure.
    fn add_network_list(
        &self,
        list: &NetworkConfigList,
        rt: &RuntimeConf,
        plugin_paths: &[PathBuf],
    ) -> Result<Value>;

    /// Runs `DEL` through every plugin of `list`, last plugin first.
    ///
    /// # Errors
    ///
    /// Returns the first plugin failure.
    fn del_network_list(
        &self,
        list: &NetworkConfigList,
        rt: &RuntimeConf,
        plugin_paths: &[PathBuf],
    ) -> Result<()>;
}

/// [`NetworkEngine`] that executes CNI plugin binaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct CniEngine;

impl CniEngine {
    /// Creates the engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl NetworkEngine for CniEngine {
    fn add_network_list(
        &self,
        list: &NetworkConfigList,
        rt: &RuntimeConf,
        plugin_paths: &[PathBuf],
    ) -> Result<Value> {
        let exec = PluginExec::new(plugin_paths);
        let mut prev_result: Option<Value> = None;
        for plugin in &list.plugins {
            let conf = plugin_stdin(list, plugin, rt, prev_result.as_ref())?;
            let stdout = exec.run(&plugin.plugin_type, CniCommand::Add, rt, &conf)?;
            let result = serde_json::from_slice(&stdout).map_err(|source| {
                CniError::InvalidResult {
                    plugin: plugin.plugin_type.clone(),
                    source,
                }
            })?;
            prev_result = Some(result);
        }
        tracing::info!(network = %list.name, container = %rt.container_id, "network list added");
        Ok(prev_result.unwrap_or(Value::Null))
    }

    fn del_network_list(
        &self,
        list: &NetworkConfigList,
        rt: &RuntimeConf,
        plugin_paths: &[PathBuf],
    ) -> Result<()> {
        let exec = PluginExec::new(plugin_paths);
        for plugin in list.plugins.iter().rev() {
            let conf = plugin_stdin(list, plugin, rt, None)?;
            let _ = exec.run(&plugin.plugin_type, CniCommand::Del, rt, &conf)?;
        }
        tracing::info!(network = %list.name, container = %rt.container_id, "network list deleted");
        Ok(())
    }
}

/// Builds the configuration a plugin receives on stdin.
///
/// The on-disk object is augmented with the list's `name` and
/// `cniVersion`, the previous plugin's result, and the capability
/// arguments the plugin asked for.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn plugin_stdin(
    list: &NetworkConfigList,
    plugin: &PluginConf,
    rt: &RuntimeConf,
    prev_result: Option<&Value>,
) -> Result<Vec<u8>> {
    let mut conf = plugin.raw.clone();
    let _ = conf.insert("name".into(), Value::String(list.name.clone()));
    let _ = conf.insert("cniVersion".into(), Value::String(list.cni_version.clone()));
    if let Some(prev) = prev_result {
        let _ = conf.insert("prevResult".into(), prev.clone());
    }
    let runtime_config = rt.runtime_config_for(&plugin.capabilities);
    if !runtime_config.is_empty() {
        let _ = conf.insert("runtimeConfig".into(), Value::Object(runtime_config));
    }
    Ok(serde_json::to_vec(&Value::Object(conf))?)
}

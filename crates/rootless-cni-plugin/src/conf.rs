//! Network configuration lookup.
//!
//! Follows `libcni`'s rules: `.conflist` files are searched first, then
//! single-plugin `.conf`/`.json` files, each group in lexical order. A
//! single-plugin file is promoted to a one-element list.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{CniError, Result};

const LIST_EXTENSIONS: &[&str] = &["conflist"];
const SINGLE_EXTENSIONS: &[&str] = &["conf", "json"];

/// One plugin entry of a network configuration list.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginConf {
    /// Plugin binary name (the `type` field).
    pub plugin_type: String,
    /// Capabilities the plugin accepts through `runtimeConfig`.
    pub capabilities: BTreeMap<String, bool>,
    /// The plugin's configuration object as written on disk.
    pub raw: Map<String, Value>,
}

impl PluginConf {
    /// Builds a plugin entry from its JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an object or has no string
    /// `type` field.
    pub fn from_value(value: Value, path: &Path) -> Result<Self> {
        let Value::Object(raw) = value else {
            return Err(invalid(path, "plugin configuration is not an object"));
        };
        let plugin_type = raw
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| invalid(path, "plugin configuration has no type"))?
            .to_owned();
        let capabilities = match raw.get("capabilities") {
            Some(caps) => serde_json::from_value(caps.clone())
                .map_err(|e| invalid(path, &format!("invalid capabilities: {e}")))?,
            None => BTreeMap::new(),
        };
        Ok(Self {
            plugin_type,
            capabilities,
            raw,
        })
    }
}

/// A named chain of plugins.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfigList {
    /// Network name.
    pub name: String,
    /// CNI specification version the configuration is written against.
    pub cni_version: String,
    /// Plugins in `ADD` order.
    pub plugins: Vec<PluginConf>,
    /// File the list was loaded from.
    pub source: PathBuf,
}

impl NetworkConfigList {
    /// Parses a `.conflist` document.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing or the plugin list
    /// is empty.
    pub fn from_list_value(value: &Value, path: &Path) -> Result<Self> {
        let name = string_field(value, "name", path)?;
        let cni_version = value
            .get("cniVersion")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let plugins = value
            .get("plugins")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid(path, "configuration list has no plugins array"))?
            .iter()
            .map(|p| PluginConf::from_value(p.clone(), path))
            .collect::<Result<Vec<_>>>()?;
        if plugins.is_empty() {
            return Err(invalid(path, "configuration list has no plugins"));
        }
        Ok(Self {
            name,
            cni_version,
            plugins,
            source: path.to_path_buf(),
        })
    }

    /// Promotes a single-plugin `.conf` document to a list.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing.
    pub fn from_single_value(value: Value, path: &Path) -> Result<Self> {
        let name = string_field(&value, "name", path)?;
        let cni_version = value
            .get("cniVersion")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        let plugin = PluginConf::from_value(value, path)?;
        Ok(Self {
            name,
            cni_version,
            plugins: vec![plugin],
            source: path.to_path_buf(),
        })
    }
}

/// Finds the configuration list named `network` in `dir`.
///
/// # Errors
///
/// Returns an error if the directory cannot be read, a candidate file is
/// malformed, or no file defines `network`.
pub fn load_network_list(dir: &Path, network: &str) -> Result<NetworkConfigList> {
    for path in config_files(dir, LIST_EXTENSIONS)? {
        let value = read_json(&path)?;
        if value.get("name").and_then(Value::as_str) == Some(network) {
            tracing::debug!(network, path = %path.display(), "loaded network configuration list");
            return NetworkConfigList::from_list_value(&value, &path);
        }
    }
    for path in config_files(dir, SINGLE_EXTENSIONS)? {
        let value = read_json(&path)?;
        if value.get("name").and_then(Value::as_str) == Some(network) {
            tracing::debug!(network, path = %path.display(), "loaded single network configuration");
            return NetworkConfigList::from_single_value(value, &path);
        }
    }
    Err(CniError::NetworkNotFound {
        network: network.to_owned(),
        dir: dir.to_path_buf(),
    })
}

/// Lists regular files in `dir` with one of `extensions`, sorted by path.
fn config_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| CniError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CniError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.contains(&ext));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_json(path: &Path) -> Result<Value> {
    let bytes = fs::read(path).map_err(|e| CniError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_slice(&bytes).map_err(|e| invalid(path, &e.to_string()))
}

fn string_field(value: &Value, field: &str, path: &Path) -> Result<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| invalid(path, &format!("missing {field}")))
}

fn invalid(path: &Path, message: &str) -> CniError {
    CniError::InvalidConfig {
        path: path.to_path_buf(),
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PODMAN_LIST: &str = r#"{
        "cniVersion": "0.4.0",
        "name": "podman",
        "plugins": [
            {"type": "bridge", "bridge": "cni-podman0", "ipam": {"type": "host-local"}},
            {"type": "portmap", "capabilities": {"portMappings": true}},
            {"type": "dnsname", "domainName": "dns.podman", "capabilities": {"aliases": true}}
        ]
    }"#;

    #[test]
    fn finds_list_by_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("87-podman.conflist"), PODMAN_LIST).expect("write");

        let list = load_network_list(dir.path(), "podman").expect("load");
        assert_eq!(list.name, "podman");
        assert_eq!(list.cni_version, "0.4.0");
        assert_eq!(list.plugins.len(), 3);
        assert_eq!(list.plugins[0].plugin_type, "bridge");
        assert_eq!(list.plugins[2].capabilities.get("aliases"), Some(&true));
        assert!(list.source.ends_with("87-podman.conflist"));
    }

    #[test]
    fn promotes_single_conf() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("10-lo.conf"),
            r#"{"cniVersion":"1.0.0","name":"lo","type":"loopback"}"#,
        )
        .expect("write");

        let list = load_network_list(dir.path(), "lo").expect("load");
        assert_eq!(list.plugins.len(), 1);
        assert_eq!(list.plugins[0].plugin_type, "loopback");
        assert_eq!(list.cni_version, "1.0.0");
    }

    #[test]
    fn conflist_wins_over_conf_with_same_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("00-podman.conf"),
            r#"{"cniVersion":"0.3.1","name":"podman","type":"macvlan"}"#,
        )
        .expect("write");
        fs::write(dir.path().join("99-podman.conflist"), PODMAN_LIST).expect("write");

        let list = load_network_list(dir.path(), "podman").expect("load");
        assert_eq!(list.plugins[0].plugin_type, "bridge");
    }

    #[test]
    fn ignores_other_extensions() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("podman.conflist.bak"), PODMAN_LIST).expect("write");

        let err = load_network_list(dir.path(), "podman").unwrap_err();
        assert!(matches!(err, CniError::NetworkNotFound { .. }));
    }

    #[test]
    fn rejects_list_without_plugins() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(
            dir.path().join("empty.conflist"),
            r#"{"cniVersion":"1.0.0","name":"empty","plugins":[]}"#,
        )
        .expect("write");

        let err = load_network_list(dir.path(), "empty").unwrap_err();
        assert!(matches!(err, CniError::InvalidConfig { .. }));
    }

    #[test]
    fn missing_directory_is_io_error() {
        let err = load_network_list(Path::new("/nonexistent/net.d"), "podman").unwrap_err();
        assert!(matches!(err, CniError::Io { .. }));
    }
}

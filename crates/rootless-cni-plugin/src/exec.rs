//! Execution of a single plugin binary.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;

use crate::error::{CniError, Result};
use crate::runtime::RuntimeConf;

/// CNI verb passed in `CNI_COMMAND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CniCommand {
    /// Attach the container to the network.
    Add,
    /// Detach the container from the network.
    Del,
}

impl CniCommand {
    /// Returns the `CNI_COMMAND` value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Del => "DEL",
        }
    }
}

/// Error object a plugin prints on stdout when it fails.
#[derive(Debug, Deserialize)]
struct PluginErrorBody {
    code: u32,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    details: String,
}

/// Locates plugin binaries and runs them with the CNI environment.
#[derive(Debug, Clone)]
pub struct PluginExec {
    search_paths: Vec<PathBuf>,
}

impl PluginExec {
    /// Creates an executor searching `search_paths` in order.
    #[must_use]
    pub fn new(search_paths: &[PathBuf]) -> Self {
        Self {
            search_paths: search_paths.to_vec(),
        }
    }

    /// Returns the `CNI_PATH` value for the search paths.
    #[must_use]
    pub fn cni_path(&self) -> OsString {
        std::env::join_paths(&self.search_paths).unwrap_or_default()
    }

    /// Resolves a plugin `type` to a binary path.
    ///
    /// # Errors
    ///
    /// Returns [`CniError::PluginNotFound`] if no search path contains an
    /// executable with that name.
    pub fn find(&self, plugin_type: &str) -> Result<PathBuf> {
        let not_found = |source| CniError::PluginNotFound {
            plugin: plugin_type.to_owned(),
            source,
        };
        if plugin_type.contains('/') {
            return Err(not_found(which::Error::CannotFindBinaryPath));
        }
        which::which_in(plugin_type, Some(self.cni_path()), "/").map_err(not_found)
    }

    /// Runs one plugin and returns its standard output.
    ///
    /// # Errors
    ///
    /// Returns an error if the plugin cannot be found or started, or exits
    /// unsuccessfully.
    pub fn run(
        &self,
        plugin_type: &str,
        command: CniCommand,
        rt: &RuntimeConf,
        stdin_conf: &[u8],
    ) -> Result<Vec<u8>> {
        let binary = self.find(plugin_type)?;
        tracing::debug!(
            plugin = plugin_type,
            command = command.as_str(),
            binary = %binary.display(),
            "invoking plugin"
        );

        let mut child = Command::new(&binary)
            .env("CNI_COMMAND", command.as_str())
            .env("CNI_CONTAINERID", &rt.container_id)
            .env("CNI_NETNS", &rt.netns)
            .env("CNI_IFNAME", &rt.if_name)
            .env("CNI_ARGS", rt.cni_args())
            .env("CNI_PATH", self.cni_path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&binary, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(stdin_conf) {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    return Err(spawn_error(&binary, e));
                }
                _ => {}
            }
        }
        let output = child
            .wait_with_output()
            .map_err(|e| spawn_error(&binary, e))?;

        if output.status.success() {
            return Ok(output.stdout);
        }
        if let Ok(body) = serde_json::from_slice::<PluginErrorBody>(&output.stdout) {
            return Err(CniError::Plugin {
                plugin: plugin_type.to_owned(),
                code: body.code,
                msg: body.msg,
                details: body.details,
            });
        }
        Err(CniError::Failed {
            plugin: plugin_type.to_owned(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}

fn spawn_error(binary: &Path, source: std::io::Error) -> CniError {
    CniError::Spawn {
        plugin: binary.to_path_buf(),
        source,
    }
}

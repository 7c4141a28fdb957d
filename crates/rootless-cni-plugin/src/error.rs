//! Error type for configuration loading and plugin execution.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors raised by the network configuration engine.
#[derive(Debug, Error)]
pub enum CniError {
    /// Reading a configuration file or directory failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration file is malformed.
    #[error("invalid network configuration {path}: {message}")]
    InvalidConfig {
        /// Offending file.
        path: PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// No configuration in the directory carries the requested name.
    #[error("no net configuration with name {network:?} in {dir}")]
    NetworkNotFound {
        /// Requested network name.
        network: String,
        /// Directory that was searched.
        dir: PathBuf,
    },

    /// The plugin binary is not present in any search path.
    #[error("failed to find plugin {plugin:?} in path: {source}")]
    PluginNotFound {
        /// Plugin type from the configuration.
        plugin: String,
        /// Lookup failure.
        source: which::Error,
    },

    /// The plugin process could not be started or waited on.
    #[error("failed to run plugin {plugin}: {source}")]
    Spawn {
        /// Plugin binary.
        plugin: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The plugin reported a structured CNI error.
    #[error("plugin {plugin} failed (code {code}): {msg}{}", details_suffix(.details))]
    Plugin {
        /// Plugin type.
        plugin: String,
        /// CNI error code.
        code: u32,
        /// Short error message.
        msg: String,
        /// Optional longer explanation.
        details: String,
    },

    /// The plugin exited unsuccessfully without a decodable error object.
    #[error("plugin {plugin} exited with {status}: {stderr}")]
    Failed {
        /// Plugin type.
        plugin: String,
        /// Exit status of the plugin process.
        status: ExitStatus,
        /// Captured standard error.
        stderr: String,
    },

    /// The plugin succeeded but its result is not valid JSON.
    #[error("plugin {plugin} returned an invalid result: {source}")]
    InvalidResult {
        /// Plugin type.
        plugin: String,
        /// Decoding failure.
        source: serde_json::Error,
    },

    /// Serialization of a plugin's stdin configuration failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

fn details_suffix(details: &str) -> String {
    if details.is_empty() {
        String::new()
    } else {
        format!("; {details}")
    }
}

/// Convenience alias for engine results.
pub type Result<T> = std::result::Result<T, CniError>;

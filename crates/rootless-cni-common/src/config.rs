//! Process-wide configuration for the infra binary.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the infra runtime.
///
/// The CLI always runs with [`InfraConfig::default`]; the fields exist so
/// that library users and tests can point the runtime at a scratch tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraConfig {
    /// Base directory holding one subdirectory per lease.
    pub state_dir: PathBuf,
    /// Path used to re-execute the running binary for internal sub-commands.
    pub self_exe: PathBuf,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(crate::constants::DEFAULT_STATE_DIR),
            self_exe: PathBuf::from(crate::constants::SELF_EXE_PATH),
        }
    }
}

impl InfraConfig {
    /// Creates a configuration rooted at a custom state directory.
    #[must_use]
    pub fn with_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_run_directory() {
        let config = InfraConfig::default();
        assert_eq!(config.state_dir, PathBuf::from("/run/rootless-cni-infra"));
        assert_eq!(config.self_exe, PathBuf::from("/proc/self/exe"));
    }

    #[test]
    fn with_state_dir_keeps_self_exe() {
        let config = InfraConfig::with_state_dir("/tmp/leases");
        assert_eq!(config.state_dir, PathBuf::from("/tmp/leases"));
        assert_eq!(config.self_exe, PathBuf::from("/proc/self/exe"));
    }
}

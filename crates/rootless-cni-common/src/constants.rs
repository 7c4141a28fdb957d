//! System-wide constants and fixed paths.

/// Base directory holding one subdirectory per lease.
///
/// Lives under `/run` so that leases never survive a host reboot.
pub const DEFAULT_STATE_DIR: &str = "/run/rootless-cni-infra";

/// Name of the file inside a lease directory recording the keep-alive PID.
pub const PID_FILE_NAME: &str = "pid";

/// Name of the directory inside a lease directory holding attachment markers.
pub const NETWORKS_DIR_NAME: &str = "networks";

/// Path through which the running binary re-executes itself.
///
/// Resolved by the kernel, so it does not depend on `$PATH`.
pub const SELF_EXE_PATH: &str = "/proc/self/exe";

/// Permission bits for directories created under the state directory.
pub const STATE_DIR_MODE: u32 = 0o700;

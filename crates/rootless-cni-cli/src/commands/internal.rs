//! Hidden sub-commands the binary re-executes itself with.

use std::path::PathBuf;

use clap::Args;
use rootless_cni_common::config::InfraConfig;
use rootless_cni_core::namespace;
use rootless_cni_core::process::{self, SelfExec};

/// Arguments for the internal `create-netns` command.
#[derive(Args, Debug)]
pub struct CreateNetnsArgs {
    /// Where to record the keep-alive process's PID.
    pub pid_file: PathBuf,
}

/// Creates a network namespace pinned by a keep-alive process.
///
/// # Errors
///
/// Returns an error if any setup step fails.
pub fn create_netns(args: CreateNetnsArgs) -> anyhow::Result<()> {
    let spawner = SelfExec::new(InfraConfig::default().self_exe);
    namespace::create_network_namespace(&args.pid_file, &spawner)?;
    Ok(())
}

/// Parks the process until it is signalled.
pub fn sleep() -> anyhow::Result<()> {
    process::keep_alive()
}

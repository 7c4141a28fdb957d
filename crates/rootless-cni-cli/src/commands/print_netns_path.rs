//! `rootless-cni-infra print-netns-path`: show a lease's namespace path.

use clap::Args;
use rootless_cni_common::config::InfraConfig;
use rootless_cni_common::types::LeaseId;
use rootless_cni_runtime::status;
use rootless_cni_runtime::store::LeaseStore;

/// Arguments for the `print-netns-path` command.
#[derive(Args, Debug)]
pub struct PrintNetnsPathArgs {
    /// Lease (container) ID.
    pub id: String,
}

/// Executes the `print-netns-path` command, printing `{"path": string}`.
///
/// # Errors
///
/// Returns an error if the ID is invalid or the lease has no PID file.
pub fn execute(args: PrintNetnsPathArgs) -> anyhow::Result<()> {
    let id = LeaseId::new(args.id)?;
    let store = LeaseStore::new(InfraConfig::default().state_dir);
    crate::output::print_json(&status::netns_path(&store, &id)?)
}

//! `rootless-cni-infra is-idle`: report whether any lease exists.

use clap::Args;
use rootless_cni_common::config::InfraConfig;
use rootless_cni_runtime::status;
use rootless_cni_runtime::store::LeaseStore;

/// Arguments for the `is-idle` command.
#[derive(Args, Debug)]
pub struct IsIdleArgs {}

/// Executes the `is-idle` command, printing `{"idle": bool}`.
///
/// # Errors
///
/// Returns an error if the state directory cannot be read.
pub fn execute(_args: IsIdleArgs) -> anyhow::Result<()> {
    let store = LeaseStore::new(InfraConfig::default().state_dir);
    crate::output::print_json(&status::is_idle(&store)?)
}

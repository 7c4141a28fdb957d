//! `rootless-cni-infra alloc`: attach a network, creating the namespace on
//! first use.

use clap::Args;
use rootless_cni_common::config::InfraConfig;
use rootless_cni_runtime::controller::LeaseController;

/// Arguments for the `alloc` command. The request itself arrives on stdin.
#[derive(Args, Debug)]
pub struct AllocArgs {}

/// Executes the `alloc` command.
///
/// Prints the plugin chain's result verbatim.
///
/// # Errors
///
/// Returns an error if the request is unreadable or the attach fails.
pub fn execute(_args: AllocArgs) -> anyhow::Result<()> {
    let request = super::read_request()?;
    tracing::info!(id = %request.id, network = %request.network, "alloc");

    let controller = LeaseController::from_config(&InfraConfig::default());
    let result = controller.alloc(&request)?;
    crate::output::print_json(&result)
}

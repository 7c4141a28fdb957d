//! `rootless-cni-infra dealloc`: detach a network, destroying the namespace
//! after its last network.

use clap::Args;
use rootless_cni_common::config::InfraConfig;
use rootless_cni_runtime::controller::LeaseController;

/// Arguments for the `dealloc` command. The request itself arrives on stdin.
#[derive(Args, Debug)]
pub struct DeallocArgs {}

/// Executes the `dealloc` command.
///
/// # Errors
///
/// Returns an error if the request is unreadable or the detach fails.
pub fn execute(_args: DeallocArgs) -> anyhow::Result<()> {
    let request = super::read_request()?;
    tracing::info!(id = %request.id, network = %request.network, "dealloc");

    let controller = LeaseController::from_config(&InfraConfig::default());
    controller.dealloc(&request)?;
    crate::output::print_json(&serde_json::json!({}))
}

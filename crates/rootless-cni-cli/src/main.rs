//! # rootless-cni-infra
//!
//! Network-namespace lease helper for rootless container networking.
//! Reads a JSON request on stdin for `alloc`/`dealloc` and writes a JSON
//! response on stdout. Logs go to stderr, filtered by `RUST_LOG`.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;
mod output;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    commands::execute(cli)
}

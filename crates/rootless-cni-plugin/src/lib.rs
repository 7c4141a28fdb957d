//! # rootless-cni-plugin
//!
//! The network configuration engine: a small subset of `libcni`.
//!
//! - **Configuration**: locating a named network configuration list in a
//!   `net.d`-style directory.
//! - **Runtime context**: container ID, namespace path, interface name,
//!   `CNI_ARGS` pairs, and capability arguments.
//! - **Execution**: running the plugin chain for `ADD` and `DEL` through the
//!   [`engine::NetworkEngine`] seam.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod conf;
pub mod engine;
pub mod error;
pub mod exec;
pub mod runtime;

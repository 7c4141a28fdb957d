//! Namespace-lease lifecycle management for rootless CNI.
//!
//! A lease is one network namespace held open on behalf of one container
//! ID. Its whole state lives under the state directory:
//!
//! ```text
//! <state_dir>/<lease-id>/pid              keep-alive PID
//! <state_dir>/<lease-id>/networks/<name>  one empty marker per attached network
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod controller;
pub mod error;
pub mod invoker;
pub mod launcher;
pub mod resolver;
pub mod status;
pub mod store;

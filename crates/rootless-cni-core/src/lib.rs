//! # rootless-cni-core
//!
//! Low-level Linux primitives behind the infra process.
//!
//! This crate provides safe abstractions over:
//! - **Network namespaces**: `unshare(CLONE_NEWNET)` and `/proc/<pid>/ns/net`
//!   handles.
//! - **Loopback**: bringing `lo` administratively up inside a fresh namespace.
//! - **Re-execution**: launching named sub-commands of the running binary,
//!   including the keep-alive process that pins a namespace.
//!
//! All unsafe system calls are encapsulated in safe wrappers with
//! `// SAFETY:` documentation.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod namespace;
pub mod process;

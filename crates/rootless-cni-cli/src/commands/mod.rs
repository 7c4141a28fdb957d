//! CLI command definitions and dispatch.
//!
//! The [`Command`] enum is the complete sub-command registry, including
//! the hidden ones the binary re-executes itself with.

pub mod alloc;
pub mod dealloc;
pub mod internal;
pub mod is_idle;
pub mod print_netns_path;

use std::io::{self, Read};
use std::os::fd::AsFd;

use anyhow::Context;
use clap::{Parser, Subcommand};
use nix::sys::stat::{SFlag, fstat};
use rootless_cni_common::error::InfraError;
use rootless_cni_common::request::RequestConfig;

/// rootless-cni-infra: network namespaces and CNI attachment for
/// unprivileged containers.
#[derive(Parser, Debug)]
#[command(name = "rootless-cni-infra", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available sub-commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Attach a network to a container's namespace (request on stdin).
    Alloc(alloc::AllocArgs),
    /// Detach a network from a container's namespace (request on stdin).
    Dealloc(dealloc::DeallocArgs),
    /// Report whether no namespace leases exist.
    IsIdle(is_idle::IsIdleArgs),
    /// Print the namespace path of a lease.
    PrintNetnsPath(print_netns_path::PrintNetnsPathArgs),
    /// Block until signalled (keep-alive process).
    #[command(hide = true)]
    Sleep,
    /// Create a network namespace and record its keep-alive PID.
    #[command(hide = true)]
    CreateNetns(internal::CreateNetnsArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Alloc(args) => alloc::execute(args),
        Command::Dealloc(args) => dealloc::execute(args),
        Command::IsIdle(args) => is_idle::execute(args),
        Command::PrintNetnsPath(args) => print_netns_path::execute(args),
        Command::Sleep => internal::sleep(),
        Command::CreateNetns(args) => internal::create_netns(args),
    }
}

/// Reads the request body from stdin.
///
/// # Errors
///
/// Returns an error if stdin is not a pipe, carries no body, or the body
/// cannot be decoded.
pub fn read_request() -> anyhow::Result<RequestConfig> {
    let stdin = io::stdin();
    if !is_pipe(&stdin).context("failed to inspect stdin")? {
        return Err(no_request().into());
    }
    let mut body = String::new();
    let _ = stdin
        .lock()
        .read_to_string(&mut body)
        .context("failed to read request from stdin")?;
    parse_request(&body)
}

/// Decodes a request body, rejecting an empty one.
fn parse_request(body: &str) -> anyhow::Result<RequestConfig> {
    if body.trim().is_empty() {
        return Err(no_request().into());
    }
    RequestConfig::from_reader(body.as_bytes()).context("failed to decode request")
}

/// Reports whether `fd` is a FIFO or a socket.
fn is_pipe(fd: impl AsFd) -> nix::Result<bool> {
    let stat = fstat(fd)?;
    let kind = SFlag::from_bits_truncate(stat.st_mode) & SFlag::S_IFMT;
    Ok(kind == SFlag::S_IFIFO || kind == SFlag::S_IFSOCK)
}

fn no_request() -> InfraError {
    InfraError::InvalidRequest {
        message: "no request on stdin".into(),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use rootless_cni_core::process::{CREATE_NETNS_COMMAND, SLEEP_COMMAND};

    use super::*;

    #[test]
    fn pipes_are_accepted_as_request_source() {
        let (reader, _writer) = nix::unistd::pipe().unwrap();
        assert!(is_pipe(&reader).unwrap());
    }

    #[test]
    fn character_devices_are_not_request_sources() {
        let null = std::fs::File::open("/dev/null").unwrap();
        assert!(!is_pipe(&null).unwrap());
    }

    #[test]
    fn empty_body_is_reported_as_missing_request() {
        for body in ["", "  \n"] {
            let err = parse_request(body).unwrap_err();
            assert_eq!(err.to_string(), "invalid request: no request on stdin");
        }
    }

    #[test]
    fn body_is_decoded_into_request() {
        let req = parse_request(
            r#"{"ID":"c0ffee","Network":"podman","InterfaceName":"eth0","PluginPaths":[],"NetConfPath":"/etc/cni/net.d"}"#,
        )
        .unwrap();
        assert_eq!(req.id.as_str(), "c0ffee");
        assert_eq!(req.network.as_str(), "podman");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn registry_contains_reexec_targets() {
        let cmd = Cli::command();
        assert!(cmd.find_subcommand(SLEEP_COMMAND).is_some());
        assert!(cmd.find_subcommand(CREATE_NETNS_COMMAND).is_some());
    }

    #[test]
    fn public_subcommand_names() {
        let cmd = Cli::command();
        for name in ["alloc", "dealloc", "is-idle", "print-netns-path"] {
            assert!(cmd.find_subcommand(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn print_netns_path_takes_lease_id() {
        let cli = Cli::try_parse_from(["rootless-cni-infra", "print-netns-path", "c0ffee"]).unwrap();
        match cli.command {
            Command::PrintNetnsPath(args) => assert_eq!(args.id, "c0ffee"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn print_netns_path_requires_lease_id() {
        assert!(Cli::try_parse_from(["rootless-cni-infra", "print-netns-path"]).is_err());
    }

    #[test]
    fn create_netns_takes_pid_file() {
        let cli = Cli::try_parse_from([
            "rootless-cni-infra",
            "create-netns",
            "/run/rootless-cni-infra/c0ffee/pid",
        ])
        .unwrap();
        match cli.command {
            Command::CreateNetns(args) => {
                assert_eq!(
                    args.pid_file,
                    std::path::PathBuf::from("/run/rootless-cni-infra/c0ffee/pid")
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn hidden_commands_stay_out_of_help() {
        let help = Cli::command().render_help().to_string();
        assert!(help.contains("is-idle"));
        assert!(!help.contains("create-netns"));
    }
}

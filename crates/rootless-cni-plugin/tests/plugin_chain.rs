//! Runs real plugin chains made of `/bin/sh` scripts.
//!
//! Kept to a single test function: writing an executable and then running
//! it while other test threads fork can fail with `ETXTBSY`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use rootless_cni_plugin::conf::load_network_list;
use rootless_cni_plugin::engine::{CniEngine, NetworkEngine};
use rootless_cni_plugin::error::CniError;
use rootless_cni_plugin::runtime::RuntimeConf;
use serde_json::json;

fn install_plugin(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write plugin");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod plugin");
}

fn runtime() -> RuntimeConf {
    let mut rt = RuntimeConf {
        container_id: "c0ffee".into(),
        netns: PathBuf::from("/proc/4242/ns/net"),
        if_name: "eth0".into(),
        args: vec![
            ("IgnoreUnknown".into(), "1".into()),
            ("K8S_POD_NAME".into(), "web".into()),
        ],
        ..RuntimeConf::default()
    };
    let _ = rt
        .capability_args
        .insert("aliases".into(), json!({"testnet": ["web", "www"]}));
    rt
}

#[test]
fn plugin_chain_add_del_and_failure() {
    let bin = tempfile::tempdir().expect("bin dir");
    let confdir = tempfile::tempdir().expect("conf dir");
    let work = tempfile::tempdir().expect("work dir");
    let log = work.path().join("calls.log");
    let dns_stdin = work.path().join("dns.stdin");

    install_plugin(
        bin.path(),
        "fake-bridge",
        &format!(
            r#"cat > /dev/null
echo "$CNI_COMMAND fake-bridge $CNI_CONTAINERID $CNI_NETNS $CNI_IFNAME $CNI_ARGS" >> "{log}"
if [ "$CNI_COMMAND" = "ADD" ]; then
  printf '{{"cniVersion":"1.0.0","interfaces":[{{"name":"%s"}}],"ips":[{{"address":"10.88.0.5/16"}}]}}' "$CNI_IFNAME"
fi"#,
            log = log.display()
        ),
    );
    install_plugin(
        bin.path(),
        "fake-dns",
        &format!(
            r#"cat > "{stdin}"
echo "$CNI_COMMAND fake-dns" >> "{log}"
if [ "$CNI_COMMAND" = "ADD" ]; then
  printf '{{"cniVersion":"1.0.0","ips":[{{"address":"10.88.0.5/16"}}],"dns":{{"nameservers":["10.88.0.1"]}}}}'
fi"#,
            stdin = dns_stdin.display(),
            log = log.display()
        ),
    );
    install_plugin(
        bin.path(),
        "fake-broken",
        r#"cat > /dev/null
printf '{"cniVersion":"1.0.0","code":11,"msg":"no addresses left","details":"range 10.89.0.0/24"}'
exit 1"#,
    );

    fs::write(
        confdir.path().join("10-testnet.conflist"),
        json!({
            "cniVersion": "1.0.0",
            "name": "testnet",
            "plugins": [
                {"type": "fake-bridge"},
                {"type": "fake-dns", "capabilities": {"aliases": true}}
            ]
        })
        .to_string(),
    )
    .expect("write conflist");
    fs::write(
        confdir.path().join("20-broken.conflist"),
        json!({
            "cniVersion": "1.0.0",
            "name": "broken",
            "plugins": [{"type": "fake-broken"}]
        })
        .to_string(),
    )
    .expect("write conflist");

    let engine = CniEngine::new();
    let rt = runtime();
    let paths = vec![bin.path().to_path_buf()];

    // ADD runs the chain in order and returns the last result.
    let list = load_network_list(confdir.path(), "testnet").expect("load testnet");
    let result = engine
        .add_network_list(&list, &rt, &paths)
        .expect("add succeeds");
    assert_eq!(result["dns"]["nameservers"][0], "10.88.0.1");

    let calls = fs::read_to_string(&log).expect("read log");
    let lines: Vec<&str> = calls.lines().collect();
    assert_eq!(
        lines,
        [
            "ADD fake-bridge c0ffee /proc/4242/ns/net eth0 IgnoreUnknown=1;K8S_POD_NAME=web",
            "ADD fake-dns",
        ]
    );

    // The second plugin saw the first plugin's result and its capability.
    let stdin: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&dns_stdin).expect("read stdin")).expect("json");
    assert_eq!(stdin["name"], "testnet");
    assert_eq!(stdin["prevResult"]["interfaces"][0]["name"], "eth0");
    assert_eq!(stdin["runtimeConfig"]["aliases"]["testnet"][1], "www");

    // DEL runs last plugin first and has no prevResult.
    fs::remove_file(&log).expect("reset log");
    engine
        .del_network_list(&list, &rt, &paths)
        .expect("del succeeds");
    let calls = fs::read_to_string(&log).expect("read log");
    let order: Vec<&str> = calls
        .lines()
        .map(|l| l.split_whitespace().nth(1).unwrap_or_default())
        .collect();
    assert_eq!(order, ["fake-dns", "fake-bridge"]);
    let stdin: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&dns_stdin).expect("read stdin")).expect("json");
    assert!(stdin.get("prevResult").is_none());

    // A plugin error object is surfaced with its code and message.
    let broken = load_network_list(confdir.path(), "broken").expect("load broken");
    let err = engine
        .add_network_list(&broken, &rt, &paths)
        .expect_err("add fails");
    match err {
        CniError::Plugin { code, msg, details, .. } => {
            assert_eq!(code, 11);
            assert_eq!(msg, "no addresses left");
            assert_eq!(details, "range 10.89.0.0/24");
        }
        other => panic!("unexpected error: {other}"),
    }

    // A plugin missing from the search path fails before anything runs.
    let err = engine
        .add_network_list(&list, &rt, &[work.path().to_path_buf()])
        .expect_err("plugins not found");
    assert!(matches!(err, CniError::PluginNotFound { .. }));
}

//! `cec-client` adapter against a scripted stand-in process

#![cfg(unix)]

mod support;

use std::os::unix::fs::PermissionsExt;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;

use cec_bridge::{BridgeConfig, CecBridge, PowerStatus};
use support::SCAN_OUTPUT;

/// Shell script that prints the scan for `-s`, otherwise acts as a session
/// whose first traffic line is not valid UTF-8
fn write_fake_client(dir: &TempDir) -> String {
    let script = format!(
        r#"#!/bin/sh
if [ "$1" = "-s" ]; then
cat <<'SCAN'
{}
SCAN
exit 0
fi
echo "CEC client registered"
echo "waiting for input"
printf 'TRAFFIC: [ 1]\t>> 04:47:\377\376\n'
while read -r line; do
  case "$line" in
    "pow 0") echo "power status: on" ;;
    q) exit 0 ;;
  esac
done
"#,
        SCAN_OUTPUT
    );

    let path = dir.path().join("cec-client");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_invalid_utf8_output_does_not_stall_session() {
    let dir = TempDir::new().unwrap();
    let mut config = BridgeConfig::default();
    config.adapter.program = write_fake_client(&dir);
    config.timing.query_timeout_ms = 300;

    let bridge = timeout(Duration::from_secs(5), CecBridge::connect_cec_client(config))
        .await
        .expect("connect stalled")
        .unwrap();
    assert_eq!(bridge.self_key(), "dev4");

    let table = timeout(Duration::from_secs(2), bridge.table())
        .await
        .expect("snapshot stalled")
        .unwrap();
    assert_eq!(table.len(), 2);

    let status = timeout(Duration::from_secs(3), bridge.get_status("dev0"))
        .await
        .expect("power query stalled");
    assert_eq!(status, Some(PowerStatus::On));
    assert!(bridge.is_alive());

    bridge.shutdown();
}

#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use trafficlink_transport::DeviceSocket;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/tlcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn wait_for_socket(path: &Path, timeout: Duration) {
    let start = Instant::now();
    while !path.exists() || DeviceSocket::connect(path).is_err() {
        if start.elapsed() >= timeout {
            panic!("simulator socket never came up");
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn start_simulator(sock_path: &Path) -> Child {
    let child = Command::new(env!("CARGO_BIN_EXE_trafficlink"))
        .arg("--log-level")
        .arg("error")
        .arg("simulate")
        .arg(sock_path)
        .arg("--interval")
        .arg("50ms")
        .arg("--brightness")
        .arg("77")
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("simulate command should start");
    wait_for_socket(sock_path, Duration::from_secs(3));
    child
}

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_trafficlink"))
        .arg("--log-level")
        .arg("error")
        .arg("--format")
        .arg("json")
        .args(args)
        .output()
        .expect("cli should run")
}

#[test]
fn monitor_reads_simulated_state() {
    let dir = unique_temp_dir("monitor");
    let sock_path = dir.join("device.sock");
    let mut child = start_simulator(&sock_path);
    let endpoint = format!("unix:{}", sock_path.display());

    let output = run_cli(&["monitor", &endpoint, "--count", "2"]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let records: Vec<&str> = stdout.lines().collect();
    assert_eq!(records.len(), 2, "{stdout}");
    for record in records {
        let value: serde_json::Value = serde_json::from_str(record).expect("json line");
        assert_eq!(value["mode"], "Normal");
        assert_eq!(value["brightness"], 77);
        assert_eq!(value["endpoint"], endpoint.as_str());
    }

    let _ = child.kill();
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn mode_change_is_visible_to_next_monitor() {
    let dir = unique_temp_dir("mode");
    let sock_path = dir.join("device.sock");
    let mut child = start_simulator(&sock_path);
    let endpoint = format!("unix:{}", sock_path.display());

    let output = run_cli(&["mode", &endpoint, "all-off"]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"command\":\"M:All Off\""), "{stdout}");
    assert!(stdout.contains("\"outcome\":\"sent\""), "{stdout}");

    let output = run_cli(&["monitor", &endpoint, "--count", "1"]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"mode\":\"All Off\""), "{stdout}");
    assert!(stdout.contains("\"current_light\":\"Off\""), "{stdout}");

    let _ = child.kill();
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn repeated_modes_follow_repeat_policy() {
    let dir = unique_temp_dir("repeat");
    let sock_path = dir.join("device.sock");
    let mut child = start_simulator(&sock_path);
    let endpoint = format!("unix:{}", sock_path.display());

    let output = run_cli(&["mode", &endpoint, "red-only", "red-only"]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let outcomes: Vec<&str> = stdout.lines().collect();
    assert_eq!(outcomes.len(), 2, "{stdout}");
    assert!(outcomes[0].contains("\"outcome\":\"sent\""));
    assert!(outcomes[1].contains("\"outcome\":\"already-active\""));

    let output = run_cli(&[
        "mode",
        &endpoint,
        "all-blink",
        "all-blink",
        "--repeat-policy",
        "revert-to-normal",
    ]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"command\":\"M:All Blink\""), "{stdout}");
    assert_eq!(stdout.matches("\"outcome\":\"sent\"").count(), 2, "{stdout}");

    let _ = child.kill();
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn durations_are_sent() {
    let dir = unique_temp_dir("durations");
    let sock_path = dir.join("device.sock");
    let mut child = start_simulator(&sock_path);
    let endpoint = format!("unix:{}", sock_path.display());

    let output = run_cli(&[
        "durations", &endpoint, "--red", "1000", "--yellow", "300", "--green", "1000",
    ]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"command\":\"D:1000,300,1000\""), "{stdout}");
    assert!(stdout.contains("\"outcome\":\"sent\""), "{stdout}");

    let _ = child.kill();
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_socket_returns_transport_code() {
    let dir = unique_temp_dir("missing");
    let endpoint = format!("unix:{}", dir.join("nobody.sock").display());

    let output = run_cli(&["mode", &endpoint, "normal"]);
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("open failed"), "{stderr}");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_trafficlink"))
        .arg("version")
        .output()
        .expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("trafficlink {}", env!("CARGO_PKG_VERSION")));
}

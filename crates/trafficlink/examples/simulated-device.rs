//! Serve one host session from the simulated traffic-light controller.
//!
//! Run with:
//!   cargo run --example simulated-device
//!
//! In another terminal (path is printed on startup):
//!   cargo run --features cli -- monitor unix:/tmp/trafficlink-sim-<pid>/device.sock

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::fs;
    use std::sync::atomic::AtomicBool;

    use trafficlink::device::Simulator;
    use trafficlink::transport::DeviceSocket;

    let sock_dir = std::env::temp_dir().join(format!("trafficlink-sim-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("device.sock");

    let socket = DeviceSocket::bind(&sock_path)?;
    eprintln!("Listening on {}", sock_path.display());

    let stream = socket.accept()?;
    eprintln!("Host connected");

    let mut simulator = Simulator::default();
    let running = AtomicBool::new(true);
    let end = simulator.serve(stream, &running)?;
    eprintln!(
        "Session ended ({end:?}), mode {}",
        simulator.controller().mode()
    );

    drop(socket);
    let _ = fs::remove_dir_all(&sock_dir);
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("simulated-device needs Unix domain sockets");
}

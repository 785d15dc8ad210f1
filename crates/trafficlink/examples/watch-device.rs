//! Open a device, print a few state updates, then cycle through the modes.
//!
//! Run with:
//!   cargo run --example watch-device -- /dev/ttyACM0
//!   cargo run --example watch-device -- unix:/tmp/trafficlink-sim-<pid>/device.sock

use std::thread;
use std::time::Duration;

use trafficlink::{open, Endpoint, LinkConfig, Mode};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let endpoint: Endpoint = std::env::args()
        .nth(1)
        .ok_or("usage: watch-device <ENDPOINT>")?
        .parse()?;

    let connection = open(&endpoint, &LinkConfig::default())?;
    let link = connection.link();

    for _ in 0..5 {
        thread::sleep(Duration::from_millis(300));
        eprintln!("{:?}", link.state());
    }

    for mode in [Mode::RedOnly, Mode::AllBlink, Mode::AllOff, Mode::Normal] {
        let outcome = link.send_mode(mode);
        thread::sleep(Duration::from_millis(500));
        eprintln!("{mode}: {outcome:?} -> {:?}", link.state());
    }

    let outcome = link.send_durations(1000, 300, 1000);
    eprintln!("durations: {outcome:?}");
    eprintln!(
        "decoded {} records, discarded {}",
        link.decoded_count(),
        link.discarded_count()
    );
    Ok(())
}

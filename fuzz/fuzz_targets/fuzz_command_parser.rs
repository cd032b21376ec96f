//! Fuzz target: `NodeCommand::parse`
//!
//! Feeds arbitrary bytes through the same lossy, length-bounded path the
//! bus client uses for inbound bodies, then parses them as a command.
//! Accepted commands must satisfy the documented ranges.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use gardennode::app::commands::{MAX_COMMAND_BLINKS, NodeCommand};
use gardennode::bus::client::INBOUND_MAX_LEN;
use gardennode::config::{STATUS_INTERVAL_MAX_SECS, STATUS_INTERVAL_MIN_SECS};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(&data[..data.len().min(INBOUND_MAX_LEN)]);

    if let Ok(cmd) = NodeCommand::parse(&text) {
        if let Some(n) = cmd.blink {
            assert!(n <= MAX_COMMAND_BLINKS);
        }
        if let Some(secs) = cmd.status_interval {
            assert!((STATUS_INTERVAL_MIN_SECS..=STATUS_INTERVAL_MAX_SECS).contains(&secs));
        }
    }
});

//! Runtime configuration for the sensor node.
//!
//! Topic names and timings. Network secrets are not part of this struct;
//! they are baked in at build time by [`crate::secrets`].

use serde::{Deserialize, Serialize};

use crate::bus::client::Topic;
use crate::error::ConfigError;

/// Accepted range for the diagnostics report period (seconds).
pub const STATUS_INTERVAL_MIN_SECS: u32 = 5;
pub const STATUS_INTERVAL_MAX_SECS: u32 = 3600;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Broker ---
    /// MQTT broker TCP port
    pub broker_port: u16,
    /// Session keep-alive (seconds)
    pub keep_alive_secs: u16,

    // --- Topics ---
    pub telemetry_topic: Topic,
    /// Retained presence (`online` / `offline`), also the last-will topic
    pub status_topic: Topic,
    pub command_topic: Topic,
    pub diagnostics_topic: Topic,

    // --- Timing ---
    /// Telemetry publish cadence (milliseconds)
    pub tick_interval_ms: u32,
    /// Main loop period (milliseconds)
    pub loop_period_ms: u32,
    /// Diagnostics report period (seconds)
    pub status_interval_secs: u32,
    /// Task watchdog timeout (milliseconds)
    pub watchdog_timeout_ms: u32,

    // --- Behaviour ---
    pub telemetry_enabled: bool,
}

fn topic(name: &str) -> Topic {
    let mut t = Topic::new();
    let _ = t.push_str(name);
    t
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Broker
            broker_port: 1883,
            keep_alive_secs: 15,

            // Topics
            telemetry_topic: topic("/home/sensors"),
            status_topic: topic("/home/sensors/status"),
            command_topic: topic("/home/sensors/command"),
            diagnostics_topic: topic("/home/sensors/diagnostics"),

            // Timing
            tick_interval_ms: 2_000,      // 0.5 Hz
            loop_period_ms: 20,           // 50 Hz
            status_interval_secs: 60,     // 1/min
            watchdog_timeout_ms: 30_000,

            telemetry_enabled: true,
        }
    }
}

impl NodeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker_port == 0 {
            return Err(ConfigError("broker_port must be non-zero"));
        }
        for t in [
            &self.telemetry_topic,
            &self.status_topic,
            &self.command_topic,
            &self.diagnostics_topic,
        ] {
            if t.is_empty() {
                return Err(ConfigError("topic names must be non-empty"));
            }
        }
        if self.loop_period_ms == 0 {
            return Err(ConfigError("loop_period_ms must be non-zero"));
        }
        if self.tick_interval_ms < self.loop_period_ms {
            return Err(ConfigError("tick_interval_ms must not be shorter than the loop period"));
        }
        if !(STATUS_INTERVAL_MIN_SECS..=STATUS_INTERVAL_MAX_SECS).contains(&self.status_interval_secs) {
            return Err(ConfigError("status_interval_secs out of range"));
        }
        // Two blocking association waits must fit inside one watchdog period.
        if u64::from(self.watchdog_timeout_ms)
            <= 2 * crate::net::connector::LINK_CONNECT_TIMEOUT_MS
        {
            return Err(ConfigError("watchdog_timeout_ms shorter than a full connect cycle"));
        }
        Ok(())
    }
}

//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing node events to the ESP-IDF logger
//! (UART in production).

use log::{error, info, warn};

use crate::app::events::NodeEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`NodeEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &NodeEvent) {
        match event {
            NodeEvent::Started { sensors_ok } => {
                info!("START | sensors={}", if *sensors_ok { "OK" } else { "FAILED" });
            }
            NodeEvent::LinkUp { slot, address } => match address {
                Some(ip) => info!("LINK  | up on slot {} | ip={}", slot, ip),
                None => info!("LINK  | up on slot {}", slot),
            },
            NodeEvent::LinkLost => {
                warn!("LINK  | lost");
            }
            NodeEvent::SessionUp { broker } => match broker {
                Some(ip) => info!("MQTT  | session up | broker={}", ip),
                None => info!("MQTT  | session up"),
            },
            NodeEvent::TelemetryPublished { bytes, valid_fields } => {
                info!("TELEM | published {} bytes | {}/14 channels", bytes, valid_fields);
            }
            NodeEvent::TelemetryFailed(e) => {
                warn!("TELEM | failed: {}", e);
            }
            NodeEvent::CommandApplied(cmd) => {
                info!(
                    "CMD   | telemetry={:?} status_interval={:?} blink={:?}",
                    cmd.telemetry, cmd.status_interval, cmd.blink
                );
            }
            NodeEvent::CommandRejected(e) => {
                warn!("CMD   | rejected: {}", e);
            }
            NodeEvent::RestartRequested => {
                error!("RESET | link retry ceiling reached, restart requested");
            }
        }
    }
}

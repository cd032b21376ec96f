//! Outbound node events.
//!
//! [`NodeService`](super::service::NodeService) emits these through the
//! [`EventSink`](super::ports::EventSink) port. The default adapter logs
//! them; tests record them.

use core::net::Ipv4Addr;

use crate::app::commands::NodeCommand;
use crate::error::{BusError, CommandError};

/// Structured events emitted by the node core.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// Service constructed and sensors initialised.
    Started { sensors_ok: bool },

    /// The WiFi link came up on the given candidate slot.
    LinkUp { slot: usize, address: Option<Ipv4Addr> },

    /// The WiFi link was found down.
    LinkLost,

    /// The MQTT session was (re)established.
    SessionUp { broker: Option<Ipv4Addr> },

    /// A telemetry record was delivered.
    TelemetryPublished { bytes: usize, valid_fields: usize },

    /// A telemetry publish failed after retries.
    TelemetryFailed(BusError),

    /// An inbound command was applied.
    CommandApplied(NodeCommand),

    /// An inbound command was dropped.
    CommandRejected(CommandError),

    /// The link layer exhausted its retries; the device must restart.
    RestartRequested,
}

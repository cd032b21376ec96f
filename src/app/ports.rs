//! Port traits: the hexagonal boundary between the connectivity core and
//! the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ NetworkConnector / BusClient / NodeService
//! ```
//!
//! ESP-IDF adapters in [`crate::adapters`] implement these traits on the
//! device; the integration tests implement them with scripted doubles, so
//! the whole retry and failover logic runs on the host.

use core::net::{Ipv4Addr, SocketAddrV4};

use crate::bus::session::{SessionOptions, SessionState};
use crate::error::SensorError;
use crate::net::credentials::NetworkCredential;
use crate::telemetry::TelemetryRecord;

// ───────────────────────────────────────────────────────────────
// Time
// ───────────────────────────────────────────────────────────────

/// Monotonic time source plus a blocking delay.
///
/// Takes `&self` for `delay_ms` so one clock can be shared (cloned) between
/// the connector, the bus client and the orchestrator.
pub trait Clock {
    /// Milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Block the calling task for `ms` milliseconds.
    fn delay_ms(&self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// WiFi link (driven adapter: connector → radio)
// ───────────────────────────────────────────────────────────────

/// Addressing of the station interface once associated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpInfo {
    pub address: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub netmask: Ipv4Addr,
}

/// Radio-level failure when issuing an association request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// The driver refused the configuration (bad SSID/secret encoding).
    InvalidConfiguration,
    /// The radio could not be started or the request was not accepted.
    RadioFailure,
}

/// Station-mode WiFi radio.
///
/// `begin` only issues the request; [`NetworkConnector`] owns the polling
/// and the timeout.
///
/// [`NetworkConnector`]: crate::net::connector::NetworkConnector
pub trait WifiDriver {
    /// Configure the station for `credential` and start associating.
    fn begin(&mut self, credential: &NetworkCredential) -> Result<(), DriverError>;

    /// Live association + IP status.
    fn is_connected(&self) -> bool;

    /// Drop any association or pending attempt.
    fn disconnect(&mut self);

    /// Interface addressing, `None` while not associated.
    fn ip_info(&self) -> Option<IpInfo>;

    /// Signal strength of the current AP in dBm.
    fn rssi(&self) -> Option<i8>;
}

/// TCP reachability probe used for broker discovery.
pub trait EndpointProbe {
    /// `true` if `addr` accepts a TCP connection within `timeout_ms`.
    fn accepts(&mut self, addr: SocketAddrV4, timeout_ms: u32) -> bool;
}

// ───────────────────────────────────────────────────────────────
// MQTT session (driven adapter: bus client → broker)
// ───────────────────────────────────────────────────────────────

/// Publish/subscribe transport under [`BusClient`].
///
/// Errors carry the transport's [`SessionState`] at the time of failure.
///
/// [`BusClient`]: crate::bus::client::BusClient
pub trait SessionTransport {
    /// Open a session; blocks until CONNACK or failure.
    fn open(&mut self, options: &SessionOptions<'_>) -> Result<(), SessionState>;

    /// Live session status.
    fn is_open(&self) -> bool;

    /// Publish one message (QoS 0).
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), SessionState>;

    /// Subscribe to `topic`.
    fn subscribe(&mut self, topic: &str) -> Result<(), SessionState>;

    /// Service keep-alives and hand every queued inbound message to
    /// `inbound`. Nothing is delivered outside this call.
    fn service(&mut self, inbound: &mut dyn FnMut(&str, &[u8]));

    /// Current state for diagnostics.
    fn state(&self) -> SessionState;

    /// Close the session cleanly (no last will).
    fn close(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Sensors (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port for the environmental sensors.
pub trait SensorPort {
    /// Initialisation gate; the control loop does not start until it passes.
    fn begin(&mut self) -> Result<(), SensorError>;

    /// Read every sensor. Failed channels come back as `None`.
    fn read(&mut self) -> TelemetryRecord;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The orchestrator emits structured [`NodeEvent`](super::events::NodeEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::NodeEvent);
}

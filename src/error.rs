//! Unified error types for the garden node firmware.
//!
//! Each layer has its own small `Copy` enum so results can be passed up the
//! control loop without allocation; all of them convert into [`Error`] for
//! callers that only need to log and move on.

use core::fmt;

use crate::bus::session::SessionState;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The WiFi link layer failed.
    Link(LinkError),
    /// The MQTT session layer failed.
    Bus(BusError),
    /// A sensor could not be initialised.
    Sensor(SensorError),
    /// A credential did not fit its fixed-capacity storage.
    Credential(CredentialError),
    /// Configuration is invalid.
    Config(ConfigError),
    /// An inbound command could not be parsed.
    Command(CommandError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Credential(e) => write!(f, "credential: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

/// Failures reported by [`NetworkConnector`](crate::net::connector::NetworkConnector).
///
/// Only [`LinkError::RetryCeilingExceeded`] is fatal: it is the request for a
/// full device restart, raised once per breach of the failure ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Candidate slot index is outside the table.
    SlotOutOfRange,
    /// Every candidate slot is empty.
    NoCandidates,
    /// Last attempt was too recent; nothing was tried.
    CoolingDown,
    /// No candidate associated within its timeout.
    ConnectTimeout,
    /// Consecutive failed cycles reached the ceiling; restart the device.
    RetryCeilingExceeded,
}

impl LinkError {
    /// Whether the orchestrator must perform the fatal recovery action.
    pub const fn requests_restart(self) -> bool {
        matches!(self, Self::RetryCeilingExceeded)
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SlotOutOfRange => write!(f, "candidate slot out of range"),
            Self::NoCandidates => write!(f, "no network candidates configured"),
            Self::CoolingDown => write!(f, "reconnect cool-down active"),
            Self::ConnectTimeout => write!(f, "no candidate network connected"),
            Self::RetryCeilingExceeded => write!(f, "retry ceiling exceeded, restart required"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

/// Failures reported by [`BusClient`](crate::bus::client::BusClient).
/// None of them are fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The WiFi link is not up.
    LinkDown,
    /// The MQTT session is not open.
    SessionDown,
    /// The broker did not answer the session handshake in time.
    ConnectTimeout,
    /// No broker address is known or discoverable on this network.
    NoEndpoint,
    /// Encoded payload exceeds the session buffer.
    PayloadTooLarge { size: usize, limit: usize },
    /// Topic does not fit the bounded topic buffer.
    TopicTooLong { len: usize, limit: usize },
    /// The transport or broker refused the operation.
    TransportRejected(SessionState),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinkDown => write!(f, "WiFi not connected"),
            Self::SessionDown => write!(f, "MQTT session not connected"),
            Self::ConnectTimeout => write!(f, "MQTT connection timeout"),
            Self::NoEndpoint => write!(f, "no MQTT broker endpoint"),
            Self::PayloadTooLarge { size, limit } => {
                write!(f, "payload {size} bytes exceeds {limit} byte buffer")
            }
            Self::TopicTooLong { len, limit } => {
                write!(f, "topic {len} bytes exceeds {limit} byte limit")
            }
            Self::TransportRejected(state) => write!(f, "transport rejected ({state})"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC unit or channel could not be configured.
    AdcInitFailed,
    /// A required sensor did not respond during initialisation.
    NotFound(&'static str),
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcInitFailed => write!(f, "ADC init failed"),
            Self::NotFound(name) => write!(f, "{name} not found"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Credential errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    SsidTooLong,
    SecretTooLong,
    IdentityTooLong,
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SsidTooLong => write!(f, "SSID longer than 32 bytes"),
            Self::SecretTooLong => write!(f, "secret longer than 64 bytes"),
            Self::IdentityTooLong => write!(f, "enterprise identity longer than 64 bytes"),
        }
    }
}

impl From<CredentialError> for Error {
    fn from(e: CredentialError) -> Self {
        Self::Credential(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// A config field failed range validation; the `&'static str` names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigError(pub &'static str);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed: {}", self.0)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Payload is not a JSON object with the expected field types.
    Malformed,
    /// A recognised field carried an out-of-range value.
    OutOfRange(&'static str),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed command payload"),
            Self::OutOfRange(field) => write!(f, "{field} out of range"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

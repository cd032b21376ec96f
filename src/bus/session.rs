//! Session-level vocabulary shared by [`BusClient`](super::client::BusClient)
//! and the transport adapters.

use core::fmt;
use core::net::Ipv4Addr;

/// MQTT delivery guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
}

/// Message the broker publishes on our behalf if the session drops uncleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastWill<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub qos: QoS,
    pub retain: bool,
}

/// Everything a transport needs to open one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions<'a> {
    pub host: Ipv4Addr,
    pub port: u16,
    pub client_id: &'a str,
    /// Largest message (topic + payload) the session must carry.
    pub buffer_size: usize,
    pub keep_alive_secs: u16,
    pub clean_session: bool,
    /// Let the transport reopen a dropped session on its own. Off for
    /// [`BusClient`](crate::bus::client::BusClient), which reopens through
    /// `connect` so presence and subscriptions are restored.
    pub auto_reconnect: bool,
    pub will: LastWill<'a>,
}

/// Session state as reported by the transport.
///
/// Codes follow the classic MQTT client convention: negative values are
/// local transport conditions, positive values are CONNACK refusals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    ConnectionTimeout,
    ConnectionLost,
    ConnectFailed,
    Disconnected,
    Connected,
    BadProtocol,
    BadClientId,
    Unavailable,
    BadCredentials,
    Unauthorized,
}

impl SessionState {
    pub const fn code(self) -> i8 {
        match self {
            Self::ConnectionTimeout => -4,
            Self::ConnectionLost => -3,
            Self::ConnectFailed => -2,
            Self::Disconnected => -1,
            Self::Connected => 0,
            Self::BadProtocol => 1,
            Self::BadClientId => 2,
            Self::Unavailable => 3,
            Self::BadCredentials => 4,
            Self::Unauthorized => 5,
        }
    }

    /// Map a CONNACK return code onto a state. Unknown codes count as
    /// "broker unavailable".
    pub const fn from_connack(code: u8) -> Self {
        match code {
            0 => Self::Connected,
            1 => Self::BadProtocol,
            2 => Self::BadClientId,
            4 => Self::BadCredentials,
            5 => Self::Unauthorized,
            _ => Self::Unavailable,
        }
    }

    /// One-line operator hint for the serial log.
    pub const fn suggestion(self) -> &'static str {
        match self {
            Self::ConnectionTimeout => "check broker availability and network latency",
            Self::ConnectionLost => "check network stability and WiFi signal strength",
            Self::ConnectFailed => "verify broker address and port",
            Self::Disconnected => "check if broker is running and accessible",
            Self::Connected => "client is connected but the operation failed",
            Self::BadProtocol => "check MQTT protocol version compatibility",
            Self::BadClientId => "verify client ID is unique and acceptable",
            Self::Unavailable => "verify broker is running and accepting connections",
            Self::BadCredentials => "check username and password if required",
            Self::Unauthorized => "verify access rights for topic",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ConnectionTimeout => "connection timeout",
            Self::ConnectionLost => "connection lost",
            Self::ConnectFailed => "connect failed",
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::BadProtocol => "bad protocol",
            Self::BadClientId => "bad client id",
            Self::Unavailable => "broker unavailable",
            Self::BadCredentials => "bad credentials",
            Self::Unauthorized => "unauthorized",
        };
        write!(f, "{name} [{}]", self.code())
    }
}

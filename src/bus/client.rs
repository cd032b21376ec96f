//! MQTT session manager.
//!
//! [`BusClient`] layers a publish/subscribe session on the link owned by
//! [`NetworkConnector`](crate::net::connector::NetworkConnector). It never
//! trusts an earlier link check: every operation re-queries [`LinkStatus`]
//! first and fails fast when the link is down.

use core::net::Ipv4Addr;

use log::{debug, info, warn};

use crate::app::ports::{Clock, SessionTransport};
use crate::bus::identity::{self, CLIENT_ID_PREFIX};
use crate::bus::session::{LastWill, QoS, SessionOptions, SessionState};
use crate::error::BusError;
use crate::net::connector::LinkStatus;
use crate::telemetry::TelemetryRecord;

/// Session buffer; also the upper bound for any encoded payload.
pub const SESSION_BUFFER_SIZE: usize = 512;
/// Publish attempts for telemetry and presence messages.
pub const PUBLISH_ATTEMPTS: u8 = 3;
/// Pause between two publish attempts.
pub const PUBLISH_RETRY_DELAY_MS: u32 = 100;
/// Inbound bodies longer than this are truncated before dispatch.
pub const INBOUND_MAX_LEN: usize = 256;

pub const PRESENCE_ONLINE: &str = "online";
pub const PRESENCE_OFFLINE: &str = "offline";

pub const TOPIC_MAX_LEN: usize = 64;

pub type Topic = heapless::String<TOPIC_MAX_LEN>;
pub type InboundText = heapless::String<INBOUND_MAX_LEN>;

/// Static session parameters.
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub port: u16,
    pub telemetry_topic: Topic,
    pub status_topic: Topic,
    pub buffer_size: usize,
    pub keep_alive_secs: u16,
}

impl BusConfig {
    pub fn from_node_config(config: &crate::config::NodeConfig) -> Self {
        Self {
            port: config.broker_port,
            telemetry_topic: config.telemetry_topic.clone(),
            status_topic: config.status_topic.clone(),
            buffer_size: SESSION_BUFFER_SIZE,
            keep_alive_secs: config.keep_alive_secs,
        }
    }
}

type Handler = Box<dyn FnMut(&str)>;

pub struct BusClient<T, C> {
    transport: T,
    clock: C,
    config: BusConfig,
    endpoint: Option<Ipv4Addr>,
    command_topic: Option<Topic>,
    handler: Option<Handler>,
}

impl<T: SessionTransport, C: Clock> BusClient<T, C> {
    pub fn new(transport: T, clock: C, config: BusConfig) -> Self {
        Self {
            transport,
            clock,
            config,
            endpoint: None,
            command_topic: None,
            handler: None,
        }
    }

    /// Live session status from the transport.
    pub fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    pub fn session_state(&self) -> SessionState {
        self.transport.state()
    }

    /// Broker the current (or last) session was opened against.
    pub fn endpoint(&self) -> Option<Ipv4Addr> {
        self.endpoint
    }

    /// Open the session if it is not already open.
    pub fn connect(&mut self, link: &mut impl LinkStatus) -> Result<(), BusError> {
        if self.transport.is_open() {
            return Ok(());
        }
        if !link.is_link_up() {
            warn!("MQTT: WiFi not connected, establish WiFi first");
            return Err(BusError::LinkDown);
        }

        let host = link.broker_endpoint(self.config.port).ok_or_else(|| {
            warn!("MQTT: no broker endpoint on this network");
            BusError::NoEndpoint
        })?;
        self.endpoint = Some(host);

        let client_id = identity::client_id(CLIENT_ID_PREFIX, identity::random_u16());
        info!("MQTT: broker {}:{} as '{}'", host, self.config.port, client_id);

        let options = SessionOptions {
            host,
            port: self.config.port,
            client_id: client_id.as_str(),
            buffer_size: self.config.buffer_size,
            keep_alive_secs: self.config.keep_alive_secs,
            clean_session: true,
            auto_reconnect: false,
            will: LastWill {
                topic: self.config.status_topic.as_str(),
                payload: PRESENCE_OFFLINE.as_bytes(),
                qos: QoS::AtLeastOnce,
                retain: true,
            },
        };

        if let Err(state) = self.transport.open(&options) {
            warn!("MQTT: connection failed, {} ({})", state, state.suggestion());
            link.forget_endpoint();
            return Err(match state {
                SessionState::ConnectionTimeout => BusError::ConnectTimeout,
                other => BusError::TransportRejected(other),
            });
        }
        info!("MQTT: connected");

        let status_topic = self.config.status_topic.clone();
        if let Err(e) = self.publish_with_retry(&status_topic, PRESENCE_ONLINE.as_bytes(), true) {
            warn!("MQTT: online status not delivered ({})", e);
        }

        if let Some(topic) = self.command_topic.clone() {
            match self.transport.subscribe(&topic) {
                Ok(()) => info!("MQTT: re-subscribed to '{}'", topic),
                Err(state) => warn!("MQTT: re-subscribe to '{}' failed, {}", topic, state),
            }
        }
        Ok(())
    }

    /// Publish once, not retained. Retrying is the caller's decision.
    pub fn publish(
        &mut self,
        link: &impl LinkStatus,
        topic: &str,
        payload: &[u8],
    ) -> Result<(), BusError> {
        self.ensure_ready(link)?;
        self.check_size(payload.len())?;
        self.transport.publish(topic, payload, false).map_err(|state| {
            warn!("MQTT: publish to '{}' failed, {} ({})", topic, state, state.suggestion());
            BusError::TransportRejected(state)
        })?;
        debug!("MQTT: published {} bytes to '{}'", payload.len(), topic);
        Ok(())
    }

    /// Encode `record` and publish it retained on the telemetry topic with up
    /// to [`PUBLISH_ATTEMPTS`] attempts.
    pub fn publish_telemetry(
        &mut self,
        link: &impl LinkStatus,
        record: &TelemetryRecord,
    ) -> Result<usize, BusError> {
        self.ensure_ready(link)?;

        let payload = record.encode();
        if let Err(e) = self.check_size(payload.len()) {
            warn!("MQTT: telemetry rejected, {}", e);
            return Err(e);
        }

        let topic = self.config.telemetry_topic.clone();
        info!("MQTT: publishing telemetry to '{}' ({} bytes)", topic, payload.len());
        debug!("MQTT: payload {}", payload);

        self.publish_with_retry(&topic, payload.as_bytes(), true)?;
        info!("MQTT: telemetry published");
        Ok(payload.len())
    }

    /// Register the single inbound handler and subscribe to `topic`.
    ///
    /// A later call replaces both. The topic is remembered and subscribed
    /// again after every reconnect.
    pub fn subscribe(
        &mut self,
        link: &impl LinkStatus,
        topic: &str,
        handler: impl FnMut(&str) + 'static,
    ) -> Result<(), BusError> {
        if !link.is_link_up() {
            warn!("MQTT: WiFi not connected, cannot subscribe");
            return Err(BusError::LinkDown);
        }

        let mut stored = Topic::new();
        stored.push_str(topic).map_err(|()| BusError::TopicTooLong {
            len: topic.len(),
            limit: TOPIC_MAX_LEN,
        })?;
        self.command_topic = Some(stored);
        self.handler = Some(Box::new(handler));

        if !self.transport.is_open() {
            return Err(BusError::SessionDown);
        }
        self.transport.subscribe(topic).map_err(|state| {
            warn!("MQTT: subscription to '{}' failed, {}", topic, state);
            BusError::TransportRejected(state)
        })?;
        info!("MQTT: subscribed to '{}'", topic);
        Ok(())
    }

    /// Service the session. Must run every control-loop iteration; it is the
    /// only place inbound messages reach the handler.
    pub fn poll(&mut self) {
        let handler = &mut self.handler;
        self.transport.service(&mut |topic: &str, data: &[u8]| {
            let text = bounded_text(data);
            info!("MQTT: message on '{}' ({} bytes)", topic, data.len());
            match handler.as_mut() {
                Some(h) => h(text.as_str()),
                None => debug!("MQTT: no handler registered, message dropped"),
            }
        });
    }

    /// Announce `offline` and close the session cleanly.
    pub fn disconnect(&mut self) {
        if self.transport.is_open() {
            let topic = self.config.status_topic.clone();
            let _ = self.transport.publish(&topic, PRESENCE_OFFLINE.as_bytes(), true);
            self.transport.close();
            info!("MQTT: disconnected");
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn ensure_ready(&self, link: &impl LinkStatus) -> Result<(), BusError> {
        if !link.is_link_up() {
            warn!("MQTT: WiFi not connected");
            return Err(BusError::LinkDown);
        }
        if !self.transport.is_open() {
            let state = self.transport.state();
            warn!("MQTT: session check failed, {} ({})", state, state.suggestion());
            return Err(BusError::SessionDown);
        }
        Ok(())
    }

    fn check_size(&self, size: usize) -> Result<(), BusError> {
        if size > self.config.buffer_size {
            return Err(BusError::PayloadTooLarge {
                size,
                limit: self.config.buffer_size,
            });
        }
        Ok(())
    }

    fn publish_with_retry(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), BusError> {
        let mut last = SessionState::Disconnected;
        for attempt in 1..=PUBLISH_ATTEMPTS {
            match self.transport.publish(topic, payload, retain) {
                Ok(()) => return Ok(()),
                Err(state) => {
                    last = state;
                    warn!(
                        "MQTT: publish attempt {} failed, {} retries remaining",
                        attempt,
                        PUBLISH_ATTEMPTS - attempt
                    );
                    if attempt < PUBLISH_ATTEMPTS {
                        self.clock.delay_ms(PUBLISH_RETRY_DELAY_MS);
                    }
                }
            }
        }
        warn!("MQTT: publish to '{}' failed after all retries, {} ({})", topic, last, last.suggestion());
        Err(BusError::TransportRejected(last))
    }
}

/// Copy an inbound body into a bounded text buffer, cutting at the last
/// UTF-8 boundary that fits. Invalid UTF-8 is replaced.
fn bounded_text(data: &[u8]) -> InboundText {
    let mut out = InboundText::new();
    let text = String::from_utf8_lossy(data);
    for ch in text.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

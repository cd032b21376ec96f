//! MQTT transport adapter.
//!
//! Implements [`SessionTransport`] on top of the ESP-IDF MQTT client. The IDF
//! client runs its own task; its event callback only records session state
//! and queues inbound messages behind a mutex. [`SessionTransport::service`]
//! drains that queue on the control task, so the core never sees a callback
//! from another thread.
//!
//! Host builds get a simulation stub with a scriptable broker.

use std::collections::VecDeque;

use log::warn;

use crate::bus::session::SessionState;
#[cfg(not(target_os = "espidf"))]
use crate::{app::ports::SessionTransport, bus::session::SessionOptions};

/// Inbound messages buffered between two `service()` calls.
pub const INBOUND_QUEUE_DEPTH: usize = 8;

/// Wait for CONNACK at most this long.
pub const OPEN_TIMEOUT_MS: u32 = 5_000;

struct Inbound {
    topic: String,
    data: Vec<u8>,
}

/// State shared with the IDF event task.
struct Shared {
    state: SessionState,
    inbound: VecDeque<Inbound>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: SessionState::Disconnected,
            inbound: VecDeque::with_capacity(INBOUND_QUEUE_DEPTH),
        }
    }

    fn enqueue(&mut self, topic: &str, data: &[u8]) {
        if self.inbound.len() >= INBOUND_QUEUE_DEPTH {
            warn!("MQTT: inbound queue full, dropping message on '{}'", topic);
            return;
        }
        self.inbound.push_back(Inbound {
            topic: topic.to_owned(),
            data: data.to_vec(),
        });
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF transport
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp_impl {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::mqtt::client::{
        EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS as MqttQoS,
    };
    use log::{info, warn};

    use super::{OPEN_TIMEOUT_MS, Shared};
    use crate::app::ports::SessionTransport;
    use crate::bus::session::{QoS, SessionOptions, SessionState};

    const OPEN_POLL_MS: u32 = 50;

    fn qos(q: QoS) -> MqttQoS {
        match q {
            QoS::AtMostOnce => MqttQoS::AtMostOnce,
            QoS::AtLeastOnce => MqttQoS::AtLeastOnce,
        }
    }

    pub struct MqttTransport {
        client: Option<EspMqttClient<'static>>,
        shared: Arc<Mutex<Shared>>,
    }

    impl Default for MqttTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MqttTransport {
        pub fn new() -> Self {
            Self {
                client: None,
                shared: Arc::new(Mutex::new(Shared::new())),
            }
        }

        fn set_state(&self, state: SessionState) {
            if let Ok(mut s) = self.shared.lock() {
                s.state = state;
            }
        }
    }

    impl SessionTransport for MqttTransport {
        fn open(&mut self, options: &SessionOptions<'_>) -> Result<(), SessionState> {
            self.close();
            if let Ok(mut s) = self.shared.lock() {
                s.state = SessionState::Disconnected;
                s.inbound.clear();
            }

            let url = format!("mqtt://{}:{}", options.host, options.port);
            let conf = MqttClientConfiguration {
                client_id: Some(options.client_id),
                keep_alive_interval: Some(Duration::from_secs(u64::from(options.keep_alive_secs))),
                disable_clean_session: !options.clean_session,
                disable_auto_reconnect: !options.auto_reconnect,
                buffer_size: options.buffer_size,
                out_buffer_size: options.buffer_size,
                lwt: Some(LwtConfiguration {
                    topic: options.will.topic,
                    payload: options.will.payload,
                    qos: qos(options.will.qos),
                    retain: options.will.retain,
                }),
                ..Default::default()
            };

            let shared = Arc::clone(&self.shared);
            let client = EspMqttClient::new_cb(&url, &conf, move |event| {
                let Ok(mut s) = shared.lock() else {
                    return;
                };
                match event.payload() {
                    EventPayload::Connected(_) => s.state = SessionState::Connected,
                    EventPayload::Disconnected => {
                        s.state = if s.state == SessionState::Connected {
                            SessionState::ConnectionLost
                        } else {
                            SessionState::ConnectFailed
                        };
                    }
                    EventPayload::Received { topic, data, .. } => {
                        s.enqueue(topic.unwrap_or(""), data);
                    }
                    EventPayload::Error(_) => {
                        if s.state != SessionState::Connected {
                            s.state = SessionState::ConnectFailed;
                        }
                    }
                    _ => {}
                }
            })
            .map_err(|e| {
                warn!("MQTT: client creation failed ({})", e);
                SessionState::ConnectFailed
            })?;
            self.client = Some(client);

            let mut waited = 0;
            loop {
                match self.state() {
                    SessionState::Connected => {
                        info!("MQTT: CONNACK from {}", url);
                        return Ok(());
                    }
                    SessionState::ConnectFailed => {
                        self.client = None;
                        return Err(SessionState::ConnectFailed);
                    }
                    _ => {}
                }
                if waited >= OPEN_TIMEOUT_MS {
                    self.client = None;
                    self.set_state(SessionState::ConnectionTimeout);
                    return Err(SessionState::ConnectionTimeout);
                }
                FreeRtos::delay_ms(OPEN_POLL_MS);
                waited += OPEN_POLL_MS;
            }
        }

        fn is_open(&self) -> bool {
            self.client.is_some() && self.state() == SessionState::Connected
        }

        fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), SessionState> {
            let state = self.state();
            let Some(client) = self.client.as_mut() else {
                return Err(state);
            };
            client
                .publish(topic, MqttQoS::AtMostOnce, retain, payload)
                .map(|_| ())
                .map_err(|e| {
                    warn!("MQTT: enqueue on '{}' failed ({})", topic, e);
                    state
                })
        }

        fn subscribe(&mut self, topic: &str) -> Result<(), SessionState> {
            let state = self.state();
            let Some(client) = self.client.as_mut() else {
                return Err(state);
            };
            client.subscribe(topic, MqttQoS::AtMostOnce).map(|_| ()).map_err(|_| state)
        }

        fn service(&mut self, inbound: &mut dyn FnMut(&str, &[u8])) {
            // Drain under the lock, dispatch without it.
            let pending: Vec<_> = match self.shared.lock() {
                Ok(mut s) => s.inbound.drain(..).collect(),
                Err(_) => return,
            };
            for msg in pending {
                inbound(&msg.topic, &msg.data);
            }
        }

        fn state(&self) -> SessionState {
            self.shared
                .lock()
                .map(|s| s.state)
                .unwrap_or(SessionState::Disconnected)
        }

        fn close(&mut self) {
            if self.client.take().is_some() {
                self.set_state(SessionState::Disconnected);
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp_impl::MqttTransport;

// ───────────────────────────────────────────────────────────────
// Simulation transport
// ───────────────────────────────────────────────────────────────

/// Host stub: an in-process broker that accepts everything while "up".
#[cfg(not(target_os = "espidf"))]
pub struct MqttTransport {
    shared: Shared,
    broker_up: bool,
    subscriptions: Vec<String>,
    /// Every accepted publish, newest last.
    pub sim_published: Vec<(String, Vec<u8>, bool)>,
}

#[cfg(not(target_os = "espidf"))]
impl Default for MqttTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl MqttTransport {
    pub fn new() -> Self {
        Self {
            shared: Shared::new(),
            broker_up: true,
            subscriptions: Vec::new(),
            sim_published: Vec::new(),
        }
    }

    /// Simulation: make the broker reachable or not. Going down drops an
    /// open session.
    pub fn sim_set_broker_up(&mut self, up: bool) {
        self.broker_up = up;
        if !up && self.shared.state == SessionState::Connected {
            self.shared.state = SessionState::ConnectionLost;
        }
    }

    /// Simulation: deliver a message if the topic is subscribed.
    pub fn sim_inject(&mut self, topic: &str, data: &[u8]) {
        if self.subscriptions.iter().any(|t| t == topic) {
            self.shared.enqueue(topic, data);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl SessionTransport for MqttTransport {
    fn open(&mut self, options: &SessionOptions<'_>) -> Result<(), SessionState> {
        if !self.broker_up {
            self.shared.state = SessionState::ConnectionTimeout;
            return Err(SessionState::ConnectionTimeout);
        }
        log::debug!("MQTT(sim): session for '{}' at {}:{}", options.client_id, options.host, options.port);
        self.shared.state = SessionState::Connected;
        self.subscriptions.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.shared.state == SessionState::Connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), SessionState> {
        if !self.is_open() {
            return Err(self.shared.state);
        }
        self.sim_published.push((topic.to_owned(), payload.to_vec(), retain));
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), SessionState> {
        if !self.is_open() {
            return Err(self.shared.state);
        }
        self.subscriptions.push(topic.to_owned());
        Ok(())
    }

    fn service(&mut self, inbound: &mut dyn FnMut(&str, &[u8])) {
        while let Some(msg) = self.shared.inbound.pop_front() {
            inbound(&msg.topic, &msg.data);
        }
    }

    fn state(&self) -> SessionState {
        self.shared.state
    }

    fn close(&mut self) {
        self.shared.state = SessionState::Disconnected;
        self.subscriptions.clear();
    }
}

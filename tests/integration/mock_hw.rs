//! Mock adapters for integration tests.
//!
//! Every port gets a scripted double that records its calls, so tests can
//! assert on the full interaction history without a radio or a broker.
//! Time is simulated: [`FakeClock::delay_ms`] advances the clock instead of
//! sleeping, so bounded waits finish instantly.

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use core::net::{Ipv4Addr, SocketAddrV4};
use std::collections::VecDeque;
use std::rc::Rc;

use gardennode::app::events::NodeEvent;
use gardennode::app::ports::{
    Clock, DriverError, EndpointProbe, EventSink, IpInfo, SensorPort, SessionTransport, WifiDriver,
};
use gardennode::bus::session::{SessionOptions, SessionState};
use gardennode::error::SensorError;
use gardennode::net::connector::LinkStatus;
use gardennode::net::credentials::NetworkCredential;
use gardennode::telemetry::TelemetryRecord;

// ── Clock ─────────────────────────────────────────────────────

/// Shared simulated clock. Clones observe the same time.
#[derive(Clone, Default)]
pub struct FakeClock {
    now: Rc<Cell<u64>>,
    delays: Rc<RefCell<Vec<u32>>>,
}

#[allow(dead_code)]
impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn delays(&self) -> Vec<u32> {
        self.delays.borrow().clone()
    }

    pub fn clear_delays(&self) {
        self.delays.borrow_mut().clear();
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn delay_ms(&self, ms: u32) {
        self.delays.borrow_mut().push(ms);
        self.advance(u64::from(ms));
    }
}

// ── WiFi ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BeginCall {
    pub ssid: String,
    pub enterprise: bool,
}

/// Associates with any SSID listed in `reachable`, instantly unless
/// `association_delay_ms` is set.
pub struct MockWifi {
    pub reachable: Vec<String>,
    /// Time from `begin` until the station reports connected. Needs `clock`.
    pub association_delay_ms: u64,
    pub clock: Option<FakeClock>,
    pub begun_at_ms: u64,
    pub reject_begin: bool,
    pub begin_calls: Vec<BeginCall>,
    pub disconnect_calls: usize,
    pub associated: Option<String>,
    pub ip: IpInfo,
}

#[allow(dead_code)]
impl MockWifi {
    pub fn new() -> Self {
        Self {
            reachable: Vec::new(),
            association_delay_ms: 0,
            clock: None,
            begun_at_ms: 0,
            reject_begin: false,
            begin_calls: Vec::new(),
            disconnect_calls: 0,
            associated: None,
            ip: IpInfo {
                address: Ipv4Addr::new(192, 168, 1, 50),
                gateway: Ipv4Addr::new(192, 168, 1, 1),
                netmask: Ipv4Addr::new(255, 255, 255, 0),
            },
        }
    }

    pub fn reachable(names: &[&str]) -> Self {
        let mut w = Self::new();
        w.reachable = names.iter().map(|s| (*s).to_owned()).collect();
        w
    }

    /// Reachable networks only associate `delay_ms` after `begin`.
    pub fn slow(names: &[&str], clock: &FakeClock, delay_ms: u64) -> Self {
        let mut w = Self::reachable(names);
        w.association_delay_ms = delay_ms;
        w.clock = Some(clock.clone());
        w
    }

    /// The AP disappears without the station noticing yet.
    pub fn drop_link(&mut self) {
        self.associated = None;
    }

    pub fn begun_ssids(&self) -> Vec<&str> {
        self.begin_calls.iter().map(|c| c.ssid.as_str()).collect()
    }
}

impl WifiDriver for MockWifi {
    fn begin(&mut self, credential: &NetworkCredential) -> Result<(), DriverError> {
        self.begin_calls.push(BeginCall {
            ssid: credential.ssid().to_owned(),
            enterprise: credential.is_enterprise(),
        });
        if self.reject_begin {
            return Err(DriverError::RadioFailure);
        }
        self.begun_at_ms = self.clock.as_ref().map_or(0, Clock::now_ms);
        if self.reachable.iter().any(|s| s == credential.ssid()) {
            self.associated = Some(credential.ssid().to_owned());
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let settled = self.clock.as_ref().map_or(true, |c| {
            c.now_ms().saturating_sub(self.begun_at_ms) >= self.association_delay_ms
        });
        self.associated.is_some() && settled
    }

    fn disconnect(&mut self) {
        self.disconnect_calls += 1;
        self.associated = None;
    }

    fn ip_info(&self) -> Option<IpInfo> {
        self.associated.as_ref().map(|_| self.ip)
    }

    fn rssi(&self) -> Option<i8> {
        self.associated.as_ref().map(|_| -58)
    }
}

// ── Endpoint probe ────────────────────────────────────────────

#[derive(Default)]
pub struct MockProbe {
    pub listeners: Vec<SocketAddrV4>,
    pub probed: Vec<SocketAddrV4>,
}

#[allow(dead_code)]
impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listening(addr: Ipv4Addr, port: u16) -> Self {
        Self {
            listeners: vec![SocketAddrV4::new(addr, port)],
            probed: Vec::new(),
        }
    }
}

impl EndpointProbe for MockProbe {
    fn accepts(&mut self, addr: SocketAddrV4, _timeout_ms: u32) -> bool {
        self.probed.push(addr);
        self.listeners.contains(&addr)
    }
}

// ── Static link (bus tests without a connector) ───────────────

pub struct StaticLink {
    pub up: bool,
    pub endpoint: Option<Ipv4Addr>,
}

#[allow(dead_code)]
impl StaticLink {
    pub fn up() -> Self {
        Self {
            up: true,
            endpoint: Some(Ipv4Addr::new(192, 168, 1, 10)),
        }
    }

    pub fn down() -> Self {
        Self {
            up: false,
            endpoint: Some(Ipv4Addr::new(192, 168, 1, 10)),
        }
    }
}

impl LinkStatus for StaticLink {
    fn is_link_up(&self) -> bool {
        self.up
    }

    fn broker_endpoint(&mut self, _port: u16) -> Option<Ipv4Addr> {
        self.endpoint
    }
}

// ── MQTT transport ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct OpenRecord {
    pub host: Ipv4Addr,
    pub port: u16,
    pub client_id: String,
    pub buffer_size: usize,
    pub will_topic: String,
    pub will_payload: Vec<u8>,
    pub will_retain: bool,
    pub auto_reconnect: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

#[allow(dead_code)]
impl Published {
    pub fn text(&self) -> &str {
        core::str::from_utf8(&self.payload).unwrap()
    }
}

pub struct MockTransport {
    pub broker_up: bool,
    pub open_error: SessionState,
    /// Publishes to reject before accepting again.
    pub publish_failures: usize,
    pub state: SessionState,
    pub open_calls: Vec<OpenRecord>,
    pub publish_attempts: usize,
    pub published: Vec<Published>,
    pub subscriptions: Vec<String>,
    pub inbound: VecDeque<(String, Vec<u8>)>,
    pub close_calls: usize,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self {
            broker_up: true,
            open_error: SessionState::ConnectionTimeout,
            publish_failures: 0,
            state: SessionState::Disconnected,
            open_calls: Vec::new(),
            publish_attempts: 0,
            published: Vec::new(),
            subscriptions: Vec::new(),
            inbound: VecDeque::new(),
            close_calls: 0,
        }
    }

    pub fn broker_down() -> Self {
        Self {
            broker_up: false,
            ..Self::new()
        }
    }

    /// Every publish fails.
    pub fn rejecting_publishes() -> Self {
        Self {
            publish_failures: usize::MAX,
            ..Self::new()
        }
    }

    /// The broker drops the session.
    pub fn drop_session(&mut self) {
        self.state = SessionState::ConnectionLost;
    }

    pub fn inject(&mut self, topic: &str, payload: &[u8]) {
        self.inbound.push_back((topic.to_owned(), payload.to_vec()));
    }

    pub fn published_on(&self, topic: &str) -> Vec<&Published> {
        self.published.iter().filter(|p| p.topic == topic).collect()
    }
}

impl SessionTransport for MockTransport {
    fn open(&mut self, options: &SessionOptions<'_>) -> Result<(), SessionState> {
        self.open_calls.push(OpenRecord {
            host: options.host,
            port: options.port,
            client_id: options.client_id.to_owned(),
            buffer_size: options.buffer_size,
            will_topic: options.will.topic.to_owned(),
            will_payload: options.will.payload.to_vec(),
            will_retain: options.will.retain,
            auto_reconnect: options.auto_reconnect,
        });
        if !self.broker_up {
            self.state = self.open_error;
            return Err(self.open_error);
        }
        self.state = SessionState::Connected;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state == SessionState::Connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), SessionState> {
        self.publish_attempts += 1;
        if !self.is_open() {
            return Err(self.state);
        }
        if self.publish_failures > 0 {
            self.publish_failures -= 1;
            return Err(SessionState::ConnectionLost);
        }
        self.published.push(Published {
            topic: topic.to_owned(),
            payload: payload.to_vec(),
            retain,
        });
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), SessionState> {
        if !self.is_open() {
            return Err(self.state);
        }
        self.subscriptions.push(topic.to_owned());
        Ok(())
    }

    fn service(&mut self, inbound: &mut dyn FnMut(&str, &[u8])) {
        while let Some((topic, data)) = self.inbound.pop_front() {
            inbound(&topic, &data);
        }
    }

    fn state(&self) -> SessionState {
        self.state
    }

    fn close(&mut self) {
        self.close_calls += 1;
        self.state = SessionState::Disconnected;
    }
}

// ── Status output pin ─────────────────────────────────────────

#[derive(Default)]
pub struct MockPin {
    pub levels: Vec<bool>,
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.levels.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.levels.push(true);
        Ok(())
    }
}

// ── Sensors ───────────────────────────────────────────────────

pub struct MockSensors {
    pub begin_result: Result<(), SensorError>,
    pub record: TelemetryRecord,
    pub reads: usize,
}

#[allow(dead_code)]
impl MockSensors {
    pub fn new() -> Self {
        Self {
            begin_result: Ok(()),
            record: TelemetryRecord {
                soil_temperature: Some(17.5),
                soil_moisture: Some(640),
                air_temperature: Some(21.25),
                humidity: Some(48.0),
                hydrogen_raw: Some(812),
                hydrogen_voltage: Some(TelemetryRecord::hydrogen_voltage_from_raw(812)),
                ..TelemetryRecord::default()
            },
            reads: 0,
        }
    }
}

impl SensorPort for MockSensors {
    fn begin(&mut self) -> Result<(), SensorError> {
        self.begin_result
    }

    fn read(&mut self) -> TelemetryRecord {
        self.reads += 1;
        self.record
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<NodeEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&NodeEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &NodeEvent) {
        self.events.push(event.clone());
    }
}

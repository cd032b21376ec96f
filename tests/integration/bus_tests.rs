//! Integration tests for BusClient: session setup, bounded publish retry,
//! size limits and inbound dispatch.

use core::net::{Ipv4Addr, SocketAddrV4};
use std::cell::RefCell;
use std::rc::Rc;

use gardennode::bus::client::{
    BusClient, BusConfig, INBOUND_MAX_LEN, PRESENCE_OFFLINE, PRESENCE_ONLINE, PUBLISH_ATTEMPTS,
    PUBLISH_RETRY_DELAY_MS, TOPIC_MAX_LEN,
};
use gardennode::bus::identity::CLIENT_ID_PREFIX;
use gardennode::bus::session::SessionState;
use gardennode::config::NodeConfig;
use gardennode::error::BusError;
use gardennode::net::connector::NetworkConnector;
use gardennode::net::credentials::NetworkCredential;
use gardennode::telemetry::TelemetryRecord;

use super::mock_hw::{FakeClock, MockProbe, MockTransport, MockWifi, StaticLink};

const TELEMETRY: &str = "/home/sensors";
const STATUS: &str = "/home/sensors/status";
const COMMAND: &str = "/home/sensors/command";

fn client(transport: MockTransport) -> (BusClient<MockTransport, FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    let config = BusConfig::from_node_config(&NodeConfig::default());
    (BusClient::new(transport, clock.clone(), config), clock)
}

fn record() -> TelemetryRecord {
    TelemetryRecord {
        air_temperature: Some(19.5),
        humidity: Some(55.0),
        ..TelemetryRecord::default()
    }
}

// ── Session setup ─────────────────────────────────────────────

#[test]
fn connect_with_link_down_fails_without_handshake() {
    let (mut bus, _) = client(MockTransport::new());
    assert_eq!(bus.connect(&mut StaticLink::down()), Err(BusError::LinkDown));
    assert!(bus.transport().open_calls.is_empty());
}

#[test]
fn connect_without_endpoint_fails() {
    let (mut bus, _) = client(MockTransport::new());
    let mut link = StaticLink {
        up: true,
        endpoint: None,
    };
    assert_eq!(bus.connect(&mut link), Err(BusError::NoEndpoint));
    assert!(bus.transport().open_calls.is_empty());
}

#[test]
fn connect_registers_last_will_and_announces_online() {
    let (mut bus, _) = client(MockTransport::new());
    bus.connect(&mut StaticLink::up()).unwrap();

    let open = &bus.transport().open_calls[0];
    assert_eq!(open.host, Ipv4Addr::new(192, 168, 1, 10));
    assert_eq!(open.port, 1883);
    assert_eq!(open.buffer_size, 512);
    assert!(open.client_id.starts_with(CLIENT_ID_PREFIX));
    assert_eq!(open.will_topic, STATUS);
    assert_eq!(open.will_payload, PRESENCE_OFFLINE.as_bytes());
    assert!(open.will_retain);
    assert!(!open.auto_reconnect);

    let status = bus.transport().published_on(STATUS);
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].text(), PRESENCE_ONLINE);
    assert!(status[0].retain);
    assert!(bus.is_connected());
    assert_eq!(bus.endpoint(), Some(Ipv4Addr::new(192, 168, 1, 10)));
}

#[test]
fn connect_is_idempotent_while_open() {
    let (mut bus, _) = client(MockTransport::new());
    bus.connect(&mut StaticLink::up()).unwrap();
    bus.connect(&mut StaticLink::up()).unwrap();
    assert_eq!(bus.transport().open_calls.len(), 1);
}

#[test]
fn broker_timeout_maps_to_connect_timeout() {
    let (mut bus, _) = client(MockTransport::broker_down());
    assert_eq!(bus.connect(&mut StaticLink::up()), Err(BusError::ConnectTimeout));
    assert!(!bus.is_connected());
}

#[test]
fn broker_refusal_carries_state() {
    let mut t = MockTransport::broker_down();
    t.open_error = SessionState::BadCredentials;
    let (mut bus, _) = client(t);
    assert_eq!(
        bus.connect(&mut StaticLink::up()),
        Err(BusError::TransportRejected(SessionState::BadCredentials))
    );
}

#[test]
fn failed_open_rescans_for_moved_broker() {
    let port = 1883;
    let old = Ipv4Addr::new(192, 168, 1, 7);
    let moved = Ipv4Addr::new(192, 168, 1, 9);
    let (mut bus, clock) = client(MockTransport::new());
    let mut link = NetworkConnector::new(
        MockWifi::reachable(&["home"]),
        clock.clone(),
        MockProbe::listening(old, port),
    );
    link.register_candidate(0, NetworkCredential::open("home", "password1").unwrap())
        .unwrap();
    link.connect().unwrap();

    bus.connect(&mut link).unwrap();
    assert_eq!(bus.endpoint(), Some(old));

    // Broker restarts elsewhere while WiFi stays up.
    link.probe_mut().listeners = vec![SocketAddrV4::new(moved, port)];
    bus.transport_mut().broker_up = false;
    bus.transport_mut().drop_session();
    assert_eq!(bus.connect(&mut link), Err(BusError::ConnectTimeout));

    bus.transport_mut().broker_up = true;
    clock.advance(2_000);
    bus.connect(&mut link).unwrap();
    assert_eq!(bus.endpoint(), Some(moved));
    assert_eq!(bus.transport().open_calls.last().unwrap().host, moved);
}

// ── Telemetry publish ─────────────────────────────────────────

#[test]
fn telemetry_requires_link() {
    let (mut bus, _) = client(MockTransport::new());
    bus.connect(&mut StaticLink::up()).unwrap();
    let before = bus.transport().publish_attempts;

    assert_eq!(
        bus.publish_telemetry(&StaticLink::down(), &record()),
        Err(BusError::LinkDown)
    );
    assert_eq!(bus.transport().publish_attempts, before);
}

#[test]
fn telemetry_requires_session() {
    let (mut bus, _) = client(MockTransport::new());
    assert_eq!(
        bus.publish_telemetry(&StaticLink::up(), &record()),
        Err(BusError::SessionDown)
    );
    assert_eq!(bus.transport().publish_attempts, 0);
}

#[test]
fn telemetry_published_retained_on_first_attempt() {
    let (mut bus, clock) = client(MockTransport::new());
    bus.connect(&mut StaticLink::up()).unwrap();
    let before = bus.transport().publish_attempts;

    let bytes = bus.publish_telemetry(&StaticLink::up(), &record()).unwrap();

    assert_eq!(bus.transport().publish_attempts - before, 1);
    let sent = bus.transport().published_on(TELEMETRY);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].retain);
    assert_eq!(sent[0].payload.len(), bytes);
    assert_eq!(TelemetryRecord::decode(sent[0].text()).unwrap(), record());
    assert!(clock.delays().is_empty());
}

#[test]
fn telemetry_succeeds_on_second_attempt() {
    let (mut bus, clock) = client(MockTransport::new());
    bus.connect(&mut StaticLink::up()).unwrap();
    bus.transport_mut().publish_failures = 1;
    let before = bus.transport().publish_attempts;

    assert!(bus.publish_telemetry(&StaticLink::up(), &record()).is_ok());
    assert_eq!(bus.transport().publish_attempts - before, 2);
    assert_eq!(clock.delays(), vec![PUBLISH_RETRY_DELAY_MS]);
}

#[test]
fn telemetry_gives_up_after_bounded_attempts() {
    let (mut bus, clock) = client(MockTransport::new());
    bus.connect(&mut StaticLink::up()).unwrap();
    bus.transport_mut().publish_failures = usize::MAX;
    let before = bus.transport().publish_attempts;

    assert_eq!(
        bus.publish_telemetry(&StaticLink::up(), &record()),
        Err(BusError::TransportRejected(SessionState::ConnectionLost))
    );
    assert_eq!(
        bus.transport().publish_attempts - before,
        usize::from(PUBLISH_ATTEMPTS)
    );
    // Delays only between attempts.
    assert_eq!(
        clock.delays(),
        vec![PUBLISH_RETRY_DELAY_MS; usize::from(PUBLISH_ATTEMPTS) - 1]
    );
}

#[test]
fn oversize_telemetry_refused_without_publish() {
    let clock = FakeClock::new();
    let config = BusConfig {
        buffer_size: 32,
        ..BusConfig::from_node_config(&NodeConfig::default())
    };
    let mut bus = BusClient::new(MockTransport::new(), clock, config);
    bus.connect(&mut StaticLink::up()).unwrap();
    let before = bus.transport().publish_attempts;

    let err = bus.publish_telemetry(&StaticLink::up(), &record()).unwrap_err();
    assert!(matches!(err, BusError::PayloadTooLarge { limit: 32, .. }));
    assert_eq!(bus.transport().publish_attempts, before);
}

#[test]
fn plain_publish_is_single_attempt_not_retained() {
    let (mut bus, _) = client(MockTransport::new());
    bus.connect(&mut StaticLink::up()).unwrap();
    bus.transport_mut().publish_failures = 1;
    let before = bus.transport().publish_attempts;

    assert!(bus.publish(&StaticLink::up(), "/x", b"1").is_err());
    assert_eq!(bus.transport().publish_attempts - before, 1);

    bus.publish(&StaticLink::up(), "/x", b"2").unwrap();
    let sent = bus.transport().published_on("/x");
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].retain);
}

// ── Inbound ───────────────────────────────────────────────────

fn collecting_handler() -> (Rc<RefCell<Vec<String>>>, impl FnMut(&str) + 'static) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    (seen, move |text: &str| sink.borrow_mut().push(text.to_owned()))
}

#[test]
fn subscribe_requires_link() {
    let (mut bus, _) = client(MockTransport::new());
    let (_, handler) = collecting_handler();
    assert_eq!(
        bus.subscribe(&StaticLink::down(), COMMAND, handler),
        Err(BusError::LinkDown)
    );
}

#[test]
fn overlong_topic_is_refused() {
    let (mut bus, _) = client(MockTransport::new());
    bus.connect(&mut StaticLink::up()).unwrap();
    let topic = "/t".repeat(TOPIC_MAX_LEN);
    let (_, handler) = collecting_handler();

    assert_eq!(
        bus.subscribe(&StaticLink::up(), &topic, handler),
        Err(BusError::TopicTooLong {
            len: topic.len(),
            limit: TOPIC_MAX_LEN,
        })
    );
    assert!(bus.transport().subscriptions.is_empty());
}

#[test]
fn inbound_messages_dispatched_only_in_poll() {
    let (mut bus, _) = client(MockTransport::new());
    bus.connect(&mut StaticLink::up()).unwrap();
    let (seen, handler) = collecting_handler();
    bus.subscribe(&StaticLink::up(), COMMAND, handler).unwrap();
    assert_eq!(bus.transport().subscriptions, vec![COMMAND.to_owned()]);

    bus.transport_mut().inject(COMMAND, b"{\"blink\":2}");
    assert!(seen.borrow().is_empty());

    bus.poll();
    assert_eq!(*seen.borrow(), vec!["{\"blink\":2}".to_owned()]);
}

#[test]
fn inbound_body_truncated() {
    let (mut bus, _) = client(MockTransport::new());
    bus.connect(&mut StaticLink::up()).unwrap();
    let (seen, handler) = collecting_handler();
    bus.subscribe(&StaticLink::up(), COMMAND, handler).unwrap();

    bus.transport_mut().inject(COMMAND, &[b'x'; 1000]);
    bus.poll();
    assert_eq!(seen.borrow()[0].len(), INBOUND_MAX_LEN);
}

#[test]
fn later_subscribe_replaces_handler() {
    let (mut bus, _) = client(MockTransport::new());
    bus.connect(&mut StaticLink::up()).unwrap();
    let (first, h1) = collecting_handler();
    let (second, h2) = collecting_handler();
    bus.subscribe(&StaticLink::up(), COMMAND, h1).unwrap();
    bus.subscribe(&StaticLink::up(), COMMAND, h2).unwrap();

    bus.transport_mut().inject(COMMAND, b"{}");
    bus.poll();
    assert!(first.borrow().is_empty());
    assert_eq!(second.borrow().len(), 1);
}

#[test]
fn subscription_renewed_after_reconnect() {
    let (mut bus, _) = client(MockTransport::new());
    bus.connect(&mut StaticLink::up()).unwrap();
    let (_, handler) = collecting_handler();
    bus.subscribe(&StaticLink::up(), COMMAND, handler).unwrap();

    bus.transport_mut().drop_session();
    assert!(!bus.is_connected());
    assert_eq!(bus.session_state(), SessionState::ConnectionLost);

    bus.connect(&mut StaticLink::up()).unwrap();
    assert_eq!(bus.transport().open_calls.len(), 2);
    assert_eq!(bus.transport().subscriptions, vec![COMMAND.to_owned(), COMMAND.to_owned()]);
}

#[test]
fn subscribe_before_session_is_remembered() {
    let (mut bus, _) = client(MockTransport::new());
    let (_, handler) = collecting_handler();
    assert_eq!(
        bus.subscribe(&StaticLink::up(), COMMAND, handler),
        Err(BusError::SessionDown)
    );
    bus.connect(&mut StaticLink::up()).unwrap();
    assert_eq!(bus.transport().subscriptions, vec![COMMAND.to_owned()]);
}

#[test]
fn disconnect_announces_offline() {
    let (mut bus, _) = client(MockTransport::new());
    bus.connect(&mut StaticLink::up()).unwrap();
    bus.disconnect();

    let status = bus.transport().published_on(STATUS);
    assert_eq!(status.last().unwrap().text(), PRESENCE_OFFLINE);
    assert_eq!(bus.transport().close_calls, 1);
    assert!(!bus.is_connected());
}

//! Node service, the orchestrator.
//!
//! [`NodeService`] owns the link, the session and the indicator and runs
//! them in a fixed order once per loop iteration:
//!
//! ```text
//!  indicator ─▶ link ─▶ poll + commands ─▶ session ─▶ telemetry ─▶ status
//! ```
//!
//! Each stage gates the next; a stage that is down ends the tick with a
//! [`TickOutcome`] naming it. Hardware is reached only through the port
//! traits, so the whole cycle runs against mocks on the host.

use core::cell::RefCell;
use std::rc::Rc;

use embedded_hal::digital::OutputPin;
use log::{debug, error, info, warn};

use crate::bus::client::{BusClient, BusConfig, InboundText};
use crate::config::NodeConfig;
use crate::diagnostics::{DeliveryCounters, StatusReport};
use crate::drivers::link_indicator::{BLINKS_FAILURE, BLINKS_SUCCESS, LinkIndicator};
use crate::error::{BusError, ConfigError, LinkError, SensorError};
use crate::net::connector::{LinkStatus, NetworkConnector};

use super::commands::NodeCommand;
use super::events::NodeEvent;
use super::ports::{Clock, EndpointProbe, EventSink, SensorPort, SessionTransport, WifiDriver};

/// Inbound commands buffered between two ticks.
pub const COMMAND_MAILBOX_DEPTH: usize = 4;

type Mailbox = Rc<RefCell<heapless::Deque<InboundText, COMMAND_MAILBOX_DEPTH>>>;

/// What one [`NodeService::tick`] achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Link and session are up; nothing was due.
    Serviced,
    /// A telemetry record of this many bytes was delivered.
    Published(usize),
    /// Telemetry was due but could not be delivered.
    PublishFailed(BusError),
    /// The WiFi link is down and could not be brought up this tick.
    LinkDown(LinkError),
    /// The link is up but the MQTT session could not be opened.
    SessionDown(BusError),
    /// The link retry ceiling fired; the caller must restart the device.
    RestartRequired,
}

// ───────────────────────────────────────────────────────────────
// NodeService
// ───────────────────────────────────────────────────────────────

pub struct NodeService<W, P, T, O, C> {
    connector: NetworkConnector<W, C, P>,
    bus: BusClient<T, C>,
    indicator: LinkIndicator<O>,
    clock: C,
    config: NodeConfig,
    mailbox: Mailbox,
    subscribed: bool,
    link_was_up: bool,
    session_was_up: bool,
    last_telemetry_ms: Option<u64>,
    last_status_ms: u64,
    counters: DeliveryCounters,
}

impl<W, P, T, O, C> NodeService<W, P, T, O, C>
where
    W: WifiDriver,
    P: EndpointProbe,
    T: SessionTransport,
    O: OutputPin,
    C: Clock + Clone,
{
    /// Validate `config` and wire the connector, bus client and indicator
    /// around the given adapters. Candidates are registered afterwards
    /// through [`connector_mut`](Self::connector_mut).
    pub fn new(
        driver: W,
        probe: P,
        transport: T,
        pin: O,
        clock: C,
        config: NodeConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let now = clock.now_ms();
        Ok(Self {
            connector: NetworkConnector::new(driver, clock.clone(), probe),
            bus: BusClient::new(transport, clock.clone(), BusConfig::from_node_config(&config)),
            indicator: LinkIndicator::new(pin),
            clock,
            config,
            mailbox: Rc::new(RefCell::new(heapless::Deque::new())),
            subscribed: false,
            link_was_up: false,
            session_was_up: false,
            last_telemetry_ms: None,
            last_status_ms: now,
            counters: DeliveryCounters::default(),
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Run the sensor initialisation gate. The loop must not start until
    /// this returns `Ok`.
    pub fn start(
        &mut self,
        sensors: &mut impl SensorPort,
        sink: &mut impl EventSink,
    ) -> Result<(), SensorError> {
        let result = sensors.begin();
        sink.emit(&NodeEvent::Started {
            sensors_ok: result.is_ok(),
        });
        match result {
            Ok(()) => info!("NodeService started"),
            Err(e) => error!("NodeService: sensor init failed ({})", e),
        }
        result
    }

    /// Announce `offline`, close the session and drop the link.
    pub fn shutdown(&mut self) {
        self.bus.disconnect();
        self.connector.disconnect();
        self.link_was_up = false;
        self.session_was_up = false;
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one loop iteration. Call continuously; it never sleeps except
    /// inside the bounded link and publish retries.
    pub fn tick(&mut self, sensors: &mut impl SensorPort, sink: &mut impl EventSink) -> TickOutcome {
        // 1. Indicator first so feedback runs even with everything down.
        self.indicator.tick(self.clock.now_ms());

        // 2. Link
        if let Err(outcome) = self.ensure_link(sink) {
            return outcome;
        }

        // 3. Inbound traffic
        self.bus.poll();
        self.apply_pending_commands(sink);

        // 4. Session
        if !self.bus.is_connected() {
            if self.session_was_up {
                warn!("NodeService: MQTT session lost");
                self.session_was_up = false;
            }
            if let Err(e) = self.bus.connect(&mut self.connector) {
                return TickOutcome::SessionDown(e);
            }
        }
        if !self.session_was_up {
            self.session_was_up = true;
            sink.emit(&NodeEvent::SessionUp {
                broker: self.bus.endpoint(),
            });
        }

        // 5. Command subscription (the bus client renews it on reconnect)
        if !self.subscribed {
            self.subscribe_commands();
        }

        let now = self.clock.now_ms();
        let mut outcome = TickOutcome::Serviced;

        // 6. Telemetry
        if self.telemetry_due(now) {
            self.last_telemetry_ms = Some(now);
            outcome = self.publish_telemetry(sensors, sink);
        }

        // 7. Diagnostics
        let status_period = u64::from(self.config.status_interval_secs) * 1000;
        if now.saturating_sub(self.last_status_ms) >= status_period {
            self.last_status_ms = now;
            self.publish_status();
        }

        outcome
    }

    fn ensure_link(&mut self, sink: &mut impl EventSink) -> Result<(), TickOutcome> {
        if !self.connector.check_connection() {
            if self.link_was_up {
                self.link_was_up = false;
                sink.emit(&NodeEvent::LinkLost);
            }
            match self.connector.connect() {
                Ok(()) => {}
                Err(LinkError::RetryCeilingExceeded) => {
                    error!("NodeService: WiFi retry ceiling reached");
                    sink.emit(&NodeEvent::RestartRequested);
                    return Err(TickOutcome::RestartRequired);
                }
                Err(e) => return Err(TickOutcome::LinkDown(e)),
            }
        }
        if !self.link_was_up {
            self.link_was_up = true;
            sink.emit(&NodeEvent::LinkUp {
                slot: self.connector.state().current_index,
                address: self.connector.link_info().address,
            });
        }
        Ok(())
    }

    fn subscribe_commands(&mut self) {
        let mailbox = Rc::clone(&self.mailbox);
        let topic = self.config.command_topic.clone();
        let handler = move |text: &str| {
            let mut entry = InboundText::new();
            let _ = entry.push_str(text);
            if mailbox.borrow_mut().push_back(entry).is_err() {
                warn!("NodeService: command mailbox full, dropping message");
            }
        };
        match self.bus.subscribe(&self.connector, &topic, handler) {
            Ok(()) => self.subscribed = true,
            Err(e) => warn!("NodeService: command subscription failed ({})", e),
        }
    }

    fn apply_pending_commands(&mut self, sink: &mut impl EventSink) {
        loop {
            // The mailbox borrow ends with this statement.
            let Some(text) = self.mailbox.borrow_mut().pop_front() else {
                break;
            };
            match NodeCommand::parse(&text) {
                Ok(cmd) => {
                    self.apply(cmd);
                    self.counters.commands = self.counters.commands.saturating_add(1);
                    sink.emit(&NodeEvent::CommandApplied(cmd));
                }
                Err(e) => {
                    warn!("NodeService: command dropped ({}): {}", e, text);
                    sink.emit(&NodeEvent::CommandRejected(e));
                }
            }
        }
    }

    fn apply(&mut self, cmd: NodeCommand) {
        if let Some(enabled) = cmd.telemetry {
            info!("NodeService: telemetry {}", if enabled { "enabled" } else { "paused" });
            self.config.telemetry_enabled = enabled;
        }
        if let Some(secs) = cmd.status_interval {
            info!("NodeService: status interval {} s", secs);
            self.config.status_interval_secs = secs;
        }
        if let Some(n) = cmd.blink {
            self.indicator.request_blink(n, self.clock.now_ms());
        }
    }

    fn telemetry_due(&self, now: u64) -> bool {
        self.config.telemetry_enabled
            && self
                .last_telemetry_ms
                .is_none_or(|last| now.saturating_sub(last) >= u64::from(self.config.tick_interval_ms))
    }

    fn publish_telemetry(
        &mut self,
        sensors: &mut impl SensorPort,
        sink: &mut impl EventSink,
    ) -> TickOutcome {
        let record = sensors.read();
        debug!("NodeService: {} of 14 channels valid", record.valid_fields());

        match self.bus.publish_telemetry(&self.connector, &record) {
            Ok(bytes) => {
                self.indicator.request_blink(BLINKS_SUCCESS, self.clock.now_ms());
                self.counters.published = self.counters.published.saturating_add(1);
                sink.emit(&NodeEvent::TelemetryPublished {
                    bytes,
                    valid_fields: record.valid_fields(),
                });
                TickOutcome::Published(bytes)
            }
            Err(e) => {
                self.indicator.request_blink(BLINKS_FAILURE, self.clock.now_ms());
                self.counters.failed = self.counters.failed.saturating_add(1);
                sink.emit(&NodeEvent::TelemetryFailed(e));
                TickOutcome::PublishFailed(e)
            }
        }
    }

    fn publish_status(&mut self) {
        let report = StatusReport::collect(
            self.clock.now_ms(),
            &self.connector.link_info(),
            self.bus.endpoint(),
            self.bus.session_state(),
            self.config.telemetry_enabled,
            self.counters,
        );
        let topic = self.config.diagnostics_topic.clone();
        if let Err(e) = self.bus.publish(&self.connector, &topic, report.encode().as_bytes()) {
            warn!("NodeService: status report not delivered ({})", e);
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn counters(&self) -> DeliveryCounters {
        self.counters
    }

    pub fn is_link_up(&self) -> bool {
        self.connector.is_link_up()
    }

    pub fn connector(&self) -> &NetworkConnector<W, C, P> {
        &self.connector
    }

    pub fn connector_mut(&mut self) -> &mut NetworkConnector<W, C, P> {
        &mut self.connector
    }

    pub fn bus(&self) -> &BusClient<T, C> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut BusClient<T, C> {
        &mut self.bus
    }

    pub fn indicator(&self) -> &LinkIndicator<O> {
        &self.indicator
    }
}

//! WiFi link manager.
//!
//! Keeps one station link up, chosen from an ordered [`CandidateTable`].
//!
//! ## Reconnection policy
//!
//! - An attempt cycle tries every occupied slot once, starting from the last
//!   network that worked, and waits up to 5 s for each to associate.
//! - Cycles are rate-limited to one per 5 s.
//! - Three failed cycles in a row raise [`LinkError::RetryCeilingExceeded`];
//!   the orchestrator answers with a full device restart.

use core::net::{Ipv4Addr, SocketAddrV4};

use log::{debug, error, info, warn};

use crate::app::ports::{Clock, EndpointProbe, WifiDriver};
use crate::error::LinkError;
use crate::net::credentials::{CandidateTable, NetworkCredential};
use crate::net::discovery::{self, ENDPOINT_PROBE_TIMEOUT_MS};

/// Minimum spacing between two attempt cycles.
pub const LINK_RETRY_COOLDOWN_MS: u64 = 5_000;
/// Per-candidate association timeout.
pub const LINK_CONNECT_TIMEOUT_MS: u64 = 5_000;
/// Status poll period while waiting for association.
pub const LINK_POLL_INTERVAL_MS: u32 = 100;
/// Consecutive failed cycles before a restart is requested.
pub const LINK_RETRY_CEILING: u8 = 3;

/// Link-layer view the bus client depends on.
pub trait LinkStatus {
    /// Cached connected flag re-validated against the live driver.
    fn is_link_up(&self) -> bool;

    /// Broker address for `port` on the current network, if any.
    fn broker_endpoint(&mut self, port: u16) -> Option<Ipv4Addr>;

    /// Drop a discovered broker address so the next lookup scans again.
    /// Fixed per-network endpoints are kept.
    fn forget_endpoint(&mut self) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub current_index: usize,
    pub connected: bool,
    pub last_attempt_ms: Option<u64>,
    pub consecutive_failures: u8,
}

/// Snapshot of the active link for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    pub ssid: heapless::String<32>,
    pub rssi: Option<i8>,
    pub address: Option<Ipv4Addr>,
}

pub struct NetworkConnector<W, C, P> {
    driver: W,
    clock: C,
    probe: P,
    candidates: CandidateTable,
    state: ConnectionState,
    /// Broker found by the last subnet scan, valid for the current link.
    discovered: Option<Ipv4Addr>,
}

impl<W: WifiDriver, C: Clock, P: EndpointProbe> NetworkConnector<W, C, P> {
    pub fn new(driver: W, clock: C, probe: P) -> Self {
        Self {
            driver,
            clock,
            probe,
            candidates: CandidateTable::new(),
            state: ConnectionState::default(),
            discovered: None,
        }
    }

    /// Store `credential` in `slot` (0 or 1), replacing any previous entry.
    pub fn register_candidate(
        &mut self,
        slot: usize,
        credential: NetworkCredential,
    ) -> Result<(), LinkError> {
        info!(
            "WiFi: slot {} = '{}'{}",
            slot,
            credential.ssid(),
            if credential.is_enterprise() { " (enterprise)" } else { "" }
        );
        self.candidates.register(slot, credential)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Cached connected flag. Only trustworthy right after
    /// [`check_connection`](Self::check_connection).
    pub fn is_connected(&self) -> bool {
        self.state.connected
    }

    /// The candidate the link is (or was last) associated with.
    pub fn active_candidate(&self) -> Option<&NetworkCredential> {
        self.candidates.get(self.state.current_index)
    }

    /// Bring the link up, trying each candidate once per cycle.
    pub fn connect(&mut self) -> Result<(), LinkError> {
        if self.state.connected && self.driver.is_connected() {
            return Ok(());
        }
        self.state.connected = false;

        let now = self.clock.now_ms();
        if let Some(last) = self.state.last_attempt_ms {
            if now.saturating_sub(last) < LINK_RETRY_COOLDOWN_MS {
                debug!("WiFi: cool-down active, skipping attempt");
                return Err(LinkError::CoolingDown);
            }
        }
        if self.candidates.is_empty() {
            warn!("WiFi: no candidate networks configured");
            return Err(LinkError::NoCandidates);
        }
        self.state.last_attempt_ms = Some(now);

        let start = self.state.current_index;
        let rotation: heapless::Vec<usize, { crate::net::credentials::MAX_CANDIDATES }> =
            self.candidates.rotation(start).map(|(idx, _)| idx).collect();

        for idx in rotation {
            if self.attempt(idx) {
                if idx != self.state.current_index {
                    self.discovered = None;
                }
                self.state.current_index = idx;
                self.state.connected = true;
                self.state.consecutive_failures = 0;
                if let Some(ip) = self.driver.ip_info() {
                    info!("WiFi: IP address {}", ip.address);
                }
                return Ok(());
            }
        }

        self.state.consecutive_failures = self.state.consecutive_failures.saturating_add(1);
        warn!(
            "WiFi: all candidates failed ({}/{})",
            self.state.consecutive_failures, LINK_RETRY_CEILING
        );
        if self.state.consecutive_failures >= LINK_RETRY_CEILING {
            error!("WiFi: max retry count reached, requesting restart");
            self.state.consecutive_failures = 0;
            return Err(LinkError::RetryCeilingExceeded);
        }
        Err(LinkError::ConnectTimeout)
    }

    /// One association attempt with a bounded busy-wait.
    fn attempt(&mut self, idx: usize) -> bool {
        let Some(credential) = self.candidates.get(idx) else {
            return false;
        };
        info!("WiFi: connecting to '{}'", credential.ssid());

        if let Err(e) = self.driver.begin(credential) {
            warn!("WiFi: '{}' rejected by driver ({:?})", credential.ssid(), e);
            return false;
        }

        let deadline = self.clock.now_ms().saturating_add(LINK_CONNECT_TIMEOUT_MS);
        loop {
            if self.driver.is_connected() {
                info!("WiFi: connected to '{}'", credential.ssid());
                return true;
            }
            if self.clock.now_ms() >= deadline {
                break;
            }
            self.clock.delay_ms(LINK_POLL_INTERVAL_MS);
        }

        warn!("WiFi: failed to connect to '{}'", credential.ssid());
        self.driver.disconnect();
        false
    }

    /// Re-read the live link; clears connected state on a silent drop.
    ///
    /// Never marks the link up: only [`connect`](Self::connect) knows which
    /// candidate was joined.
    pub fn check_connection(&mut self) -> bool {
        if self.state.connected && self.driver.is_connected() {
            return true;
        }
        if self.state.connected {
            warn!("WiFi: connection lost");
        }
        self.state.connected = false;
        self.discovered = None;
        false
    }

    pub fn disconnect(&mut self) {
        self.driver.disconnect();
        self.state.connected = false;
        self.discovered = None;
        info!("WiFi: disconnected");
    }

    /// Broker address for this network: fixed endpoint, else cached scan
    /// result, else a fresh scan.
    pub fn current_endpoint(&mut self, port: u16) -> Option<Ipv4Addr> {
        if let Some(addr) = self.active_candidate().and_then(NetworkCredential::endpoint) {
            return Some(addr);
        }
        if self.discovered.is_some() {
            return self.discovered;
        }
        self.discovered = self.scan_for_endpoint(port);
        self.discovered
    }

    /// Probe the gateway, then the low host range of the subnet, for a
    /// listener on `port`.
    pub fn scan_for_endpoint(&mut self, port: u16) -> Option<Ipv4Addr> {
        let Some(ip) = self.driver.ip_info() else {
            warn!("WiFi: no IP configuration, cannot scan for broker");
            return None;
        };
        info!("WiFi: scanning {}/{} for port {}", ip.address, ip.netmask, port);

        let found = discovery::probe_order(&ip)
            .find(|addr| self.probe.accepts(SocketAddrV4::new(*addr, port), ENDPOINT_PROBE_TIMEOUT_MS));

        match found {
            Some(addr) => info!("WiFi: broker found at {}:{}", addr, port),
            None => warn!("WiFi: no broker answered on port {}", port),
        }
        found
    }

    pub fn link_info(&self) -> LinkInfo {
        let mut ssid = heapless::String::new();
        if self.state.connected {
            if let Some(c) = self.active_candidate() {
                let _ = ssid.push_str(c.ssid());
            }
        }
        LinkInfo {
            ssid,
            rssi: self.driver.rssi(),
            address: self.driver.ip_info().map(|ip| ip.address),
        }
    }

    pub fn driver(&self) -> &W {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut W {
        &mut self.driver
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }
}

impl<W: WifiDriver, C: Clock, P: EndpointProbe> LinkStatus for NetworkConnector<W, C, P> {
    fn is_link_up(&self) -> bool {
        self.state.connected && self.driver.is_connected()
    }

    fn broker_endpoint(&mut self, port: u16) -> Option<Ipv4Addr> {
        self.current_endpoint(port)
    }

    fn forget_endpoint(&mut self) {
        if let Some(addr) = self.discovered.take() {
            info!("WiFi: forgetting discovered broker {}", addr);
        }
    }
}

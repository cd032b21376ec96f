//! Runtime diagnostics.
//!
//! A [`StatusReport`] is published on the diagnostics topic every
//! `status_interval_secs`. It captures link quality, session state and
//! delivery counters so a broker-side dashboard can spot a struggling node
//! without a serial cable.

use core::fmt::Write;
use core::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::bus::session::SessionState;
use crate::net::connector::LinkInfo;

pub type AddressText = heapless::String<16>;

/// Delivery counters kept by the node service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCounters {
    pub published: u32,
    pub failed: u32,
    pub commands: u32,
}

/// Runtime diagnostics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub uptime_secs: u64,
    pub ssid: heapless::String<32>,
    pub rssi: Option<i8>,
    pub address: Option<AddressText>,
    pub broker: Option<AddressText>,
    /// Numeric session code, `0` when connected.
    pub session_code: i8,
    pub session: heapless::String<32>,
    pub telemetry_enabled: bool,
    pub counters: DeliveryCounters,
    pub heap_free: Option<u32>,
}

fn address_text(addr: Ipv4Addr) -> AddressText {
    let mut s = AddressText::new();
    // "255.255.255.255" is 15 bytes.
    let _ = write!(s, "{addr}");
    s
}

impl StatusReport {
    pub fn collect(
        uptime_ms: u64,
        link: &LinkInfo,
        broker: Option<Ipv4Addr>,
        session: SessionState,
        telemetry_enabled: bool,
        counters: DeliveryCounters,
    ) -> Self {
        let mut session_text = heapless::String::new();
        let _ = write!(session_text, "{session}");

        Self {
            uptime_secs: uptime_ms / 1000,
            ssid: link.ssid.clone(),
            rssi: link.rssi,
            address: link.address.map(address_text),
            broker: broker.map(address_text),
            session_code: session.code(),
            session: session_text,
            telemetry_enabled,
            counters,
            heap_free: heap_free(),
        }
    }

    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(target_os = "espidf")]
fn heap_free() -> Option<u32> {
    // SAFETY: plain read of the allocator's free counter.
    Some(unsafe { esp_idf_svc::sys::esp_get_free_heap_size() })
}

#[cfg(not(target_os = "espidf"))]
fn heap_free() -> Option<u32> {
    None
}

// ───────────────────────────────────────────────────────────────
// Panic hook
// ───────────────────────────────────────────────────────────────

/// Install a panic hook that routes the panic message through `log`
/// before the default handler aborts.
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };
        match info.location() {
            Some(loc) => log::error!("PANIC: {} at {}:{}", reason, loc.file(), loc.line()),
            None => log::error!("PANIC: {}", reason),
        }
    }));
}

//! Randomised MQTT client identity.
//!
//! A fresh id per session keeps a rebooted device from being kicked by its
//! own half-open previous session on the broker.

use core::fmt::Write;

pub const CLIENT_ID_PREFIX: &str = "ESP32Client-";

pub type ClientId = heapless::String<32>;

/// `prefix` followed by `suffix` in lowercase hex, e.g. `ESP32Client-3fa2`.
pub fn client_id(prefix: &str, suffix: u16) -> ClientId {
    let mut id = ClientId::new();
    let _ = write!(id, "{prefix}{suffix:x}");
    id
}

/// 16 bits from the hardware RNG.
#[cfg(target_os = "espidf")]
pub fn random_u16() -> u16 {
    // SAFETY: esp_random reads the hardware RNG register; no preconditions.
    (unsafe { esp_idf_svc::sys::esp_random() } & 0xFFFF) as u16
}

/// Simulation stub using `RandomState` for non-cryptographic entropy.
#[cfg(not(target_os = "espidf"))]
pub fn random_u16() -> u16 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    (RandomState::new().build_hasher().finish() & 0xFFFF) as u16
}

//! Build-time network secrets.
//!
//! Read from the environment at compile time so credentials never live in
//! the source tree:
//!
//! | Variable               | Slot | Meaning                                 |
//! |------------------------|------|-----------------------------------------|
//! | `GARDEN_WIFI1_SSID`    | 0    | primary network                         |
//! | `GARDEN_WIFI1_IDENTITY`| 0    | set ⇒ WPA2-Enterprise                   |
//! | `GARDEN_WIFI1_PASSWORD`| 0    |                                         |
//! | `GARDEN_MQTT_SERVER1`  | 0    | broker IPv4 on that network (optional)  |
//! | `GARDEN_WIFI2_SSID`    | 1    | fallback network                        |
//! | `GARDEN_WIFI2_PASSWORD`| 1    |                                         |
//! | `GARDEN_MQTT_SERVER2`  | 1    | broker IPv4 on that network (optional)  |
//!
//! A slot whose SSID is unset or empty stays empty. Without an explicit
//! broker address the connector scans the subnet.

use core::net::Ipv4Addr;

use log::warn;

use crate::error::CredentialError;
use crate::net::credentials::{MAX_CANDIDATES, NetworkCredential};

/// Raw strings for one slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotSecrets {
    pub ssid: Option<&'static str>,
    pub identity: Option<&'static str>,
    pub password: Option<&'static str>,
    pub broker: Option<&'static str>,
}

pub const PRIMARY: SlotSecrets = SlotSecrets {
    ssid: option_env!("GARDEN_WIFI1_SSID"),
    identity: option_env!("GARDEN_WIFI1_IDENTITY"),
    password: option_env!("GARDEN_WIFI1_PASSWORD"),
    broker: option_env!("GARDEN_MQTT_SERVER1"),
};

pub const FALLBACK: SlotSecrets = SlotSecrets {
    ssid: option_env!("GARDEN_WIFI2_SSID"),
    identity: None,
    password: option_env!("GARDEN_WIFI2_PASSWORD"),
    broker: option_env!("GARDEN_MQTT_SERVER2"),
};

impl SlotSecrets {
    /// Turn the slot into a credential, or `None` when no SSID is set.
    pub fn credential(&self) -> Result<Option<NetworkCredential>, CredentialError> {
        let Some(ssid) = self.ssid.filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let password = self.password.unwrap_or("");

        let mut credential = match self.identity.filter(|s| !s.is_empty()) {
            Some(identity) => NetworkCredential::enterprise(ssid, identity, password)?,
            None => NetworkCredential::open(ssid, password)?,
        };

        if let Some(raw) = self.broker.filter(|s| !s.is_empty()) {
            match raw.parse::<Ipv4Addr>() {
                Ok(addr) => credential = credential.with_endpoint(addr),
                Err(_) => warn!("secrets: broker address '{}' for '{}' is not IPv4, will scan", raw, ssid),
            }
        }
        Ok(Some(credential))
    }
}

/// Credentials for every configured slot, in slot order.
pub fn candidates() -> Result<heapless::Vec<(usize, NetworkCredential), MAX_CANDIDATES>, CredentialError> {
    let mut out = heapless::Vec::new();
    for (slot, secrets) in [PRIMARY, FALLBACK].iter().enumerate() {
        if let Some(credential) = secrets.credential()? {
            // Two slots, two entries at most.
            let _ = out.push((slot, credential));
        }
    }
    Ok(out)
}

//! WiFi station-mode adapter.
//!
//! Implements [`WifiDriver`], the radio side of the link. The adapter only
//! issues requests and reports status; polling, timeouts and failover are
//! owned by [`NetworkConnector`](crate::net::connector::NetworkConnector).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::EspWifi`, plus the
//!   EAP client sys calls for WPA2-Enterprise.
//! - **all other targets**: simulation stub for host-side tests.

use core::net::Ipv4Addr;

use log::{info, warn};

use crate::app::ports::{DriverError, IpInfo, WifiDriver};
use crate::net::credentials::NetworkCredential;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    sys::EspError,
    wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi},
};

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), DriverError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(DriverError::InvalidConfiguration);
    }
    Ok(())
}

/// Empty (open network) or 8–64 bytes (WPA2-Personal).
fn validate_psk(password: &str) -> Result<(), DriverError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(DriverError::InvalidConfiguration);
    }
    Ok(())
}

fn validate(credential: &NetworkCredential) -> Result<(), DriverError> {
    match credential {
        NetworkCredential::Open { ssid, password, .. } => {
            validate_ssid(ssid)?;
            validate_psk(password)
        }
        NetworkCredential::Enterprise {
            ssid,
            identity,
            password,
            ..
        } => {
            validate_ssid(ssid)?;
            if identity.is_empty() || password.is_empty() {
                return Err(DriverError::InvalidConfiguration);
            }
            Ok(())
        }
    }
}

/// Dotted netmask for a CIDR prefix length.
pub(super) fn prefix_to_netmask(prefix: u8) -> Ipv4Addr {
    let bits = u32::MAX.checked_shl(32 - u32::from(prefix.min(32))).unwrap_or(0);
    Ipv4Addr::from(bits)
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    /// Simulation: SSIDs that will accept an association.
    #[cfg(not(target_os = "espidf"))]
    sim_reachable: Vec<heapless::String<32>>,
    #[cfg(not(target_os = "espidf"))]
    sim_current: Option<heapless::String<32>>,
}

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Self, EspError> {
        let wifi = EspWifi::new(modem, sysloop, Some(nvs))?;
        info!("WiFi: station driver created");
        Ok(Self { wifi })
    }

    fn configure(&mut self, credential: &NetworkCredential) -> Result<(), DriverError> {
        use esp_idf_svc::sys::{
            ESP_OK, esp_eap_client_set_identity, esp_err_t, esp_eap_client_set_password,
            esp_eap_client_set_username, esp_wifi_sta_enterprise_disable,
            esp_wifi_sta_enterprise_enable,
        };

        let (auth_method, password) = match credential {
            NetworkCredential::Open { password, .. } if password.is_empty() => (AuthMethod::None, ""),
            NetworkCredential::Open { password, .. } => (AuthMethod::WPA2Personal, password.as_str()),
            NetworkCredential::Enterprise { .. } => (AuthMethod::WPA2Enterprise, ""),
        };

        let client = ClientConfiguration {
            ssid: credential
                .ssid()
                .try_into()
                .map_err(|_| DriverError::InvalidConfiguration)?,
            password: password.try_into().map_err(|_| DriverError::InvalidConfiguration)?,
            auth_method,
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::Client(client))
            .map_err(|e| {
                warn!("WiFi: set_configuration failed ({})", e);
                DriverError::InvalidConfiguration
            })?;

        // SAFETY: the EAP client copies the buffers; called from the single
        // control task with the driver configured in STA mode.
        let ret = unsafe {
            match credential {
                NetworkCredential::Enterprise {
                    identity, password, ..
                } => {
                    let mut rc = esp_eap_client_set_identity(identity.as_ptr(), identity.len() as i32);
                    if rc == ESP_OK as esp_err_t {
                        rc = esp_eap_client_set_username(identity.as_ptr(), identity.len() as i32);
                    }
                    if rc == ESP_OK as esp_err_t {
                        rc = esp_eap_client_set_password(password.as_ptr(), password.len() as i32);
                    }
                    if rc == ESP_OK as esp_err_t {
                        rc = esp_wifi_sta_enterprise_enable();
                    }
                    rc
                }
                NetworkCredential::Open { .. } => {
                    // Not an error if enterprise mode was never enabled.
                    let _ = esp_wifi_sta_enterprise_disable();
                    ESP_OK as esp_err_t
                }
            }
        };
        if ret != ESP_OK as esp_err_t {
            warn!("WiFi: EAP client setup failed ({})", ret);
            return Err(DriverError::InvalidConfiguration);
        }
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
impl WifiDriver for WifiAdapter {
    fn begin(&mut self, credential: &NetworkCredential) -> Result<(), DriverError> {
        validate(credential)?;
        let _ = self.wifi.disconnect();
        self.configure(credential)?;

        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(|e| {
                warn!("WiFi: radio start failed ({})", e);
                DriverError::RadioFailure
            })?;
        }
        self.wifi.connect().map_err(|e| {
            warn!("WiFi: connect request failed ({})", e);
            DriverError::RadioFailure
        })
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false) && self.ip_info().is_some()
    }

    fn disconnect(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi: disconnect failed ({})", e);
        }
    }

    fn ip_info(&self) -> Option<IpInfo> {
        let info = self.wifi.sta_netif().get_ip_info().ok()?;
        if info.ip.is_unspecified() {
            return None;
        }
        Some(IpInfo {
            address: info.ip,
            gateway: info.subnet.gateway,
            netmask: prefix_to_netmask(info.subnet.mask.0),
        })
    }

    fn rssi(&self) -> Option<i8> {
        use esp_idf_svc::sys::{ESP_OK, esp_err_t, esp_wifi_sta_get_ap_info, wifi_ap_record_t};
        // SAFETY: all-zero is a valid record; the call fills a caller-owned
        // record and fails cleanly when not associated.
        let mut ap_info: wifi_ap_record_t = unsafe { core::mem::zeroed() };
        let ret = unsafe { esp_wifi_sta_get_ap_info(&mut ap_info) };
        if ret == ESP_OK as esp_err_t { Some(ap_info.rssi) } else { None }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    pub fn new() -> Self {
        Self {
            sim_reachable: Vec::new(),
            sim_current: None,
        }
    }

    /// Simulation: let associations to `ssid` succeed.
    pub fn sim_set_reachable(&mut self, ssid: &str) {
        let mut s = heapless::String::new();
        if s.push_str(ssid).is_ok() {
            self.sim_reachable.push(s);
        }
    }

    /// Simulation: drop the current association as if the AP vanished.
    pub fn sim_drop_link(&mut self) {
        if let Some(ssid) = self.sim_current.take() {
            self.sim_reachable.retain(|s| *s != ssid);
            warn!("WiFi(sim): link to '{}' dropped", ssid);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiDriver for WifiAdapter {
    fn begin(&mut self, credential: &NetworkCredential) -> Result<(), DriverError> {
        validate(credential)?;
        self.sim_current = None;
        if self.sim_reachable.iter().any(|s| s.as_str() == credential.ssid()) {
            let mut s = heapless::String::new();
            let _ = s.push_str(credential.ssid());
            self.sim_current = Some(s);
            info!("WiFi(sim): associated with '{}'", credential.ssid());
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.sim_current.is_some()
    }

    fn disconnect(&mut self) {
        self.sim_current = None;
    }

    fn ip_info(&self) -> Option<IpInfo> {
        self.sim_current.as_ref().map(|_| IpInfo {
            address: Ipv4Addr::new(192, 168, 4, 23),
            gateway: Ipv4Addr::new(192, 168, 4, 1),
            netmask: prefix_to_netmask(24),
        })
    }

    fn rssi(&self) -> Option<i8> {
        self.sim_current.as_ref().map(|_| -60)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

//! One-shot ADC bring-up for the analog gas channel.
//!
//! Configures ADC1 in oneshot mode using raw ESP-IDF sys calls. Called once
//! from the sensor adapter's `begin()` before the loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ── Error type ────────────────────────────────────────────────

/// Errors during ADC initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcUnitFailed(i32),
    AdcChannelFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcUnitFailed(rc)    => write!(f, "ADC1 unit init failed (rc={})", rc),
            Self::AdcChannelFailed(rc) => write!(f, "ADC1 channel config failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::error::SensorError {
    fn from(_: HwInitError) -> Self {
        Self::AdcInitFailed
    }
}

#[cfg(target_os = "espidf")]
use log::info;

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only after `init_adc()` from the single-threaded
/// main loop.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

/// Create the ADC1 unit (once) and configure `channel` for 12-bit reads.
#[cfg(target_os = "espidf")]
pub fn init_adc(channel: u32) -> Result<(), HwInitError> {
    // SAFETY: ADC1_HANDLE is only written here, on the init path, before the
    // loop starts reading.
    unsafe {
        if adc1_handle().is_null() {
            let init_cfg = adc_oneshot_unit_init_cfg_t {
                unit_id: adc_unit_t_ADC_UNIT_1,
                ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..Default::default()
            };
            let ret = adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE);
            if ret != ESP_OK as esp_err_t { return Err(HwInitError::AdcUnitFailed(ret)); }
        }

        let chan_cfg = adc_oneshot_chan_cfg_t {
            atten: crate::pins::MQ8_ADC_ATTEN,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        let ret = adc_oneshot_config_channel(adc1_handle(), channel, &chan_cfg);
        if ret != ESP_OK as esp_err_t { return Err(HwInitError::AdcChannelFailed(ret)); }
    }

    info!("hw_init: ADC1 CH{} configured", channel);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_adc(channel: u32) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ADC1 CH{} init skipped", channel);
    Ok(())
}

/// One raw 12-bit sample, `None` if the read failed.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Option<u16> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract, single-threaded main-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as esp_err_t {
        return None;
    }
    Some(raw.clamp(0, 4095) as u16)
}

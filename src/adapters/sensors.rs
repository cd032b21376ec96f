//! Sensor adapter bridging the analog front end to [`SensorPort`].
//!
//! Only the MQ-8 hydrogen channel is wired to an on-chip peripheral; the
//! other telemetry channels stay `None` until their bus drivers are
//! attached, and are published as `null`.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1 via the oneshot API (initialised by `hw_init`).
//! On host/test: reads a per-instance injected value.

use log::{info, warn};

use crate::app::ports::SensorPort;
use crate::drivers::hw_init;
use crate::error::SensorError;
use crate::pins;
use crate::telemetry::TelemetryRecord;

pub struct SensorHub {
    adc_channel: u32,
    ready: bool,
    total_reads: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_hydrogen_raw: Option<u16>,
}

impl Default for SensorHub {
    fn default() -> Self {
        Self::new(pins::MQ8_ADC_CHANNEL)
    }
}

impl SensorHub {
    pub fn new(adc_channel: u32) -> Self {
        Self {
            adc_channel,
            ready: false,
            total_reads: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_hydrogen_raw: Some(0),
        }
    }

    /// Simulation: value the next reads return; `None` simulates a failed
    /// conversion.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_hydrogen_raw(&mut self, raw: Option<u16>) {
        self.sim_hydrogen_raw = raw;
    }

    pub fn total_reads(&self) -> u32 {
        self.total_reads
    }

    #[cfg(target_os = "espidf")]
    fn read_hydrogen_raw(&self) -> Option<u16> {
        hw_init::adc1_read(self.adc_channel)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_hydrogen_raw(&self) -> Option<u16> {
        self.sim_hydrogen_raw
    }
}

impl SensorPort for SensorHub {
    fn begin(&mut self) -> Result<(), SensorError> {
        if let Err(e) = hw_init::init_adc(self.adc_channel) {
            warn!("sensors: {}", e);
            return Err(e.into());
        }
        self.ready = true;
        info!("sensors: MQ-8 on ADC1 CH{} ready", self.adc_channel);
        Ok(())
    }

    fn read(&mut self) -> TelemetryRecord {
        self.total_reads = self.total_reads.wrapping_add(1);
        if !self.ready {
            return TelemetryRecord::default();
        }

        let raw = self.read_hydrogen_raw();
        if raw.is_none() {
            warn!("sensors: MQ-8 read failed");
        }
        TelemetryRecord {
            hydrogen_raw: raw,
            hydrogen_voltage: raw.map(TelemetryRecord::hydrogen_voltage_from_raw),
            ..TelemetryRecord::default()
        }
    }
}

//! Telemetry record and its wire encoding.
//!
//! The record is a flat JSON object with fixed field names. A channel that
//! failed to read is `None` and goes on the wire as `null`; the rest of the
//! record is still published.

use serde::{Deserialize, Serialize};

/// One sensor sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Soil probe temperature (°C).
    pub soil_temperature: Option<f32>,
    /// Soil probe capacitive reading (raw counts).
    pub soil_moisture: Option<u16>,
    /// Air temperature (°C).
    pub air_temperature: Option<f32>,
    /// Relative humidity (%).
    pub humidity: Option<f32>,
    /// MQ-8 hydrogen sensor ADC counts.
    pub hydrogen_raw: Option<u16>,
    /// MQ-8 output voltage.
    pub hydrogen_voltage: Option<f32>,
    /// Equivalent CO2 (ppm).
    pub co2: Option<u16>,
    /// Total volatile organic compounds (ppb).
    pub tvoc: Option<u16>,
    /// mmWave radar target count.
    pub target_count: Option<u8>,
    /// Speed of the nearest target (m/s).
    pub target_speed: Option<f32>,
    /// Range of the nearest target (m).
    pub target_distance: Option<f32>,
    /// Reflected energy of the nearest target.
    pub target_energy: Option<u16>,
    /// PM2.5 (µg/m³).
    pub pm25: Option<f32>,
    /// PM10 (µg/m³).
    pub pm10: Option<f32>,
}

/// 12-bit ADC full scale.
const ADC_FULL_SCALE: f32 = 4095.0;
/// Sensor supply referenced by the voltage conversion.
const ADC_REFERENCE_V: f32 = 5.0;

impl TelemetryRecord {
    /// Convert MQ-8 ADC counts to its output voltage.
    pub fn hydrogen_voltage_from_raw(raw: u16) -> f32 {
        f32::from(raw) * (ADC_REFERENCE_V / ADC_FULL_SCALE)
    }

    /// Encode as compact JSON.
    pub fn encode(&self) -> String {
        // Serialising a struct of plain numbers cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse a payload produced by [`encode`](Self::encode).
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Number of channels that produced a reading.
    pub fn valid_fields(&self) -> usize {
        [
            self.soil_temperature.is_some(),
            self.soil_moisture.is_some(),
            self.air_temperature.is_some(),
            self.humidity.is_some(),
            self.hydrogen_raw.is_some(),
            self.hydrogen_voltage.is_some(),
            self.co2.is_some(),
            self.tvoc.is_some(),
            self.target_count.is_some(),
            self.target_speed.is_some(),
            self.target_distance.is_some(),
            self.target_energy.is_some(),
            self.pm25.is_some(),
            self.pm10.is_some(),
        ]
        .into_iter()
        .filter(|v| *v)
        .count()
    }
}

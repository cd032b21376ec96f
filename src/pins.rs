//! GPIO / peripheral pin assignments for the garden sensor board.
//!
//! Every driver references this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Status LED
// ---------------------------------------------------------------------------

/// On-board LED, active HIGH.
pub const STATUS_LED_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Sensors: analog (ADC1)
// ---------------------------------------------------------------------------

/// MQ-8 hydrogen sensor analog output. ADC1 channel 6 (GPIO 34).
pub const MQ8_ADC_GPIO: i32 = 34;
/// ADC1 channel number for [`MQ8_ADC_GPIO`].
pub const MQ8_ADC_CHANNEL: u32 = 6;
/// 12 dB attenuation (`ADC_ATTEN_DB_12`, 0 – 3.1 V range).
pub const MQ8_ADC_ATTEN: u32 = 3;

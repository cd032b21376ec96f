//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements       | Connects to                 |
//! |------------|------------------|-----------------------------|
//! | `wifi`     | WifiDriver       | ESP-IDF WiFi STA (+ EAP)    |
//! | `mqtt`     | SessionTransport | ESP-IDF MQTT client         |
//! | `probe`    | EndpointProbe    | TCP connect (lwIP / host)   |
//! | `time`     | Clock            | ESP32 system timer          |
//! | `sensors`  | SensorPort       | ESP32 ADC1 oneshot          |
//! | `log_sink` | EventSink        | Serial log output           |

pub mod log_sink;
pub mod mqtt;
pub mod probe;
pub mod sensors;
pub mod time;
pub mod wifi;

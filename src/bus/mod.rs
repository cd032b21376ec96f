//! MQTT session layer on top of the WiFi link.

pub mod client;
pub mod identity;
pub mod session;

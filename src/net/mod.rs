//! WiFi link management: candidate networks, the connector and broker
//! discovery on the local subnet.

pub mod connector;
pub mod credentials;
pub mod discovery;

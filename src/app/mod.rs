//! Application core: connectivity orchestration without I/O.
//!
//! [`service::NodeService`] sequences link, session, telemetry and
//! indicator. All interaction with hardware happens through the **port
//! traits** in [`ports`], keeping this layer testable without a radio.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;

//! Garden sensor node firmware library.
//!
//! Exposes the connectivity core and its adapters for integration testing.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; host builds get simulation stubs.

#![deny(unused_must_use)]

pub mod app;
pub mod bus;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod net;
pub mod pins;
pub mod secrets;
pub mod telemetry;

pub mod adapters;
pub mod drivers;

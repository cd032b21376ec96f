//! Garden node firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  WifiAdapter     MqttTransport     TcpProbe     SystemClock  │
//! │  (WifiDriver)    (SessionTransport)(Probe)      (Clock)      │
//! │  SensorHub       LogEventSink      PinDriver (status LED)    │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ─────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                 NodeService (core)                     │  │
//! │  │  NetworkConnector · BusClient · LinkIndicator          │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{debug, error, info, warn};

use gardennode::adapters::log_sink::LogEventSink;
use gardennode::adapters::mqtt::MqttTransport;
use gardennode::adapters::probe::TcpProbe;
use gardennode::adapters::sensors::SensorHub;
use gardennode::adapters::time::SystemClock;
use gardennode::adapters::wifi::WifiAdapter;
use gardennode::app::ports::Clock;
use gardennode::app::service::{NodeService, TickOutcome};
use gardennode::config::NodeConfig;
use gardennode::drivers::watchdog::Watchdog;
use gardennode::{diagnostics, pins, secrets};

/// Pause between the restart request and the actual reset, so the log
/// line reaches the UART.
const RESTART_DELAY_MS: u32 = 1_000;
/// Retry period for the sensor initialisation gate.
const SENSOR_RETRY_MS: u32 = 1_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Garden node v{}                  ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    diagnostics::install_panic_handler();

    // ── 2. Configuration ──────────────────────────────────────
    let config = NodeConfig::default();
    config.validate().map_err(anyhow::Error::msg)?;
    let watchdog = Watchdog::new(config.watchdog_timeout_ms);

    // ── 3. Construct adapters ─────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let clock = SystemClock::new();
    let wifi = WifiAdapter::new(peripherals.modem, sysloop, nvs)?;
    // pins::STATUS_LED_GPIO
    let led = PinDriver::output(peripherals.pins.gpio2)?;
    let mut sensors = SensorHub::new(pins::MQ8_ADC_CHANNEL);
    let mut sink = LogEventSink::new();

    // ── 4. Construct node service ─────────────────────────────
    let mut node = NodeService::new(
        wifi,
        TcpProbe::new(),
        MqttTransport::new(),
        led,
        clock,
        config.clone(),
    )
    .map_err(anyhow::Error::msg)?;

    let candidates = secrets::candidates().map_err(anyhow::Error::msg)?;
    if candidates.is_empty() {
        warn!("No WiFi networks configured at build time (GARDEN_WIFI1_SSID / GARDEN_WIFI2_SSID)");
    }
    for (slot, credential) in candidates {
        node.connector_mut()
            .register_candidate(slot, credential)
            .map_err(anyhow::Error::msg)?;
    }

    // ── 5. Sensor initialisation gate ─────────────────────────
    while let Err(e) = node.start(&mut sensors, &mut sink) {
        warn!("Sensor init failed ({}), retrying", e);
        watchdog.feed();
        clock.delay_ms(SENSOR_RETRY_MS);
    }

    info!("System ready. Entering control loop.");

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        watchdog.feed();

        match node.tick(&mut sensors, &mut sink) {
            TickOutcome::RestartRequired => {
                error!("WiFi unrecoverable, restarting in {} ms", RESTART_DELAY_MS);
                clock.delay_ms(RESTART_DELAY_MS);
                // SAFETY: esp_restart never returns; nothing is held across it.
                unsafe { esp_idf_sys::esp_restart() };
            }
            outcome => debug!("tick: {:?}", outcome),
        }

        clock.delay_ms(config.loop_period_ms);
    }
}

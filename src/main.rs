//! AIPlant firmware entry point.
//!
//! Hexagonal architecture with a fixed-interval control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   LogEventSink   NvsAdapter   Esp32Time       │
//! │  (Sensor+Actuator) (EventSink)    (Config)     (TimePort)      │
//! │  BleLink                                                       │
//! │  (LinkPort)                                                    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            DeviceController (pure logic)               │    │
//! │  │  TransferBuffer · ModelStore · InferenceEngine · Policy│    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;

use aiplant::adapters::ble::BleLink;
use aiplant::adapters::hardware::HardwareAdapter;
use aiplant::adapters::log_sink::LogEventSink;
use aiplant::adapters::nvs::NvsAdapter;
use aiplant::adapters::time::Esp32TimeAdapter;
use aiplant::app::ports::{ActuatorPort, ConfigPort};
use aiplant::app::service::DeviceController;
use aiplant::config::SystemConfig;
use aiplant::drivers::adc::OneshotAdc;
use aiplant::drivers::pump::PumpDriver;
use aiplant::drivers::watchdog::Watchdog;
use aiplant::error::Error;
use aiplant::sensors::SensorHub;
use aiplant::sensors::moisture::MoistureSensor;
use aiplant::sensors::temperature::TemperatureSensor;
use aiplant::pins;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  AIPlant v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Initialise hardware peripherals ────────────────────
    let temp_adc = match OneshotAdc::new(pins::TEMP_ADC_CHANNEL) {
        Ok(adc) => adc,
        Err(e) => {
            error!("{}, halting", e);
            std::process::exit(Error::from(e).halt_code());
        }
    };
    let peripherals = Peripherals::take()?;
    let pump_pin = PinDriver::output(peripherals.pins.gpio2)?;
    info!("pump on GPIO{}", pins::PUMP_GPIO);

    // ── 3. Load config from NVS (or defaults) ─────────────────
    let config = match NvsAdapter::new() {
        Ok(nvs) => nvs.load().unwrap_or_else(|e| {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }),
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults", e);
            SystemConfig::default()
        }
    };
    let watchdog = Watchdog::new(config.watchdog_timeout_ms);

    // ── 4. Construct adapters ─────────────────────────────────
    let sensor_hub = SensorHub::new(
        MoistureSensor::new(core::time::Duration::from_secs(u64::from(
            config.moisture_dry_after_secs,
        ))),
        TemperatureSensor::new(temp_adc),
    );
    let mut hw = HardwareAdapter::new(sensor_hub, PumpDriver::new(pump_pin, FreeRtos));
    hw.all_off();

    let mut link = BleLink::new(&config.device_name);
    if let Err(e) = link.start() {
        error!("BLE start failed: {}, halting", e);
        std::process::exit(Error::Init("ble").halt_code());
    }

    let clock = Esp32TimeAdapter::new();
    let mut log_sink = LogEventSink::new();

    // ── 5. Construct controller ───────────────────────────────
    let mut controller: DeviceController = DeviceController::new(&config);
    controller.start(&mut log_sink);

    info!("System ready. Entering control loop.");

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        match controller.tick(&mut hw, &mut link, &clock, &mut log_sink) {
            Ok(_) => {}
            Err(e) => {
                error!("fatal: {}", e);
                hw.all_off();
                std::process::exit(e.halt_code());
            }
        }

        watchdog.feed();
        std::thread::sleep(config.control_loop_interval());
    }
}

//! End-to-end tests through the real adapters: the BLE callback bridge,
//! the simulated sensors, the pump driver and the config store.

use std::cell::RefCell;
use std::rc::Rc;

use crate::fixtures::threshold_image;
use crate::mock_hw::{MockClock, MockNvs, PinEvent, PinTrace, TraceDelay, TracePin};

use aiplant::adapters::ble::{BleLink, BleState, LinkShared, encode_reading};
use aiplant::adapters::hardware::HardwareAdapter;
use aiplant::adapters::log_sink::LogEventSink;
use aiplant::adapters::nvs::NvsAdapter;
use aiplant::app::ports::ConfigPort;
use aiplant::app::service::{Cycle, DeviceController};
use aiplant::config::SystemConfig;
use aiplant::drivers::adc::OneshotAdc;
use aiplant::drivers::pump::PumpDriver;
use aiplant::error::CommsError;
use aiplant::model::MARKER;
use aiplant::model::fragment::fragment_model;
use aiplant::pins;
use aiplant::sensors::SensorHub;
use aiplant::sensors::moisture::MoistureSensor;
use aiplant::sensors::temperature::{TemperatureSensor, Thermistor};

fn hardware(
    config: &SystemConfig,
) -> (HardwareAdapter<TracePin, TraceDelay>, PinTrace) {
    let trace = Rc::new(RefCell::new(Vec::new()));
    let hub = SensorHub::new(
        MoistureSensor::new(core::time::Duration::from_secs(u64::from(
            config.moisture_dry_after_secs,
        ))),
        TemperatureSensor::new(OneshotAdc::new(pins::TEMP_ADC_CHANNEL).unwrap()),
    );
    let pump = PumpDriver::new(TracePin(trace.clone()), TraceDelay(trace.clone()));
    (HardwareAdapter::new(hub, pump), trace)
}

#[test]
fn model_pushed_over_ble_waters_dry_soil_once() {
    static SHARED: LinkShared = LinkShared::new();

    let config = SystemConfig::default();
    let (mut hw, trace) = hardware(&config);
    let mut link = BleLink::with_shared(&config.device_name, &SHARED);
    link.start().unwrap();
    assert_eq!(link.state(), BleState::Advertising);

    let mut controller: DeviceController = DeviceController::new(&config);
    let mut sink = LogEventSink::new();
    controller.start(&mut sink);
    let clock = MockClock::at(10_000);

    // Not connected yet: the loop idles.
    assert_eq!(
        controller.tick(&mut hw, &mut link, &clock, &mut sink),
        Ok(Cycle::Disconnected)
    );

    SHARED.set_connected(true);
    for f in fragment_model(&threshold_image(), 512) {
        SHARED.on_model_write(&f).unwrap();
    }

    // Never watered: simulated soil reads dry, the model says water.
    let Ok(Cycle::Ran(first)) = controller.tick(&mut hw, &mut link, &clock, &mut sink) else {
        panic!("expected a cycle");
    };
    assert!(first.transfer_completed);
    assert_eq!(first.readings.moisture, 0.0);
    assert!(first.watered);
    assert_eq!(
        *trace.borrow(),
        vec![
            PinEvent::High,
            PinEvent::DelayMs(config.watering_duration_ms),
            PinEvent::Low
        ]
    );
    assert_eq!(SHARED.queued(), 0);
    let temperature = encode_reading(Thermistor::default().celsius(2048));
    assert_eq!(link.published(), ("0.00", temperature.as_str()));

    // Immediately afterwards the soil is saturated: no second watering.
    let Ok(Cycle::Ran(second)) = controller.tick(&mut hw, &mut link, &clock, &mut sink) else {
        panic!("expected a cycle");
    };
    assert_eq!(second.readings.moisture, 100.0);
    assert!(!second.water);
    assert_eq!(hw.pump().activations(), 1);
    assert!(!hw.pump().is_running());
    assert_eq!(link.published().0, "100.00");
}

#[test]
fn disconnect_discards_half_delivered_transfer() {
    static SHARED: LinkShared = LinkShared::new();

    SHARED.set_connected(true);
    SHARED.on_model_write(b"partial").unwrap();
    assert_eq!(SHARED.queued(), 1);

    SHARED.set_connected(false);
    assert_eq!(SHARED.queued(), 0);
    assert!(!SHARED.is_connected());
}

#[test]
fn callback_bridge_bounds_queue_and_fragment_size() {
    static SHARED: LinkShared = LinkShared::new();

    SHARED.set_connected(true);
    assert_eq!(
        SHARED.on_model_write(&[0u8; 513]),
        Err(CommsError::FragmentTooLong)
    );
    for _ in 0..aiplant::adapters::ble::FRAGMENT_QUEUE_DEPTH {
        SHARED.on_model_write(b"x").unwrap();
    }
    assert_eq!(
        SHARED.on_model_write(MARKER),
        Err(CommsError::FragmentQueueFull)
    );
}

#[test]
fn dropped_write_does_not_poison_the_next_transfer() {
    static SHARED: LinkShared = LinkShared::new();

    let config = SystemConfig::default();
    let (mut hw, _trace) = hardware(&config);
    let mut link = BleLink::with_shared(&config.device_name, &SHARED);
    let mut controller: DeviceController = DeviceController::new(&config);
    let mut sink = LogEventSink::new();
    let clock = MockClock::at(0);
    SHARED.set_connected(true);

    // First transfer starts, then floods the queue; its marker is lost.
    SHARED.on_model_write(b"stale").unwrap();
    controller
        .tick(&mut hw, &mut link, &clock, &mut sink)
        .unwrap();
    assert_eq!(controller.transfer().len(), 5);
    for _ in 0..aiplant::adapters::ble::FRAGMENT_QUEUE_DEPTH {
        SHARED.on_model_write(b"more").unwrap();
    }
    assert_eq!(
        SHARED.on_model_write(MARKER),
        Err(CommsError::FragmentQueueFull)
    );

    // The peer retries with a complete image.
    for f in fragment_model(&threshold_image(), 512) {
        SHARED.on_model_write(&f).unwrap();
    }
    let Ok(Cycle::Ran(report)) = controller.tick(&mut hw, &mut link, &clock, &mut sink) else {
        panic!("expected a cycle");
    };
    assert!(report.transfer_completed);
    assert!(controller.state().model_ready);
    assert_eq!(
        controller.store().image().unwrap().as_bytes(),
        threshold_image().as_slice()
    );
}

#[test]
fn stored_config_shapes_watering() {
    let nvs = MockNvs::default();
    let config = SystemConfig {
        watering_duration_ms: 1_250,
        ..Default::default()
    };
    nvs.save(&config).unwrap();
    let config = nvs.load().unwrap();

    let (mut hw, trace) = hardware(&config);
    let mut link = crate::mock_hw::MockLink::connected();
    link.push_all(&fragment_model(&threshold_image(), 512));
    let mut controller: DeviceController = DeviceController::new(&config);

    controller
        .tick(&mut hw, &mut link, &MockClock::at(0), &mut LogEventSink::new())
        .unwrap();
    assert!(trace.borrow().contains(&PinEvent::DelayMs(1_250)));
}

#[test]
fn nvs_round_trip_feeds_controller() {
    let nvs = NvsAdapter::new().unwrap();
    let config = SystemConfig {
        watering_duration_ms: 2_000,
        moisture_dry_after_secs: 60,
        ..Default::default()
    };
    nvs.save(&config).unwrap();
    assert_eq!(nvs.load().unwrap(), config);

    let controller: DeviceController = DeviceController::new(&nvs.load().unwrap());
    assert_eq!(controller.tick_count(), 0);
}

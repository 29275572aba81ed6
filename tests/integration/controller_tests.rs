//! Integration tests for the link → transfer → engine → policy → pump
//! pipeline driven through [`DeviceController::tick`].

use core::time::Duration;

use crate::fixtures::{stale_schema_image, threshold_image};
use crate::mock_hw::{ActuatorCall, MockClock, MockHardware, MockLink, RecordingSink};

use aiplant::app::events::AppEvent;
use aiplant::app::service::{Cycle, CycleReport, DeviceController};
use aiplant::config::SystemConfig;
use aiplant::error::{Error, InferenceError, LoadError, TransferError};
use aiplant::model::fragment::fragment_model;
use aiplant::model::{MARKER, Scores};

/// Small transfer buffer so overflow is cheap to provoke.
type Controller = DeviceController<256>;

fn make_controller() -> (Controller, RecordingSink) {
    let mut controller = Controller::new(&SystemConfig::default());
    let mut sink = RecordingSink::new();
    controller.start(&mut sink);
    (controller, sink)
}

fn ran(cycle: Result<Cycle, Error>) -> CycleReport {
    match cycle {
        Ok(Cycle::Ran(report)) => report,
        other => panic!("expected a completed cycle, got {:?}", other),
    }
}

// ── Start-up ──────────────────────────────────────────────────

#[test]
fn start_emits_started_and_leaves_state_clean() {
    let (controller, sink) = make_controller();
    assert_eq!(sink.events, vec![AppEvent::Started]);
    assert!(!controller.state().model_ready);
    assert!(!controller.state().is_halted());
    assert_eq!(controller.state().last_actuation_ms, None);
}

// ── No model ──────────────────────────────────────────────────

#[test]
fn without_model_every_cycle_reports_sentinel_and_never_waters() {
    let (mut controller, mut sink) = make_controller();
    let mut hw = MockHardware::new(5.0, 30.0);
    let mut link = MockLink::connected();
    let clock = MockClock::at(0);

    for _ in 0..3 {
        let report = ran(controller.tick(&mut hw, &mut link, &clock, &mut sink));
        assert_eq!(report.scores, Scores::DO_NOT_WATER);
        assert!(!report.water);
        clock.advance(1_000);
    }
    assert_eq!(hw.activations(), 0);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::InferenceFailed(_))),
        0,
        "missing model is not an inference failure"
    );
}

#[test]
fn readings_are_published_every_connected_cycle() {
    let (mut controller, mut sink) = make_controller();
    let mut hw = MockHardware::new(41.5, 19.25);
    let mut link = MockLink::connected();

    ran(controller.tick(&mut hw, &mut link, &MockClock::at(0), &mut sink));
    ran(controller.tick(&mut hw, &mut link, &MockClock::at(1_000), &mut sink));

    assert_eq!(link.published, vec![(41.5, 19.25), (41.5, 19.25)]);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ReadingsPublished(_))),
        2
    );
}

// ── Disconnected ──────────────────────────────────────────────

#[test]
fn disconnected_cycle_is_skipped_and_keeps_queued_fragments() {
    let (mut controller, mut sink) = make_controller();
    let mut hw = MockHardware::default();
    let mut link = MockLink::disconnected();
    link.push(b"AB");

    let cycle = controller.tick(&mut hw, &mut link, &MockClock::at(0), &mut sink);
    assert_eq!(cycle, Ok(Cycle::Disconnected));
    assert!(hw.moisture_reads.is_empty());
    assert!(hw.calls.is_empty());
    assert!(link.published.is_empty());
    assert_eq!(link.queue.len(), 1);
    assert_eq!(controller.tick_count(), 0);

    link.connected = true;
    ran(controller.tick(&mut hw, &mut link, &MockClock::at(0), &mut sink));
    assert!(link.queue.is_empty());
    assert_eq!(controller.transfer().as_bytes(), b"AB");
}

// ── Transfer reassembly ───────────────────────────────────────

#[test]
fn fragments_reassemble_in_arrival_order() {
    let (mut controller, mut sink) = make_controller();
    let mut hw = MockHardware::default();
    let mut link = MockLink::connected();
    for f in [&b"AB"[..], b"CD", b"EF", MARKER] {
        link.push(f);
    }

    let report = ran(controller.tick(&mut hw, &mut link, &MockClock::at(0), &mut sink));
    assert!(report.transfer_completed);
    assert_eq!(controller.store().image().unwrap().as_bytes(), b"ABCDEF");
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::TransferProgress { .. })),
        3
    );
    assert!(
        sink.events
            .contains(&AppEvent::ModelRejected(LoadError::Malformed("shorter than header")))
    );
}

#[test]
fn transfer_may_span_several_cycles() {
    let (mut controller, mut sink) = make_controller();
    let mut hw = MockHardware::new(10.0, 20.0);
    let mut link = MockLink::connected();
    let clock = MockClock::at(0);
    let frags = fragment_model(&threshold_image(), 8);
    let (first, rest) = frags.split_at(frags.len() / 2);

    link.push_all(first);
    let report = ran(controller.tick(&mut hw, &mut link, &clock, &mut sink));
    assert!(!report.transfer_completed);
    assert!(!controller.state().model_ready);

    link.push_all(rest);
    clock.advance(1_000);
    let report = ran(controller.tick(&mut hw, &mut link, &clock, &mut sink));
    assert!(report.transfer_completed);
    assert!(controller.state().model_ready);
    assert_eq!(
        controller.store().image().unwrap().as_bytes(),
        threshold_image().as_slice()
    );
}

#[test]
fn marker_alone_completes_an_empty_transfer() {
    let (mut controller, mut sink) = make_controller();
    let mut link = MockLink::connected();
    link.push(MARKER);

    let report = ran(controller.tick(
        &mut MockHardware::default(),
        &mut link,
        &MockClock::at(0),
        &mut sink,
    ));
    assert!(report.transfer_completed);
    assert!(controller.store().image().unwrap().is_empty());
    assert!(!controller.state().model_ready);
}

#[test]
fn marker_prefix_with_trailing_bytes_completes() {
    let (mut controller, mut sink) = make_controller();
    let mut link = MockLink::connected();
    link.push(b"XYZ");
    let mut tail = MARKER.to_vec();
    tail.extend_from_slice(b"garbage");
    link.push(&tail);

    ran(controller.tick(
        &mut MockHardware::default(),
        &mut link,
        &MockClock::at(0),
        &mut sink,
    ));
    assert_eq!(controller.store().image().unwrap().as_bytes(), b"XYZ");
}

// ── Model load and watering ───────────────────────────────────

#[test]
fn model_loaded_mid_cycle_drives_that_cycles_decision() {
    let (mut controller, mut sink) = make_controller();
    let mut hw = MockHardware::new(10.0, 21.0);
    let mut link = MockLink::connected();
    let clock = MockClock::at(7_000);
    link.push_all(&fragment_model(&threshold_image(), 20));

    let report = ran(controller.tick(&mut hw, &mut link, &clock, &mut sink));
    assert!(report.transfer_completed);
    assert!(report.scores.water > report.scores.stay);
    assert!(report.water);
    assert!(report.watered);

    let cfg = SystemConfig::default();
    assert_eq!(hw.calls, vec![ActuatorCall::Activate(cfg.watering_duration())]);
    assert_eq!(controller.state().last_actuation_ms, Some(7_000));
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::ModelLoaded(info) if info.layers == 1
    )));
    assert!(sink.events.contains(&AppEvent::Watered {
        duration_ms: cfg.watering_duration_ms,
        at_ms: 7_000,
    }));
}

#[test]
fn failed_pass_skips_watering_and_keeps_the_model() {
    let (mut controller, mut sink) = make_controller();
    let mut hw = MockHardware::new(60.0, 21.0);
    let mut link = MockLink::connected();
    let clock = MockClock::at(0);
    link.push_all(&fragment_model(&threshold_image(), 20));
    let loaded = ran(controller.tick(&mut hw, &mut link, &clock, &mut sink));
    assert!(loaded.transfer_completed);
    assert!(!loaded.water);

    // Dry soil, but the sensor returns garbage this cycle.
    hw.moisture = f32::NAN;
    clock.advance(1_000);
    let failed = ran(controller.tick(&mut hw, &mut link, &clock, &mut sink));
    assert_eq!(failed.scores, Scores::DO_NOT_WATER);
    assert!(!failed.water);
    assert!(!failed.watered);
    assert!(sink
        .events
        .contains(&AppEvent::InferenceFailed(InferenceError::ExecutionFailed)));
    assert!(sink.events.contains(&AppEvent::Decision {
        scores: Scores::DO_NOT_WATER,
        water: false,
    }));
    assert_eq!(hw.activations(), 0);
    assert!(controller.state().model_ready);
    assert!(!controller.state().is_halted());

    // The next sane reading is decided by the same model.
    hw.moisture = 10.0;
    clock.advance(1_000);
    let recovered = ran(controller.tick(&mut hw, &mut link, &clock, &mut sink));
    assert!(!recovered.transfer_completed);
    assert!(recovered.water);
    assert!(recovered.watered);
    assert_eq!(hw.activations(), 1);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ModelLoaded(_))), 1);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::InferenceFailed(_))),
        1
    );
}

#[test]
fn elapsed_time_since_watering_reaches_the_sensor() {
    let (mut controller, mut sink) = make_controller();
    let mut hw = MockHardware::new(10.0, 21.0);
    let mut link = MockLink::connected();
    let clock = MockClock::at(1_000);
    link.push_all(&fragment_model(&threshold_image(), 512));

    ran(controller.tick(&mut hw, &mut link, &clock, &mut sink));
    hw.moisture = 90.0;
    clock.advance(5_000);
    let report = ran(controller.tick(&mut hw, &mut link, &clock, &mut sink));

    assert_eq!(
        hw.moisture_reads,
        vec![None, Some(Duration::from_millis(5_000))]
    );
    assert!(!report.water, "wet soil must not be watered");
    assert_eq!(hw.activations(), 1);
    assert_eq!(controller.state().last_actuation_ms, Some(1_000));
}

#[test]
fn wet_soil_is_left_alone() {
    let (mut controller, mut sink) = make_controller();
    let mut hw = MockHardware::new(85.0, 24.0);
    let mut link = MockLink::connected();
    link.push_all(&fragment_model(&threshold_image(), 64));

    let report = ran(controller.tick(&mut hw, &mut link, &MockClock::at(0), &mut sink));
    assert!(report.scores.stay > report.scores.water);
    assert!(!report.water);
    assert!(hw.calls.is_empty());
    assert_eq!(controller.state().last_actuation_ms, None);
}

#[test]
fn repeated_cycles_with_same_inputs_decide_identically() {
    let (mut controller, mut sink) = make_controller();
    let mut hw = MockHardware::new(39.0, 22.0);
    let mut link = MockLink::connected();
    link.push_all(&fragment_model(&threshold_image(), 512));
    let clock = MockClock::at(0);

    let a = ran(controller.tick(&mut hw, &mut link, &clock, &mut sink));
    let b = ran(controller.tick(&mut hw, &mut link, &clock, &mut sink));
    assert_eq!(a.scores, b.scores);
    assert_eq!(a.water, b.water);
}

// ── Rejected models ───────────────────────────────────────────

#[test]
fn stale_schema_is_rejected_and_previous_model_keeps_running() {
    let (mut controller, mut sink) = make_controller();
    let mut hw = MockHardware::new(85.0, 22.0);
    let mut link = MockLink::connected();
    let clock = MockClock::at(0);

    link.push_all(&fragment_model(&threshold_image(), 512));
    let before = ran(controller.tick(&mut hw, &mut link, &clock, &mut sink));

    link.push_all(&fragment_model(&stale_schema_image(), 512));
    let after = ran(controller.tick(&mut hw, &mut link, &clock, &mut sink));

    assert!(after.transfer_completed);
    assert!(controller.state().model_ready);
    assert_eq!(before.scores, after.scores);
    assert!(!after.water);
    assert!(sink.events.contains(&AppEvent::ModelRejected(
        LoadError::SchemaMismatch {
            found: 2,
            expected: 3,
        }
    )));
}

#[test]
fn corrupt_first_model_leaves_device_without_model() {
    let (mut controller, mut sink) = make_controller();
    let mut hw = MockHardware::new(5.0, 22.0);
    let mut link = MockLink::connected();
    let mut image = threshold_image();
    image.truncate(image.len() - 3);
    link.push_all(&fragment_model(&image, 512));

    let report = ran(controller.tick(&mut hw, &mut link, &MockClock::at(0), &mut sink));
    assert!(!controller.state().model_ready);
    assert_eq!(report.scores, Scores::DO_NOT_WATER);
    assert_eq!(hw.activations(), 0);
}

// ── Overflow halt ─────────────────────────────────────────────

#[test]
fn overflow_halts_with_code_3_and_stays_halted() {
    let (mut controller, mut sink) = make_controller();
    let mut hw = MockHardware::new(5.0, 22.0);
    let mut link = MockLink::connected();
    let clock = MockClock::at(0);
    link.push(&[0xAA; 200]);
    link.push(&[0xBB; 100]);
    link.push(MARKER);

    let err = controller
        .tick(&mut hw, &mut link, &clock, &mut sink)
        .unwrap_err();
    assert_eq!(
        err,
        Error::Transfer(TransferError::Overflow {
            size: 200,
            incoming: 100,
            capacity: 256,
        })
    );
    assert_eq!(err.halt_code(), 3);
    assert!(controller.state().is_halted());
    assert!(hw.calls.is_empty(), "no watering decision after overflow");
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Halted(_))), 1);

    let reads = hw.moisture_reads.len();
    let published = link.published.len();
    for _ in 0..3 {
        assert_eq!(
            controller.tick(&mut hw, &mut link, &clock, &mut sink),
            Err(err)
        );
    }
    assert_eq!(hw.moisture_reads.len(), reads);
    assert_eq!(link.published.len(), published);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Halted(_))), 1);
}

#[test]
fn fragment_exactly_filling_capacity_overflows() {
    let (mut controller, mut sink) = make_controller();
    let mut link = MockLink::connected();
    link.push(&[0u8; 256]);

    let err = controller
        .tick(
            &mut MockHardware::default(),
            &mut link,
            &MockClock::at(0),
            &mut sink,
        )
        .unwrap_err();
    assert_eq!(err.halt_code(), 3);
}

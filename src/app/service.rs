//! Device controller, the hexagonal core.
//!
//! [`DeviceController`] owns the transfer buffer, model store, inference
//! engine, and [`DeviceState`].  One call to [`DeviceController::tick`] is
//! one control cycle; all I/O flows through port traits injected at the
//! call site, so the whole pipeline runs against mock adapters in tests.
//!
//! ```text
//!   LinkPort ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!  SensorPort ──▶│       DeviceController       │
//!                │ Transfer · Store · Engine    │
//! ActuatorPort ◀─│ Policy                       │
//!                └─────────────────────────────┘
//! ```
//!
//! Cycle order is fixed: read, publish, ingest (and load), infer, actuate.
//! A model that finishes arriving in this cycle is already used for this
//! cycle's decision.

use core::time::Duration;

use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::error::{Error, Result, TransferError};
use crate::model::{
    ARENA_WORDS, InferenceEngine, MODEL_BUFFER_CAPACITY, ModelStore, Scores, TransferBuffer,
    TransferResult,
};
use crate::policy::WateringPolicy;

use super::events::{AppEvent, Readings};
use super::ports::{ActuatorPort, EventSink, LinkPort, SensorPort, TimePort};
use super::state::DeviceState;

// ───────────────────────────────────────────────────────────────
// Cycle outcome
// ───────────────────────────────────────────────────────────────

/// What one completed cycle did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub readings: Readings,
    pub scores: Scores,
    pub water: bool,
    pub watered: bool,
    /// A transfer completed during this cycle (whether or not it loaded).
    pub transfer_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cycle {
    /// No central connected; nothing was read, ingested or decided.
    Disconnected,
    Ran(CycleReport),
}

// ───────────────────────────────────────────────────────────────
// DeviceController
// ───────────────────────────────────────────────────────────────

pub struct DeviceController<const C: usize = MODEL_BUFFER_CAPACITY, const A: usize = ARENA_WORDS> {
    state: DeviceState,
    transfer: TransferBuffer<C>,
    store: ModelStore,
    engine: InferenceEngine<A>,
    policy: WateringPolicy,
    watering_duration: Duration,
    tick_count: u64,
}

impl<const C: usize, const A: usize> DeviceController<C, A> {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            state: DeviceState::new(),
            transfer: TransferBuffer::new(),
            store: ModelStore::new(),
            engine: InferenceEngine::new(),
            policy: WateringPolicy::new(),
            watering_duration: config.watering_duration(),
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started);
        info!(
            "DeviceController started (buffer {} B, arena {} words)",
            C, A
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`], avoiding a double mutable borrow while keeping the
    /// port boundary explicit.
    ///
    /// Only a transfer overflow is returned as an error.  Once that has
    /// happened the controller is halted and every later call returns the
    /// same error without touching any port.
    pub fn tick(
        &mut self,
        hw: &mut (impl SensorPort + ActuatorPort),
        link: &mut impl LinkPort,
        clock: &impl TimePort,
        sink: &mut impl EventSink,
    ) -> Result<Cycle> {
        if let Some(halt) = self.state.halt {
            return Err(halt);
        }
        if !link.is_connected() {
            return Ok(Cycle::Disconnected);
        }
        self.tick_count += 1;

        // 1. Sample
        let since = self.state.since_watered(clock.now_ms());
        let readings = Readings {
            moisture: hw.read_moisture(since),
            temperature: hw.read_temperature(),
        };

        // 2. Publish
        link.publish_readings(readings.moisture, readings.temperature);
        sink.emit(&AppEvent::ReadingsPublished(readings));

        // 3. Ingest every queued fragment
        let transfer_completed = match self.drain_fragments(link, sink) {
            Ok(completed) => completed,
            Err(e) => {
                self.state.halt = Some(e);
                sink.emit(&AppEvent::Halted(e));
                return Err(e);
            }
        };

        // 4. Infer
        let scores = match self.engine.run(readings.temperature, readings.moisture) {
            Ok(scores) => {
                self.state.should_water = self.policy.decide_scores(scores);
                scores
            }
            Err(e) => {
                self.state.should_water = false;
                if self.state.model_ready {
                    warn!("inference failed: {}", e);
                    sink.emit(&AppEvent::InferenceFailed(e));
                }
                Scores::DO_NOT_WATER
            }
        };
        let water = self.state.should_water;
        sink.emit(&AppEvent::Decision { scores, water });

        // 5. Actuate
        let mut watered = false;
        if water {
            hw.activate(self.watering_duration);
            let at_ms = clock.now_ms();
            self.state.last_actuation_ms = Some(at_ms);
            watered = true;
            sink.emit(&AppEvent::Watered {
                duration_ms: self.watering_duration.as_millis() as u32,
                at_ms,
            });
        }

        Ok(Cycle::Ran(CycleReport {
            readings,
            scores,
            water,
            watered,
            transfer_completed,
        }))
    }

    /// Feed fragments to the transfer buffer in arrival order.  Returns
    /// whether at least one transfer completed.
    fn drain_fragments(
        &mut self,
        link: &mut impl LinkPort,
        sink: &mut impl EventSink,
    ) -> Result<bool> {
        if link.take_transfer_interrupted() && self.transfer.fragments() > 0 {
            let (fragments, bytes) = (self.transfer.fragments(), self.transfer.len());
            warn!("transfer interrupted, discarding {} bytes", bytes);
            self.transfer.reset();
            sink.emit(&AppEvent::TransferAborted { fragments, bytes });
        }

        let mut completed = false;
        while let Some(fragment) = link.take_fragment() {
            let before = self.transfer.len();
            match self.transfer.ingest(&fragment) {
                TransferResult::Continuing => {
                    debug!(
                        "fragment #{} ({} bytes)",
                        self.transfer.fragments(),
                        fragment.len()
                    );
                    sink.emit(&AppEvent::TransferProgress {
                        fragments: self.transfer.fragments(),
                        bytes: self.transfer.len(),
                    });
                }
                TransferResult::Completed => {
                    completed = true;
                    self.load_completed_transfer(sink);
                }
                TransferResult::Overflow => {
                    return Err(Error::Transfer(TransferError::Overflow {
                        size: before,
                        incoming: fragment.len(),
                        capacity: self.transfer.capacity(),
                    }));
                }
            }
        }
        Ok(completed)
    }

    fn load_completed_transfer(&mut self, sink: &mut impl EventSink) {
        self.state.transfer_pending = true;
        let image = self.store.finalize(self.transfer.as_bytes());
        info!("model transfer complete: {} bytes", image.len());

        match self.engine.load(image) {
            Ok(info) => sink.emit(&AppEvent::ModelLoaded(info)),
            Err(e) => {
                warn!("model rejected: {}", e);
                sink.emit(&AppEvent::ModelRejected(e));
            }
        }
        self.state.transfer_pending = false;
        self.state.model_ready = self.engine.is_ready();
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn engine(&self) -> &InferenceEngine<A> {
        &self.engine
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn transfer(&self) -> &TransferBuffer<C> {
        &self.transfer
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

// ── Tests ─────────────────────────────────────────────────────

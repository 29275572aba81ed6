//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each application event as one
//! tagged line to the ESP-IDF logger (UART / USB-CDC in production).

use log::{debug, error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => {
                info!("START | controller running");
            }
            AppEvent::ReadingsPublished(r) => {
                info!(
                    "READ  | moisture={:.2}% | T={:.2}\u{00b0}C",
                    r.moisture, r.temperature
                );
            }
            AppEvent::TransferProgress { fragments, bytes } => {
                debug!("XFER  | fragments={} bytes={}", fragments, bytes);
            }
            AppEvent::TransferAborted { fragments, bytes } => {
                warn!(
                    "XFER  | aborted after {} fragments ({} bytes)",
                    fragments, bytes
                );
            }
            AppEvent::ModelLoaded(m) => {
                info!(
                    "MODEL | loaded {} bytes, {} layers, arena={} words",
                    m.image_bytes, m.layers, m.arena_words
                );
            }
            AppEvent::ModelRejected(e) => {
                warn!("MODEL | rejected: {}", e);
            }
            AppEvent::InferenceFailed(e) => {
                warn!("INFER | {}", e);
            }
            AppEvent::Decision { scores, water } => {
                info!(
                    "INFER | stay={:.3} water={:.3} -> {}",
                    scores.stay,
                    scores.water,
                    if *water { "WATER" } else { "stay" }
                );
            }
            AppEvent::Watered { duration_ms, at_ms } => {
                info!("WATER | {}ms at t={}ms", duration_ms, at_ms);
            }
            AppEvent::Halted(e) => {
                error!("HALT  | {} (code {})", e, e.halt_code());
            }
        }
    }
}

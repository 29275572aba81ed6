//! Simulated soil-moisture sensor.
//!
//! The board has no moisture probe yet.  Soil is modelled as saturated
//! right after a watering and drying linearly to 0 % over
//! `moisture_dry_after_secs`.  Soil that has never been watered reads dry.
//!
//! ```text
//!  100 % ┤╲
//!        │  ╲
//!        │    ╲
//!    0 % ┤      ╲________
//!        └──────┬────────▶ since watered
//!            dry_after
//! ```

use core::time::Duration;

pub const SATURATED_PERCENT: f32 = 100.0;

#[derive(Debug, Clone, Copy)]
pub struct MoistureReading {
    pub percent: f32,
}

pub struct MoistureSensor {
    dry_after: Duration,
}

impl MoistureSensor {
    pub fn new(dry_after: Duration) -> Self {
        Self { dry_after }
    }

    pub fn read(&self, since_watered: Option<Duration>) -> MoistureReading {
        let percent = match since_watered {
            None => 0.0,
            Some(_) if self.dry_after.is_zero() => 0.0,
            Some(elapsed) => {
                let wet = 1.0 - elapsed.as_secs_f32() / self.dry_after.as_secs_f32();
                SATURATED_PERCENT * wet.clamp(0.0, 1.0)
            }
        };
        MoistureReading { percent }
    }
}

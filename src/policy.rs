//! Watering decision.
//!
//! The model's two output slots are compared directly: the pump runs only
//! when the water score is strictly greater than the stay score.  There is
//! no probability threshold and no hysteresis; a tie means "do not water".

use crate::model::Scores;

#[derive(Debug, Clone, Copy, Default)]
pub struct WateringPolicy;

impl WateringPolicy {
    pub const fn new() -> Self {
        Self
    }

    pub fn decide(&self, stay: f32, water: f32) -> bool {
        water > stay
    }

    pub fn decide_scores(&self, scores: Scores) -> bool {
        self.decide(scores.stay, scores.water)
    }
}

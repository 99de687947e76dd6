// Parameter storage for the two pulse controls. The UI writes, the frame loop reads.

use serde::{Deserialize, Serialize};

/// A bounded float control with a display step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatParam {
    pub name: &'static str,
    pub default: f32,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    value: f32,
}

impl FloatParam {
    pub const fn new(name: &'static str, default: f32, min: f32, max: f32, step: f32) -> Self {
        Self {
            name,
            default,
            min,
            max,
            step,
            value: default,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Clamp to range and snap to the step grid; non-finite input is ignored
    pub fn set(&mut self, value: f32) {
        if !value.is_finite() {
            return;
        }
        let snapped = if self.step > 0.0 {
            (value / self.step).round() * self.step
        } else {
            value
        };
        self.value = snapped.clamp(self.min, self.max);
    }

    pub fn nudge(&mut self, delta: f32) {
        self.set(self.value + delta);
    }

    pub fn reset(&mut self) {
        self.value = self.default;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub strength: f32,
    pub speed: f32,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            strength: 1.0,
            speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseParams {
    pub strength: FloatParam,
    pub speed: FloatParam,
}

impl PulseParams {
    pub const STRENGTH: FloatParam = FloatParam::new("Pulse Strength", 1.0, 0.0, 5.0, 0.01);
    pub const SPEED: FloatParam = FloatParam::new("Pulse Speed", 1.0, 0.0, 5.0, 0.01);

    pub fn new() -> Self {
        Self {
            strength: Self::STRENGTH,
            speed: Self::SPEED,
        }
    }

    /// Start from configured values instead of the defaults
    pub fn from_config(config: &PulseConfig) -> Self {
        let mut params = Self::new();
        params.strength.set(config.strength);
        params.speed.set(config.speed);
        params
    }

    /// (strength, speed), as handed to the field each frame
    pub fn values(&self) -> (f32, f32) {
        (self.strength.value(), self.speed.value())
    }

    pub fn reset(&mut self) {
        self.strength.reset();
        self.speed.reset();
    }
}

impl Default for PulseParams {
    fn default() -> Self {
        Self::new()
    }
}

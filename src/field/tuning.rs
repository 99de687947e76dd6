use serde::{Deserialize, Serialize};

use crate::error::FieldError;

/// Integration constants for the particle field.
///
/// Defaults give the stock look; every field can be overridden from
/// the `[tuning]` table of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTuning {
    /// Multiplier applied to the raw RMS before clamping to [0, 1]
    pub input_gain: f32,
    /// Level at which the pulse switches from pulling in to pushing out
    pub pulse_baseline: f32,
    pub pulse_gain: f32,
    /// Fraction of the pulse that reaches velocity per unit of pulse speed
    pub impulse_scale: f32,
    pub pull_per_unit: f32,
    pub pull_floor: f32,
    /// Full width of the per-axis uniform drift
    pub drift: f32,
    pub damping: f32,
    pub edge_margin: f32,
    pub edge_rebound: f32,
    pub brightness_base: f32,
    pub brightness_gain: f32,
    pub brightness_jitter: f32,
    pub brightness_min: f32,
    pub brightness_max: f32,
    /// Half width of the initial per-axis velocity range
    pub spawn_speed: f32,
    pub spawn_brightness_min: f32,
    pub spawn_brightness_max: f32,
    pub size_min: f32,
    pub size_max: f32,
    pub center_epsilon: f32,
}

impl Default for FieldTuning {
    fn default() -> Self {
        Self {
            input_gain: 10.0,
            pulse_baseline: 0.25,
            pulse_gain: 12.0,
            impulse_scale: 0.15,
            pull_per_unit: 0.003,
            pull_floor: 0.015,
            drift: 0.02,
            damping: 0.9,
            edge_margin: 10.0,
            edge_rebound: 0.5,
            brightness_base: 0.4,
            brightness_gain: 0.9,
            brightness_jitter: 0.1,
            brightness_min: 0.3,
            brightness_max: 1.0,
            spawn_speed: 0.25,
            spawn_brightness_min: 0.2,
            spawn_brightness_max: 1.0,
            size_min: 1.0,
            size_max: 3.5,
            center_epsilon: 1e-4,
        }
    }
}

impl FieldTuning {
    /// Reject values that would make the integration unstable or produce NaN
    pub fn validate(&self) -> Result<(), FieldError> {
        let all = [
            self.input_gain,
            self.pulse_baseline,
            self.pulse_gain,
            self.impulse_scale,
            self.pull_per_unit,
            self.pull_floor,
            self.drift,
            self.damping,
            self.edge_margin,
            self.edge_rebound,
            self.brightness_base,
            self.brightness_gain,
            self.brightness_jitter,
            self.brightness_min,
            self.brightness_max,
            self.spawn_speed,
            self.spawn_brightness_min,
            self.spawn_brightness_max,
            self.size_min,
            self.size_max,
            self.center_epsilon,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(FieldError::InvalidTuning("all values must be finite"));
        }
        if !(self.damping > 0.0 && self.damping < 1.0) {
            return Err(FieldError::InvalidTuning("damping must be in (0, 1)"));
        }
        if self.edge_margin < 0.0 || !(0.0..=1.0).contains(&self.edge_rebound) {
            return Err(FieldError::InvalidTuning(
                "edge_margin must be >= 0 and edge_rebound in [0, 1]",
            ));
        }
        if self.center_epsilon <= 0.0 {
            return Err(FieldError::InvalidTuning("center_epsilon must be positive"));
        }
        if self.input_gain < 0.0
            || self.pulse_gain < 0.0
            || self.impulse_scale < 0.0
            || self.pull_per_unit < 0.0
            || self.pull_floor < 0.0
            || self.drift < 0.0
            || self.brightness_jitter < 0.0
            || self.spawn_speed < 0.0
        {
            return Err(FieldError::InvalidTuning("gains and widths must be >= 0"));
        }
        let ordered = |lo: f32, hi: f32, floor: f32| floor <= lo && lo <= hi && hi <= 1.0;
        if !ordered(self.brightness_min, self.brightness_max, 0.0)
            || !ordered(self.spawn_brightness_min, self.spawn_brightness_max, 0.0)
        {
            return Err(FieldError::InvalidTuning(
                "brightness ranges must be ordered within [0, 1]",
            ));
        }
        if !(self.size_min > 0.0 && self.size_min <= self.size_max) {
            return Err(FieldError::InvalidTuning("size range must be ordered and positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(FieldTuning::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_unstable_damping() {
        let tuning = FieldTuning {
            damping: 1.0,
            ..Default::default()
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_ranges() {
        let tuning = FieldTuning {
            size_min: 4.0,
            size_max: 2.0,
            ..Default::default()
        };
        assert!(tuning.validate().is_err());

        let tuning = FieldTuning {
            brightness_min: 0.8,
            brightness_max: 0.5,
            ..Default::default()
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_and_zero_epsilon() {
        let tuning = FieldTuning {
            pulse_gain: f32::NAN,
            ..Default::default()
        };
        assert!(tuning.validate().is_err());

        let tuning = FieldTuning {
            center_epsilon: 0.0,
            ..Default::default()
        };
        assert!(tuning.validate().is_err());
    }
}

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::{Bounds, FieldTuning, Particle};
use crate::error::FieldError;

/// Lifecycle of the engine. Everything except `initialize` is inert until the
/// first successful call to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldState {
    Uninitialized,
    Ready(Bounds),
}

/// Audio-reactive particle swarm, integrated once per display frame.
///
/// The engine owns its pool and its random generator. The pool is allocated in
/// `initialize` only; `step` is O(particle count) and allocation-free.
pub struct ParticleField {
    particles: Vec<Particle>,
    state: FieldState,
    tuning: FieldTuning,
    rng: SmallRng,
    signal_level: f32,
    pulse_strength: f32,
    pulse_speed: f32,
}

impl ParticleField {
    pub fn new(tuning: FieldTuning, seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            state: FieldState::Uninitialized,
            tuning,
            rng: SmallRng::seed_from_u64(seed),
            signal_level: 0.0,
            pulse_strength: 1.0,
            pulse_speed: 1.0,
        }
    }

    /// Allocate `count` particles and scatter them over `bounds`.
    ///
    /// Replaces any existing pool. Invalid bounds or tuning are rejected and
    /// leave the engine exactly as it was.
    pub fn initialize(&mut self, bounds: Bounds, count: usize) -> Result<(), FieldError> {
        self.tuning.validate()?;
        bounds.validate()?;

        self.scatter(bounds, count);
        self.state = FieldState::Ready(bounds);

        tracing::debug!(
            count,
            width = bounds.width(),
            height = bounds.height(),
            "particle field initialized"
        );
        Ok(())
    }

    /// Re-scatter the current pool over new bounds. No-op before `initialize`.
    pub fn resize(&mut self, bounds: Bounds) -> Result<(), FieldError> {
        match self.state {
            FieldState::Uninitialized => Ok(()),
            FieldState::Ready(_) => self.initialize(bounds, self.particles.len()),
        }
    }

    /// Re-scatter in place with the current bounds
    pub fn rescatter(&mut self) {
        if let FieldState::Ready(bounds) = self.state {
            self.scatter(bounds, self.particles.len());
        }
    }

    fn scatter(&mut self, bounds: Bounds, count: usize) {
        let tuning = &self.tuning;
        let rng = &mut self.rng;
        self.particles.clear();
        self.particles.extend((0..count).map(|_| Self::spawn(rng, tuning, &bounds)));
    }

    /// Takes effect on the next `step`. Non-finite values are read as zero.
    pub fn set_control_parameters(&mut self, strength: f32, speed: f32) {
        self.pulse_strength = finite_or_zero(strength);
        self.pulse_speed = finite_or_zero(speed);
    }

    /// Scale a raw loudness value by the input gain and keep it in [0, 1].
    pub fn observe_signal_level(&mut self, level: f32) {
        let scaled = level * self.tuning.input_gain;
        self.signal_level = if scaled.is_nan() {
            0.0
        } else {
            scaled.clamp(0.0, 1.0)
        };
    }

    /// Advance every particle by one tick
    pub fn step(&mut self) {
        let FieldState::Ready(bounds) = self.state else {
            return;
        };

        let t = &self.tuning;
        let rng = &mut self.rng;
        let level = self.signal_level;
        let (cx, cy) = bounds.center();

        // Negative below the baseline: quiet input draws the swarm in
        let pulse = (level - t.pulse_baseline) * t.pulse_gain * self.pulse_strength;
        let push = pulse * t.impulse_scale * self.pulse_speed;
        let half_drift = t.drift * 0.5;

        for p in self.particles.iter_mut() {
            let mut dx = p.x - cx;
            let mut dy = p.y - cy;
            let dist = (dx * dx + dy * dy).sqrt() + t.center_epsilon;
            dx /= dist;
            dy /= dist;

            // Pulse along the outward normal
            p.vx += dx * push;
            p.vy += dy * push;

            // Spring back toward center, stronger further out
            let pull = dist * t.pull_per_unit + t.pull_floor;
            p.vx -= dx * pull;
            p.vy -= dy * pull;

            p.vx += rng.random_range(-half_drift..=half_drift);
            p.vy += rng.random_range(-half_drift..=half_drift);

            p.vx *= t.damping;
            p.vy *= t.damping;

            p.x += p.vx;
            p.y += p.vy;

            // Steer, don't clamp: overshoot past the margin is allowed
            if p.x < bounds.left + t.edge_margin {
                p.vx = p.vx.abs() * t.edge_rebound;
            }
            if p.x > bounds.right - t.edge_margin {
                p.vx = -p.vx.abs() * t.edge_rebound;
            }
            if p.y < bounds.top + t.edge_margin {
                p.vy = p.vy.abs() * t.edge_rebound;
            }
            if p.y > bounds.bottom - t.edge_margin {
                p.vy = -p.vy.abs() * t.edge_rebound;
            }

            let jitter = rng.random_range(0.0..=t.brightness_jitter);
            p.brightness = (t.brightness_base + level * t.brightness_gain + jitter)
                .clamp(t.brightness_min, t.brightness_max);
        }
    }

    /// Particles as of the last `step`; empty before `initialize`
    pub fn current_state(&self) -> &[Particle] {
        &self.particles
    }

    pub fn state(&self) -> FieldState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, FieldState::Ready(_))
    }

    pub fn bounds(&self) -> Option<Bounds> {
        match self.state {
            FieldState::Ready(bounds) => Some(bounds),
            FieldState::Uninitialized => None,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Gain-scaled, clamped reactivity input used by the next step
    pub fn signal_level(&self) -> f32 {
        self.signal_level
    }

    pub fn control_parameters(&self) -> (f32, f32) {
        (self.pulse_strength, self.pulse_speed)
    }

    fn spawn(rng: &mut SmallRng, t: &FieldTuning, bounds: &Bounds) -> Particle {
        Particle {
            x: rng.random_range(bounds.left..=bounds.right),
            y: rng.random_range(bounds.top..=bounds.bottom),
            vx: rng.random_range(-t.spawn_speed..=t.spawn_speed),
            vy: rng.random_range(-t.spawn_speed..=t.spawn_speed),
            brightness: rng.random_range(t.spawn_brightness_min..=t.spawn_brightness_max),
            size: rng.random_range(t.size_min..=t.size_max),
        }
    }

    #[cfg(test)]
    fn place(&mut self, particles: Vec<Particle>) {
        self.particles = particles;
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn field(seed: u64) -> ParticleField {
        ParticleField::new(FieldTuning::default(), seed)
    }

    fn bounds() -> Bounds {
        Bounds::from_size(200.0, 120.0).unwrap()
    }

    #[test]
    fn test_initialize_respects_ranges() {
        for count in [0, 1, 17, 800] {
            let mut f = field(7);
            f.initialize(bounds(), count).unwrap();
            assert_eq!(f.len(), count);

            for p in f.current_state() {
                assert!(bounds().contains(p.x, p.y), "{:?}", p);
                assert!((0.2..=1.0).contains(&p.brightness));
                assert!((1.0..=3.5).contains(&p.size));
                assert!(p.vx.abs() <= 0.25 && p.vy.abs() <= 0.25);
            }
        }
    }

    #[test]
    fn test_uninitialized_is_inert() {
        let mut f = field(1);
        assert_eq!(f.state(), FieldState::Uninitialized);
        assert!(f.current_state().is_empty());

        f.observe_signal_level(0.05);
        f.set_control_parameters(2.0, 3.0);
        f.step();
        f.resize(bounds()).unwrap();

        assert!(!f.is_ready());
        assert!(f.current_state().is_empty());
        // Inputs are remembered for the first frame after initialize
        assert!((f.signal_level() - 0.5).abs() < 1e-6);
        assert_eq!(f.control_parameters(), (2.0, 3.0));
    }

    #[test]
    fn test_invalid_bounds_rejected_without_side_effects() {
        let mut f = field(3);
        f.initialize(bounds(), 10).unwrap();
        let before = f.current_state().to_vec();

        let bad = Bounds {
            left: 0.0,
            top: 0.0,
            right: 0.0,
            bottom: 50.0,
        };
        assert_eq!(
            f.initialize(bad, 10),
            Err(FieldError::InvalidBounds {
                width: 0.0,
                height: 50.0
            })
        );
        assert!(f.resize(bad).is_err());
        assert_eq!(f.current_state(), &before[..]);
        assert_eq!(f.bounds(), Some(bounds()));
    }

    #[test]
    fn test_invalid_tuning_rejected_at_initialize() {
        let inverted = FieldTuning {
            size_min: 4.0,
            size_max: 2.0,
            ..Default::default()
        };
        let mut f = ParticleField::new(inverted, 1);
        assert!(matches!(
            f.initialize(bounds(), 10),
            Err(FieldError::InvalidTuning(_))
        ));
        assert!(!f.is_ready());
        assert!(f.current_state().is_empty());

        // Would otherwise only surface as an empty jitter range inside step
        let negative_jitter = FieldTuning {
            brightness_jitter: -0.1,
            ..Default::default()
        };
        let mut f = ParticleField::new(negative_jitter, 1);
        assert!(f.initialize(bounds(), 10).is_err());
        f.step();
        assert!(f.current_state().is_empty());
    }

    #[test]
    fn test_rescatter_keeps_bounds_and_count() {
        let mut f = field(4);
        f.rescatter();
        assert!(!f.is_ready());

        f.initialize(bounds(), 25).unwrap();
        let before = f.current_state().to_vec();
        f.rescatter();

        assert_eq!(f.len(), 25);
        assert_eq!(f.bounds(), Some(bounds()));
        assert_ne!(f.current_state(), &before[..]);
        for p in f.current_state() {
            assert!(bounds().contains(p.x, p.y), "{:?}", p);
        }
    }

    #[test]
    fn test_signal_level_always_clamped() {
        let mut f = field(0);
        for raw in [-5.0, -0.01, 0.0, 0.03, 0.1, 0.5, 7.0, f32::MAX, f32::INFINITY] {
            f.observe_signal_level(raw);
            let stored = f.signal_level();
            assert!((0.0..=1.0).contains(&stored), "{} -> {}", raw, stored);
        }

        f.observe_signal_level(0.03);
        assert!((f.signal_level() - 0.3).abs() < 1e-6);

        f.observe_signal_level(f32::NAN);
        assert_eq!(f.signal_level(), 0.0);

        f.observe_signal_level(f32::NEG_INFINITY);
        assert_eq!(f.signal_level(), 0.0);
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let run = || {
            let mut f = field(42);
            f.initialize(bounds(), 64).unwrap();
            f.set_control_parameters(1.5, 0.7);
            for i in 0..120 {
                f.observe_signal_level((i % 10) as f32 * 0.01);
                f.step();
            }
            f.current_state().to_vec()
        };

        assert_eq!(run(), run());

        let mut other = field(43);
        other.initialize(bounds(), 64).unwrap();
        assert_ne!(run()[0], other.current_state()[0]);
    }

    #[test]
    fn test_pool_size_invariant() {
        let mut f = field(9);
        f.initialize(bounds(), 33).unwrap();
        for _ in 0..50 {
            f.step();
            assert_eq!(f.len(), 33);
        }

        f.resize(Bounds::from_size(80.0, 40.0).unwrap()).unwrap();
        assert_eq!(f.len(), 33);
        for p in f.current_state() {
            assert!(p.x <= 80.0 && p.y <= 40.0);
        }

        f.rescatter();
        assert_eq!(f.len(), 33);
    }

    #[test]
    fn test_soft_containment_flips_velocity() {
        let mut f = field(5);
        f.initialize(bounds(), 1).unwrap();
        f.observe_signal_level(0.0);

        // Sitting on the left margin, heading out
        f.place(vec![Particle {
            x: 10.0,
            y: 60.0,
            vx: -3.0,
            vy: 0.0,
            brightness: 0.5,
            size: 2.0,
        }]);
        f.step();

        let p = f.current_state()[0];
        assert!(p.vx > 0.0, "vx should point inward, got {}", p.vx);
        // Position moved with the old outward velocity, it was not clamped
        assert!(p.x < 10.0);

        // Same on the bottom edge
        f.place(vec![Particle {
            x: 100.0,
            y: 115.0,
            vx: 0.0,
            vy: 4.0,
            brightness: 0.5,
            size: 2.0,
        }]);
        f.step();

        let p = f.current_state()[0];
        assert!(p.vy < 0.0, "vy should point inward, got {}", p.vy);
        assert!(p.y > 115.0);
    }

    #[test]
    fn test_center_particle_full_level() {
        let mut f = field(11);
        f.initialize(bounds(), 1).unwrap();
        f.set_control_parameters(1.0, 1.0);
        f.observe_signal_level(0.1); // x10 gain -> 1.0

        let (cx, cy) = bounds().center();
        f.place(vec![Particle {
            x: cx,
            y: cy,
            vx: 0.0,
            vy: 0.0,
            brightness: 0.5,
            size: 2.0,
        }]);
        f.step();

        let p = f.current_state()[0];
        let speed = (p.vx * p.vx + p.vy * p.vy).sqrt();
        assert!(speed > 0.0);
        assert!(p.vx.is_finite() && p.vy.is_finite());
        // The guarded direction is zero at center, so only drift moves it
        assert!(speed <= 0.01 * 0.9 * 2.0_f32.sqrt() + 1e-6);
        // 0.4 + 1.0 * 0.9 + jitter, clamped
        assert_eq!(p.brightness, 1.0);
    }

    #[test]
    fn test_brightness_tracks_current_level() {
        let mut f = field(13);
        f.initialize(bounds(), 50).unwrap();

        f.observe_signal_level(0.0);
        f.step();
        for p in f.current_state() {
            assert!((0.4..=0.5 + 1e-6).contains(&p.brightness), "{}", p.brightness);
        }

        f.observe_signal_level(1.0);
        f.step();
        for p in f.current_state() {
            assert_eq!(p.brightness, 1.0);
        }
    }

    #[test]
    fn test_silence_keeps_swarm_inside() {
        let mut f = field(21);
        f.initialize(bounds(), 200).unwrap();
        f.observe_signal_level(0.0);

        for _ in 0..300 {
            f.step();
        }
        for p in f.current_state() {
            assert!(bounds().contains(p.x, p.y), "{:?}", p);
        }
    }

    #[test]
    fn test_extreme_inputs_stay_finite() {
        let mut f = field(17);
        f.initialize(bounds(), 100).unwrap();
        f.set_control_parameters(5.0, 5.0);

        for i in 0..500 {
            f.observe_signal_level(if i % 2 == 0 { 1.0 } else { 0.0 });
            f.step();
        }
        f.set_control_parameters(f32::NAN, f32::INFINITY);
        f.step();

        for p in f.current_state() {
            assert!(p.x.is_finite() && p.y.is_finite());
            assert!(p.vx.is_finite() && p.vy.is_finite());
            assert!((0.3..=1.0).contains(&p.brightness));
        }
    }

    #[test]
    fn test_step_fits_frame_budget() {
        let mut f = field(99);
        f.initialize(bounds(), 800).unwrap();
        f.observe_signal_level(0.05);

        let start = Instant::now();
        for _ in 0..100 {
            f.step();
        }
        assert!(start.elapsed() < Duration::from_millis(1600));
    }
}

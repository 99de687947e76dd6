pub mod engine;
pub mod particle;
pub mod tuning;

pub use engine::{FieldState, ParticleField};
pub use particle::{Bounds, Particle};
pub use tuning::FieldTuning;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub particle_count: usize,
    /// Fixed seed for reproducible runs; random per launch when `None`
    pub seed: Option<u64>,
    pub fps: u32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            particle_count: 800,
            seed: None,
            fps: 60,
        }
    }
}

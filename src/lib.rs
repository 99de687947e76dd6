pub mod audio;
pub mod config;
pub mod error;
pub mod field;
pub mod params;
pub mod ui;

pub use audio::{LevelCell, SignalEstimator};
pub use config::AppConfig;
pub use error::FieldError;
pub use field::{Bounds, FieldTuning, Particle, ParticleField};
pub use params::PulseParams;
pub use ui::TerminalUI;

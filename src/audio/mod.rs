pub mod estimator;
pub mod level;
pub mod stream;

pub use estimator::SignalEstimator;
pub use level::{LevelBand, LevelCell};
pub use stream::AudioStream;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Capture device by name, the host default when `None`
    pub input_device: Option<String>,
}

/// Notifications from the audio side to the UI. Sent with `try_send` only.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    StreamError(String),
    DeviceChanged(Option<String>),
}

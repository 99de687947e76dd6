use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, SampleFormat, Stream, StreamConfig};
use crossbeam::channel::Sender;

use super::{AudioConfig, AudioEvent, SignalEstimator};

/// Capture side of the visualizer: one input device, observed, never played back.
pub struct AudioStream {
    host: Host,
    input_device: Device,
    input_config: StreamConfig,
    input_device_name: String,
}

impl AudioStream {
    pub fn new(config: &AudioConfig) -> Result<Self> {
        let host = cpal::default_host();

        let input_device = match &config.input_device {
            Some(name) => find_input_device(&host, name)?,
            None => host
                .default_input_device()
                .ok_or_else(|| anyhow!("No input device available"))?,
        };

        let input_device_name = input_device
            .name()
            .unwrap_or_else(|_| "Unknown".to_string());

        let input_config = select_f32_config(&input_device)
            .with_context(|| format!("Configuring input device '{}'", input_device_name))?;

        tracing::info!(
            device = %input_device_name,
            sample_rate = input_config.sample_rate.0,
            channels = input_config.channels,
            "input device selected"
        );

        Ok(Self {
            host,
            input_device,
            input_config,
            input_device_name,
        })
    }

    /// Build and start the capture stream. The returned stream must be kept alive.
    pub fn start_capture(
        &self,
        estimator: SignalEstimator,
        event_sender: Sender<AudioEvent>,
    ) -> Result<Stream> {
        let channels = self.input_config.channels as usize;

        let stream = self.input_device.build_input_stream(
            &self.input_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // cpal hands over whole frames, a shape error here means a
                // torn buffer and the block is dropped
                let _ = estimator.process_interleaved(data, channels);
            },
            move |_err| {
                // Error callbacks may run on the audio thread depending on backend
                let _ = event_sender
                    .try_send(AudioEvent::StreamError(String::from("Input stream error")));
                let new_input = cpal::default_host()
                    .default_input_device()
                    .and_then(|d| d.name().ok());
                let _ = event_sender.try_send(AudioEvent::DeviceChanged(new_input));
            },
            None,
        )?;

        stream.play()?;

        tracing::info!(
            "capture started: {}Hz, {}ch",
            self.input_config.sample_rate.0,
            self.input_config.channels
        );

        Ok(stream)
    }

    pub fn sample_rate(&self) -> u32 {
        self.input_config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.input_config.channels
    }

    pub fn input_device_name(&self) -> &str {
        &self.input_device_name
    }

    pub fn host_name(&self) -> &'static str {
        self.host.id().name()
    }
}

fn find_input_device(host: &Host, name: &str) -> Result<Device> {
    for device in host.input_devices()? {
        if let Ok(device_name) = device.name()
            && device_name == name
        {
            return Ok(device);
        }
    }
    Err(anyhow!("Input device '{}' not found", name))
}

/// Prefer the device default; fall back to any f32 range at its highest rate.
fn select_f32_config(device: &Device) -> Result<StreamConfig> {
    let default = device.default_input_config()?;
    if default.sample_format() == SampleFormat::F32 {
        return Ok(default.config());
    }

    tracing::debug!(
        format = ?default.sample_format(),
        "default input format is not f32, searching supported ranges"
    );

    device
        .supported_input_configs()?
        .find(|range| range.sample_format() == SampleFormat::F32)
        .map(|range| range.with_max_sample_rate().config())
        .ok_or_else(|| {
            anyhow!(
                "No f32 capture format (default is {:?})",
                default.sample_format()
            )
        })
}

/// Names of all capture devices on the default host
pub fn enumerate_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();

    let mut inputs = Vec::new();
    for device in host.input_devices()? {
        inputs.push(device.name().unwrap_or_else(|_| "Unknown".to_string()));
    }

    Ok(inputs)
}

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam::channel;
use pulsefield::audio::stream::enumerate_input_devices;
use pulsefield::audio::{AudioEvent, AudioStream, LevelCell, SignalEstimator};
use pulsefield::config::AppConfig;
use pulsefield::field::ParticleField;
use pulsefield::params::PulseParams;
use pulsefield::ui::TerminalUI;
use std::path::PathBuf;
use std::sync::Arc;

const LOG_FILE: &str = "pulsefield.log";

#[derive(Debug, Parser)]
#[command(
    name = "pulsefield",
    version,
    about = "Terminal audio-reactive particle field",
    after_help = "CONTROLS:\n    ↑↓     Pulse strength\n    ←→     Pulse speed\n    0      Reset pulse controls\n    R      Re-scatter the field\n    Q/Esc  Quit"
)]
struct Args {
    /// Config file (defaults to ./pulsefield.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Capture device name, see --list-devices
    #[arg(short, long)]
    device: Option<String>,

    /// Number of particles in the field
    #[arg(long)]
    particles: Option<usize>,

    /// Seed for reproducible particle motion
    #[arg(long)]
    seed: Option<u64>,

    /// Target frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Write debug logs to pulsefield.log
    #[arg(long)]
    debug: bool,

    /// Print capture devices and exit
    #[arg(long)]
    list_devices: bool,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(device) = &self.device {
            config.audio.input_device = Some(device.clone());
        }
        if let Some(particles) = self.particles {
            config.field.particle_count = particles;
        }
        if let Some(seed) = self.seed {
            config.field.seed = Some(seed);
        }
        if let Some(fps) = self.fps {
            config.field.fps = fps;
        }
    }
}

fn init_logging(debug: bool) -> Result<()> {
    if !debug {
        return Ok(());
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .with_context(|| format!("Opening {}", LOG_FILE))?;

    // The terminal belongs to the UI, so logs only ever go to the file
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_devices {
        println!("Available input devices:");
        for (i, name) in enumerate_input_devices()?.iter().enumerate() {
            println!("  {}: {}", i, name);
        }
        return Ok(());
    }

    init_logging(args.debug)?;
    if args.debug {
        println!("Starting pulsefield in DEBUG mode, logging to {}", LOG_FILE);
    }

    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let seed = config.field.seed.unwrap_or_else(rand::random);
    tracing::info!(
        particles = config.field.particle_count,
        fps = config.field.fps,
        seed,
        "pulsefield starting"
    );

    // Audio side: estimator publishes into the level cell from the capture callback
    let level = Arc::new(LevelCell::new());
    let (event_sender, event_receiver) = channel::bounded::<AudioEvent>(16);

    let audio_stream = AudioStream::new(&config.audio)?;
    let device_label = format!(
        "{} ({} Hz, {} ch, {})",
        audio_stream.input_device_name(),
        audio_stream.sample_rate(),
        audio_stream.channels(),
        audio_stream.host_name()
    );
    let _capture = audio_stream
        .start_capture(SignalEstimator::new(Arc::clone(&level)), event_sender)
        .context("Starting audio capture")?;

    // Display side: field is initialized on the first frame, once the canvas size is known
    let field = ParticleField::new(config.tuning, seed);
    let params = PulseParams::from_config(&config.pulse);

    let mut ui = TerminalUI::new(
        field,
        params,
        level,
        event_receiver,
        config.field.particle_count,
        &device_label,
        config.field.fps,
    )
    .context("UI creation failed")?;
    ui.run().context("UI run failed")?;
    drop(ui);

    println!("pulsefield stopped.");
    Ok(())
}

use anyhow::Result;
use crossbeam::channel::Receiver;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};
use std::{
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use super::canvas::{FieldCanvas, field_bounds_for};
use super::rate::RateMeter;
use crate::audio::{AudioEvent, LevelBand, LevelCell};
use crate::field::ParticleField;
use crate::params::PulseParams;

const STATUS_DURATION: Duration = Duration::from_secs(2);
const PARAM_NUDGE: f32 = 0.1;

/// Owns the terminal and runs the display-rate half of the visualizer.
///
/// Each frame reads the latest published level and the pulse controls, steps
/// the field once and draws it. Nothing here touches the audio thread.
pub struct TerminalUI {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    field: ParticleField,
    params: PulseParams,
    level: Arc<LevelCell>,
    event_receiver: Receiver<AudioEvent>,
    particle_count: usize,
    device_label: String,
    frame_interval: Duration,
    field_area: Option<Rect>,
    is_running: bool,
    last_frame: Instant,
    status: Option<(String, Instant)>,
    frame_rate: RateMeter,
    block_rate: RateMeter,
    last_published: u32,
}

/// Run a setup step; on failure undo raw mode before handing the error back
fn or_restore<T>(result: io::Result<T>, restore: impl FnOnce()) -> io::Result<T> {
    if result.is_err() {
        restore();
    }
    result
}

impl TerminalUI {
    pub fn new(
        field: ParticleField,
        params: PulseParams,
        level: Arc<LevelCell>,
        event_receiver: Receiver<AudioEvent>,
        particle_count: usize,
        device_label: &str,
        fps: u32,
    ) -> Result<Self> {
        enable_raw_mode()?;
        let restore = || {
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            let _ = disable_raw_mode();
        };
        let mut stdout = io::stdout();
        or_restore(execute!(stdout, EnterAlternateScreen), restore)?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = or_restore(Terminal::new(backend), restore)?;

        let now = Instant::now();
        let last_published = level.published_count();
        Ok(Self {
            terminal,
            field,
            params,
            level,
            event_receiver,
            particle_count,
            device_label: device_label.to_string(),
            frame_interval: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            field_area: None,
            is_running: true,
            last_frame: now,
            status: None,
            frame_rate: RateMeter::new(now),
            block_rate: RateMeter::new(now),
            last_published,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        while self.is_running {
            self.process_events()?;
            self.check_status_timer();

            if self.last_frame.elapsed() >= self.frame_interval {
                self.last_frame = Instant::now();
                self.sync_field_bounds()?;
                self.advance_field();
                self.draw()?;
                self.update_rates();
            }

            // Small sleep to prevent excessive CPU usage
            std::thread::sleep(Duration::from_millis(1));
        }

        tracing::info!("frame loop stopped");
        Ok(())
    }

    fn process_events(&mut self) -> Result<()> {
        if event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key_event(key),
                Event::Resize(width, height) => {
                    tracing::debug!(width, height, "terminal resized");
                }
                _ => {}
            }
        }

        while let Ok(event) = self.event_receiver.try_recv() {
            self.handle_audio_event(event);
        }

        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.is_running = false;
            }
            KeyCode::Up => {
                self.params.strength.nudge(PARAM_NUDGE);
                self.show_param(self.params.strength.name, self.params.strength.value());
            }
            KeyCode::Down => {
                self.params.strength.nudge(-PARAM_NUDGE);
                self.show_param(self.params.strength.name, self.params.strength.value());
            }
            KeyCode::Right => {
                self.params.speed.nudge(PARAM_NUDGE);
                self.show_param(self.params.speed.name, self.params.speed.value());
            }
            KeyCode::Left => {
                self.params.speed.nudge(-PARAM_NUDGE);
                self.show_param(self.params.speed.name, self.params.speed.value());
            }
            KeyCode::Char('0') => {
                self.params.reset();
                self.show_status("Pulse controls reset");
            }
            KeyCode::Char('r') => {
                self.field.rescatter();
                self.show_status("Field re-scattered");
            }
            _ => {}
        }
    }

    fn handle_audio_event(&mut self, event: AudioEvent) {
        match event {
            AudioEvent::StreamError(msg) => {
                tracing::warn!("audio stream error: {}", msg);
                self.show_status(&format!("Error: {}", msg));
            }
            AudioEvent::DeviceChanged(name) => {
                tracing::info!(device = ?name, "default input changed");
                match name {
                    Some(name) => self.show_status(&format!("Default input is now {}", name)),
                    None => self.show_status("No input device"),
                }
            }
        }
    }

    /// (Re)initialize the field when the canvas area changes size
    fn sync_field_bounds(&mut self) -> Result<()> {
        let size = self.terminal.size()?;
        let [_, body, _] = Self::layout(Rect::new(0, 0, size.width, size.height));
        let inner = Self::field_block().inner(body);

        if self.field_area == Some(inner) {
            return Ok(());
        }
        self.field_area = Some(inner);

        // A terminal too small for a canvas leaves the field as it was
        let Ok(bounds) = field_bounds_for(inner) else {
            tracing::debug!(?inner, "canvas area too small, field left untouched");
            return Ok(());
        };

        if self.field.is_ready() {
            self.field.resize(bounds)?;
        } else {
            self.field.initialize(bounds, self.particle_count)?;
        }
        Ok(())
    }

    fn advance_field(&mut self) {
        let (strength, speed) = self.params.values();
        self.field.set_control_parameters(strength, speed);
        self.field.observe_signal_level(self.level.latest());
        self.field.step();
    }

    /// Drawn frames, and capture blocks published since the previous frame
    fn update_rates(&mut self) {
        let now = Instant::now();
        self.frame_rate.record(1, now);

        let published = self.level.published_count();
        self.block_rate.record(published.wrapping_sub(self.last_published), now);
        self.last_published = published;
    }

    fn show_param(&mut self, name: &str, value: f32) {
        self.show_status(&format!("{}: {:.2}", name, value));
    }

    fn show_status(&mut self, message: &str) {
        self.status = Some((message.to_string(), Instant::now()));
    }

    fn check_status_timer(&mut self) {
        let expired = self
            .status
            .as_ref()
            .is_some_and(|(_, since)| since.elapsed() >= STATUS_DURATION);
        if expired {
            self.status = None;
        }
    }

    fn layout(area: Rect) -> [Rect; 3] {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Field
                Constraint::Length(4), // Footer
            ])
            .split(area);
        [chunks[0], chunks[1], chunks[2]]
    }

    fn field_block() -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .title("Audio-Reactive Particle Field")
    }

    fn draw(&mut self) -> Result<()> {
        let field = &self.field;
        let params = &self.params;
        let raw_level = self.level.latest();
        let device_label = self.device_label.as_str();
        let status = self.status.as_ref().map(|(msg, _)| msg.as_str());
        let rates = (self.frame_rate.rate(), self.block_rate.rate());

        self.terminal.draw(|f| {
            let [header, body, footer] = Self::layout(f.area());

            Self::draw_header_static(
                f,
                header,
                device_label,
                raw_level,
                field.signal_level(),
                rates,
                status,
            );

            match field.bounds() {
                Some(bounds) => f.render_widget(
                    FieldCanvas::new(field.current_state(), bounds).block(Self::field_block()),
                    body,
                ),
                None => f.render_widget(Self::field_block(), body),
            }

            Self::draw_footer_static(f, footer, params, field.len());
        })?;
        Ok(())
    }

    fn draw_header_static(
        f: &mut Frame,
        area: Rect,
        device_label: &str,
        raw_level: f32,
        reactivity: f32,
        (fps, blocks_per_sec): (f32, f32),
        status: Option<&str>,
    ) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);

        let level_color = match LevelCell::band(raw_level) {
            LevelBand::Normal => Color::Green,
            LevelBand::Warn => Color::Yellow,
            LevelBand::Hot => Color::LightRed,
            LevelBand::Clip => Color::Red,
        };

        let mut spans = vec![
            Span::styled(
                "Input: ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(device_label.to_string()),
            Span::styled("  |  ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!("{:>6.1} dBFS", LevelCell::to_db(raw_level)),
                Style::default().fg(level_color),
            ),
            Span::styled("  |  ", Style::default().fg(Color::DarkGray)),
            Span::styled(format!("{:.0} fps", fps), Style::default().fg(Color::Cyan)),
            Span::raw("  "),
            // Stays at 0 when the capture stream has stalled
            Span::styled(
                format!("{:.0} blk/s", blocks_per_sec),
                Style::default().fg(if blocks_per_sec > 0.0 {
                    Color::Green
                } else {
                    Color::Red
                }),
            ),
        ];
        if let Some(status) = status {
            spans.push(Span::styled("  |  ", Style::default().fg(Color::DarkGray)));
            spans.push(Span::styled(
                status.to_string(),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ));
        }

        let header = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL).title("pulsefield"));
        f.render_widget(header, chunks[0]);

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Reactivity"))
            .gauge_style(Style::default().fg(Color::Rgb(0, 200, 255)))
            .ratio(reactivity.clamp(0.0, 1.0) as f64)
            .label(format!("{:.0}%", reactivity * 100.0));
        f.render_widget(gauge, chunks[1]);
    }

    fn draw_footer_static(f: &mut Frame, area: Rect, params: &PulseParams, particle_count: usize) {
        let key_color = Color::Yellow;
        let desc_color = Color::White;
        let sep_color = Color::DarkGray;

        let key_desc = |key: &str, desc: &str| -> Vec<Span> {
            vec![
                Span::styled(
                    key.to_string(),
                    Style::default().fg(key_color).add_modifier(Modifier::BOLD),
                ),
                Span::styled("=".to_string(), Style::default().fg(sep_color)),
                Span::styled(desc.to_string(), Style::default().fg(desc_color)),
            ]
        };
        let separator = || Span::styled(" | ".to_string(), Style::default().fg(sep_color));

        let mut keys = Vec::new();
        keys.extend(key_desc("↑↓", "Strength"));
        keys.push(separator());
        keys.extend(key_desc("←→", "Speed"));
        keys.push(separator());
        keys.extend(key_desc("0", "Reset"));
        keys.push(separator());
        keys.extend(key_desc("R", "Re-scatter"));
        keys.push(separator());
        keys.extend(key_desc("Q", "Quit"));

        let (strength, speed) = params.values();
        let values = Line::from(vec![
            Span::styled(
                format!(" Strength: {:.2} ", strength),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" Speed: {:.2} ", speed),
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" Particles: {} ", particle_count),
                Style::default().fg(Color::DarkGray),
            ),
        ]);

        let footer = Paragraph::new(vec![Line::from(keys), values])
            .block(Block::default().borders(Borders::ALL).title("Controls"));
        f.render_widget(footer, area);
    }
}

impl Drop for TerminalUI {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_or_restore_runs_only_on_failure() {
        let restored = Cell::new(false);

        let ok: io::Result<u8> = or_restore(Ok(1), || restored.set(true));
        assert_eq!(ok.unwrap(), 1);
        assert!(!restored.get());

        let failed: io::Result<u8> =
            or_restore(Err(io::Error::other("no tty")), || restored.set(true));
        assert!(failed.is_err());
        assert!(restored.get());
    }
}

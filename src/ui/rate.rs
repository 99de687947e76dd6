// Smoothed events-per-second counter for the header readouts

use std::time::{Duration, Instant};

const RATE_WINDOW: Duration = Duration::from_millis(500);

/// Counts events (drawn frames, captured blocks) and reports a smoothed rate.
///
/// Counts accumulate over a short window; each closed window is folded into
/// the reported rate the same way the level meter smooths RMS.
#[derive(Debug, Clone)]
pub struct RateMeter {
    window_start: Instant,
    count: u64,
    rate: Option<f32>,
}

impl RateMeter {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            count: 0,
            rate: None,
        }
    }

    /// Add `events` that happened up to `now`
    pub fn record(&mut self, events: u32, now: Instant) {
        self.count += events as u64;

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < RATE_WINDOW {
            return;
        }

        let measured = self.count as f32 / elapsed.as_secs_f32();
        self.rate = Some(match self.rate {
            Some(current) => current * 0.8 + measured * 0.2,
            None => measured,
        });
        self.window_start = now;
        self.count = 0;
    }

    /// Smoothed events per second, 0 until the first window closes
    pub fn rate(&self) -> f32 {
        self.rate.unwrap_or(0.0)
    }
}

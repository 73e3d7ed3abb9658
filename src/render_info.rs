use std::time::{Duration, Instant};

use crate::rate::{Ema, RateEstimator};

/// How often the ingestion rate is recomputed.
pub const RATE_RECALC_INTERVAL: Duration = Duration::from_millis(1000); // 1 s window

/// Sample counts at or above this are shown in thousands.
pub const BIN_COUNT_ABBREVIATION: usize = 10_000; // 12345 -> "12k"

/// Keeps the "bins / fps" diagnostic line shown over the waterfall.
pub struct RenderInfoTracker {
    estimator: Box<dyn RateEstimator + Send>,
    frames_since_recalc: u32,
    last_recalc: Option<Instant>,
    text: String,
}

impl RenderInfoTracker {
    pub fn new(estimator: Box<dyn RateEstimator + Send>) -> Self {
        Self {
            estimator,
            frames_since_recalc: 0,
            last_recalc: None,
            text: String::new(),
        }
    }

    /// Accounts one ingested scan of `sample_count` bins arriving at `now`.
    pub fn record_frame(&mut self, sample_count: usize, now: Instant) {
        match self.last_recalc {
            // The first frame only opens the measurement window
            None => self.last_recalc = Some(now),
            Some(last) => {
                self.frames_since_recalc += 1; // frames after the window opened
                let elapsed = now.saturating_duration_since(last);
                if elapsed >= RATE_RECALC_INTERVAL {
                    let rate = self.frames_since_recalc as f64 / elapsed.as_secs_f64();
                    self.estimator.add_sample(rate);
                    self.frames_since_recalc = 0;
                    self.last_recalc = Some(now); // next window starts here
                }
            }
        }

        self.text = format_status(sample_count, self.estimator.current_estimate());
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rate(&self) -> f64 {
        self.estimator.current_estimate()
    }
}

impl Default for RenderInfoTracker {
    fn default() -> Self {
        Self::new(Box::new(Ema::default()))
    }
}

pub fn format_status(sample_count: usize, rate: f64) -> String {
    let (count, suffix) = if sample_count >= BIN_COUNT_ABBREVIATION {
        (sample_count / 1000, "k") // truncated, not rounded
    } else {
        (sample_count, "")
    };
    format!("No. of FFT bins: {}{} / {:.1}fps", count, suffix, rate)
}

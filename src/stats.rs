use crate::session::Session;
use crate::util::{clamp_pct, format_mm_ss};
use crate::TICK_RATE_MS;
use std::time::{Duration, Instant};

/// Statistics derived from a session at a point in time. Purely a function
/// of the session state and the clock; holds no state of its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveStats {
    pub wpm: f64,
    pub accuracy: f64,
    pub elapsed: Duration,
    pub errors: usize,
}

impl Default for LiveStats {
    fn default() -> Self {
        Self {
            wpm: 0.0,
            accuracy: 100.0,
            elapsed: Duration::ZERO,
            errors: 0,
        }
    }
}

impl LiveStats {
    /// Words-per-minute uses the conventional 5-chars-per-word divisor.
    /// Elapsed minutes are floored to one tick so the very first keystroke
    /// cannot divide by zero. Accuracy is 100 with nothing typed, otherwise
    /// `correct / typed`, clamped to [0, 100].
    pub fn compute(session: &Session, now: Instant) -> Self {
        let counts = session.counts();
        let elapsed = session.elapsed(now);

        let minutes = elapsed.as_millis().max(TICK_RATE_MS as u128) as f64 / 60_000.0;
        let wpm = (counts.typed as f64 / 5.0) / minutes;

        let accuracy = if counts.typed == 0 {
            100.0
        } else {
            clamp_pct(counts.correct as f64 * 100.0 / counts.typed as f64)
        };

        Self {
            wpm,
            accuracy,
            elapsed,
            errors: counts.errors,
        }
    }

    pub fn wpm_display(&self) -> String {
        format!("{:.1}", self.wpm)
    }

    pub fn accuracy_display(&self) -> String {
        format!("{:.0}%", self.accuracy)
    }

    pub fn time_display(&self) -> String {
        format_mm_ss(self.elapsed)
    }

    pub fn errors_display(&self) -> String {
        self.errors.to_string()
    }
}

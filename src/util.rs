use std::time::Duration;

/// Zero-padded `MM:SS` for the elapsed-time display.
pub fn format_mm_ss(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!("{:02}:{:02}", total / 60, total % 60)
}

pub fn clamp_pct(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

//! `HH:MM:SS:mmm` formatting and parsing for the loop editors.

/// Formats seconds as `HH:MM:SS:mmm`. Negative input is shown as zero.
pub fn format_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let mut total_ms = (seconds * 1000.0 + 0.0001) as u64;

    let hours = total_ms / 3_600_000;
    total_ms %= 3_600_000;
    let minutes = total_ms / 60_000;
    total_ms %= 60_000;
    let secs = total_ms / 1000;
    let millis = total_ms % 1000;

    format!("{:02}:{:02}:{:02}:{:03}", hours, minutes, secs, millis)
}

/// Parses `HH:MM:SS:mmm` into seconds. Returns `None` for anything else.
pub fn parse_time(text: &str) -> Option<f64> {
    let text = text.trim();
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() != 4 {
        return None;
    }

    let mut fields = [0u64; 4];
    for (slot, part) in fields.iter_mut().zip(&parts) {
        let part = part.trim();
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    let [h, m, s, ms] = fields;
    if m >= 60 || s >= 60 || ms >= 1000 {
        return None;
    }

    Some(h as f64 * 3600.0 + m as f64 * 60.0 + s as f64 + ms as f64 / 1000.0)
}

pub fn frames_to_seconds(frames: u64, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 / sample_rate as f64
}

pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> u64 {
    (seconds.max(0.0) * sample_rate as f64).round() as u64
}

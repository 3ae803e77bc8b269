//! Duration strings like "30s", "500ms", "5m", "1h30m", "1.5m".

use std::time::Duration;

/// Parse a duration string.
///
/// A bare number is taken as seconds. Otherwise the string is one or more
/// `<integer><unit>` pairs ("1h30m", "500ms"), or a single fractional
/// value with one of the `ms`, `s`, `m`, `h` suffixes ("1.5m"). Returns
/// `None` for anything else, including negative and overflowing values.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    humantime::parse_duration(s)
        .ok()
        .or_else(|| parse_fractional(s))
}

fn parse_fractional(s: &str) -> Option<Duration> {
    let (value, unit_secs) = if let Some(v) = s.strip_suffix("ms") {
        (v, 0.001)
    } else if let Some(v) = s.strip_suffix('s') {
        (v, 1.0)
    } else if let Some(v) = s.strip_suffix('m') {
        (v, 60.0)
    } else if let Some(v) = s.strip_suffix('h') {
        (v, 3600.0)
    } else {
        return None;
    };

    let value = value.trim();
    // Plain decimal with a point: no sign, exponent, "inf" or "nan".
    if !value.contains('.') || !value.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let value: f64 = value.parse().ok()?;
    Duration::try_from_secs_f64(value * unit_secs).ok()
}

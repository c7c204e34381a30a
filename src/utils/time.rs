//! Clock-text helpers shared by progress parsing and logging

use std::time::{Duration, SystemTime};

/// Parse an engine clock such as `00:01:23.45` into seconds.
///
/// Hours may have any number of digits; minutes and seconds are two digits.
/// Returns `None` for `N/A` or anything else that does not follow the grammar.
pub fn parse_clock_seconds(text: &str) -> Option<f64> {
    let mut parts = text.split(':');
    let hours = parts.next()?;
    let minutes = parts.next()?;
    let seconds = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(hours) || minutes.len() != 2 || !digits(minutes) {
        return None;
    }

    let (whole, fraction) = match seconds.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (seconds, None),
    };
    if whole.len() != 2 || !digits(whole) || fraction.is_some_and(|f| !digits(f)) {
        return None;
    }

    let hours: f64 = hours.parse().ok()?;
    let minutes: f64 = minutes.parse().ok()?;
    let seconds: f64 = seconds.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Age of a file modification time, zero when the clock went backwards
pub fn age_of(modified: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(modified).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock_seconds() {
        assert_eq!(parse_clock_seconds("00:00:45.00"), Some(45.0));
        assert_eq!(parse_clock_seconds("01:02:03"), Some(3723.0));
        assert_eq!(parse_clock_seconds("100:00:00.5"), Some(360_000.5));
    }

    #[test]
    fn test_parse_clock_seconds_rejects_garbage() {
        assert_eq!(parse_clock_seconds("N/A"), None);
        assert_eq!(parse_clock_seconds("00:00"), None);
        assert_eq!(parse_clock_seconds("00:0:01"), None);
        assert_eq!(parse_clock_seconds("-00:00:01"), None);
        assert_eq!(parse_clock_seconds("00:00:01.x"), None);
    }

    #[test]
    fn test_age_of_never_negative() {
        let now = SystemTime::now();
        let later = now + Duration::from_secs(5);
        assert_eq!(age_of(later, now), Duration::ZERO);
        assert_eq!(age_of(now, later), Duration::from_secs(5));
    }
}

//! Human-readable clip duration formatting
//!
//! Clips are short (at most a few minutes), so two formats cover them:
//! - Short format (`X.XXs`): under 100 seconds
//! - Medium format (`M:SS.Xs`): 100 seconds and up

use std::time::Duration;

/// Values below this use the short format
const SHORT_FORMAT_MAX_SECS: f64 = 100.0;

/// Format a clip duration for logs and listings
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use vavatar_common::human_time::format_clip_duration;
///
/// assert_eq!(format_clip_duration(Duration::from_secs(45)), "45.00s");
/// assert_eq!(format_clip_duration(Duration::from_millis(1_500)), "1.50s");
/// assert_eq!(format_clip_duration(Duration::from_secs(330)), "5:30.0s");
/// ```
pub fn format_clip_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();

    if seconds < SHORT_FORMAT_MAX_SECS {
        format!("{:.2}s", seconds)
    } else {
        let minutes = (seconds / 60.0).floor();
        let secs = seconds - minutes * 60.0;
        format!("{}:{:04.1}s", minutes as u64, secs)
    }
}

/// Milliseconds as an integer, saturating at `u64::MAX`
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_format_boundary() {
        assert_eq!(format_clip_duration(Duration::from_millis(99_990)), "99.99s");
        assert_eq!(format_clip_duration(Duration::from_secs(100)), "1:40.0s");
    }

    #[test]
    fn test_medium_format_pads_seconds() {
        assert_eq!(format_clip_duration(Duration::from_secs(305)), "5:05.0s");
        assert_eq!(format_clip_duration(Duration::from_millis(120_500)), "2:00.5s");
    }

    #[test]
    fn test_zero_duration() {
        assert_eq!(format_clip_duration(Duration::ZERO), "0.00s");
        assert_eq!(duration_ms(Duration::ZERO), 0);
    }

    #[test]
    fn test_duration_ms() {
        assert_eq!(duration_ms(Duration::from_secs(90)), 90_000);
    }
}

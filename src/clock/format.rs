use std::time::Duration;

const MS_PER_SECOND: u128 = 1_000;
const MS_PER_MINUTE: u128 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u128 = 60 * MS_PER_MINUTE;

/// Renders a duration as hours, minutes, seconds and milliseconds, largest unit first.
///
/// Leading zero units are omitted; milliseconds are always shown. Sub-millisecond
/// precision is truncated.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use tickvisor::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(1_050)), "1s 50ms");
/// assert_eq!(format_duration(Duration::from_millis(3_723_004)), "1h 2m 3s 4ms");
/// ```
pub fn format_duration(d: Duration) -> String {
    let mut rest = d.as_millis();
    let hours = rest / MS_PER_HOUR;
    rest -= hours * MS_PER_HOUR;
    let minutes = rest / MS_PER_MINUTE;
    rest -= minutes * MS_PER_MINUTE;
    let seconds = rest / MS_PER_SECOND;
    let millis = rest - seconds * MS_PER_SECOND;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s {millis}ms")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s {millis}ms")
    } else if seconds > 0 {
        format!("{seconds}s {millis}ms")
    } else {
        format!("{millis}ms")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_sub_millisecond() {
        assert_eq!(format_duration(Duration::ZERO), "0ms");
        assert_eq!(format_duration(Duration::from_micros(999)), "0ms");
    }

    #[test]
    fn test_inner_zero_units_are_kept() {
        assert_eq!(format_duration(Duration::from_secs(60)), "1m 0s 0ms");
        assert_eq!(format_duration(Duration::from_secs(3_600)), "1h 0m 0s 0ms");
    }

    #[test]
    fn test_hours_are_not_wrapped_into_days() {
        assert_eq!(
            format_duration(Duration::from_secs(50 * 3_600 + 1)),
            "50h 0m 1s 0ms"
        );
    }
}

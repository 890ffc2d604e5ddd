//! Display helpers for lap times and points.

/// Placeholder for a missing value.
pub const MISSING: &str = "—";

/// Format a duration in milliseconds as `S.mmm` or `M:SS.mmm`.
///
/// Negative durations show as zero.
#[must_use]
pub fn format_ms(ms: Option<i64>) -> String {
    let Some(total) = ms.map(|ms| ms.max(0)) else {
        return MISSING.to_string();
    };

    let minutes = total / 60_000;
    let seconds = (total % 60_000) / 1000;
    let millis = total % 1000;

    if minutes > 0 {
        format!("{minutes}:{seconds:02}.{millis:03}")
    } else {
        format!("{seconds}.{millis:03}")
    }
}

/// Format points without a trailing `.0` (`9.0` is `9`, `8.25` stays).
#[must_use]
pub fn format_points(value: Option<f64>) -> String {
    let Some(value) = value else {
        return MISSING.to_string();
    };

    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        let rounded = format!("{value:.3}");
        rounded.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ms_missing() {
        assert_eq!(format_ms(None), "—");
    }

    #[test]
    fn test_format_ms_under_a_minute() {
        assert_eq!(format_ms(Some(0)), "0.000");
        assert_eq!(format_ms(Some(9_045)), "9.045");
        assert_eq!(format_ms(Some(59_999)), "59.999");
    }

    #[test]
    fn test_format_ms_negative_clamps_to_zero() {
        assert_eq!(format_ms(Some(-1)), "0.000");
        assert_eq!(format_ms(Some(-61_000)), "0.000");
    }

    #[test]
    fn test_format_ms_with_minutes() {
        assert_eq!(format_ms(Some(60_000)), "1:00.000");
        assert_eq!(format_ms(Some(83_007)), "1:23.007");
    }

    #[test]
    fn test_format_points() {
        assert_eq!(format_points(None), "—");
        assert_eq!(format_points(Some(9.0)), "9");
        assert_eq!(format_points(Some(8.2)), "8.2");
        assert_eq!(format_points(Some(1.23456)), "1.235");
    }
}

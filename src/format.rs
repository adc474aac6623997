//! Display helpers for durations and paces.

/// Format seconds as `M:SS`, or `H:MM:SS` from one hour up.
pub fn format_duration(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Format a pace in seconds per km as `M:SS`.
///
/// Zero, negative or non-finite paces (no movement yet) render as `--:--`.
pub fn format_pace(sec_per_km: f64) -> String {
    if !sec_per_km.is_finite() || sec_per_km <= 0.0 {
        return "--:--".to_string();
    }
    let total = sec_per_km.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(65), "1:05");
        assert_eq!(format_duration(3599), "59:59");
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(3725), "1:02:05");
    }

    #[test]
    fn test_format_pace() {
        assert_eq!(format_pace(360.0), "6:00");
        assert_eq!(format_pace(299.6), "5:00");
        assert_eq!(format_pace(0.0), "--:--");
        assert_eq!(format_pace(f64::INFINITY), "--:--");
        assert_eq!(format_pace(f64::NAN), "--:--");
    }
}

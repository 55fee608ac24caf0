use chrono::DateTime;

use super::model::Timestamp;

/// Render a timestamp relative to `now` for display.
///
/// Under a minute is `now`, then minutes and hours, then a calendar date.
pub fn format_relative_time(timestamp: Timestamp, now: Timestamp) -> String {
    if timestamp <= 0 {
        return "unknown".to_string();
    }

    let elapsed = now - timestamp;
    if elapsed < 60 {
        "now".to_string()
    } else if elapsed < 3600 {
        format!("{}m ago", elapsed / 60)
    } else if elapsed < 86_400 {
        format!("{}h ago", elapsed / 3600)
    } else {
        DateTime::from_timestamp(timestamp, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: Timestamp = 1_700_000_000;

    #[test]
    fn test_buckets() {
        assert_eq!(format_relative_time(NOW - 59, NOW), "now");
        assert_eq!(format_relative_time(NOW - 60, NOW), "1m ago");
        assert_eq!(format_relative_time(NOW - 3599, NOW), "59m ago");
        assert_eq!(format_relative_time(NOW - 3600, NOW), "1h ago");
        assert_eq!(format_relative_time(NOW - 86_399, NOW), "23h ago");
    }

    #[test]
    fn test_older_than_a_day_is_a_date() {
        // 2023-11-14T22:13:20Z
        assert_eq!(format_relative_time(NOW - 86_400, NOW), "2023-11-13");
    }

    #[test]
    fn test_future_and_unknown() {
        assert_eq!(format_relative_time(NOW + 30, NOW), "now");
        assert_eq!(format_relative_time(0, NOW), "unknown");
    }
}

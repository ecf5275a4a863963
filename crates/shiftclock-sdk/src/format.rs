// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Display formatting for elapsed durations.

use chrono::Duration;

/// Format a millisecond duration as `HH:MM:SS`.
///
/// Negative inputs clamp to `00:00:00`; hours grow past two digits rather
/// than wrapping.
pub fn format_time(duration_ms: i64) -> String {
    let total_seconds = (duration_ms / 1000).max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// [`format_time`] for a [`chrono::Duration`].
pub fn format_duration(duration: Duration) -> String {
    format_time(duration.num_milliseconds())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "00:00:00");
        assert_eq!(format_time(999), "00:00:00");
        assert_eq!(format_time(1_000), "00:00:01");
        assert_eq!(format_time(61_000), "00:01:01");
        assert_eq!(format_time(3_600_000), "01:00:00");
        // 8h45m, the classic full-day net
        assert_eq!(format_time(31_500_000), "08:45:00");
    }

    #[test]
    fn test_format_time_clamps_negative() {
        assert_eq!(format_time(-5_000), "00:00:00");
    }

    #[test]
    fn test_format_time_long_sessions() {
        assert_eq!(format_time(100 * 3_600_000), "100:00:00");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::minutes(90)), "01:30:00");
    }
}

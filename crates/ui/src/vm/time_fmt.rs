use chrono::{DateTime, Utc};
use exam_core::ClockFace;

/// `MM:SS` label for the countdown.
#[must_use]
pub fn format_clock(seconds: u32) -> String {
    ClockFace(seconds).to_string()
}

#[must_use]
pub fn format_duration_minutes(minutes: u32) -> String {
    match minutes {
        1 => "1 minute".to_string(),
        n => format!("{n} minutes"),
    }
}

#[must_use]
pub fn format_started_at(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d %H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::time::fixed_now;

    #[test]
    fn clock_pads_minutes_and_seconds() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(5_400), "90:00");
    }

    #[test]
    fn duration_is_pluralised() {
        assert_eq!(format_duration_minutes(1), "1 minute");
        assert_eq!(format_duration_minutes(45), "45 minutes");
    }

    #[test]
    fn started_at_is_minute_precision() {
        assert_eq!(format_started_at(fixed_now()), "2023-11-14 22:13 UTC");
    }
}

//! Display helpers shared by the player surfaces.

use chrono::{Datelike, NaiveDate, Weekday};

/// `m:ss` for a position in seconds. Non-finite or negative input gives
/// `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// `YYYY-MM-DD DOW` for an episode.
///
/// Uses `episode_id` when it is a plain date, else the date part of
/// `created_at`. Returns `episode_id` unchanged when neither parses.
pub fn format_episode_title(episode_id: &str, created_at: Option<&str>) -> String {
    let date = parse_plain_date(episode_id).or_else(|| {
        created_at
            .and_then(|value| value.split([' ', 'T']).next())
            .and_then(parse_plain_date)
    });

    match date {
        Some(date) => format!("{} {}", date.format("%Y-%m-%d"), weekday_label(date.weekday())),
        None => episode_id.to_string(),
    }
}

fn parse_plain_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MON",
        Weekday::Tue => "TUE",
        Weekday::Wed => "WED",
        Weekday::Thu => "THU",
        Weekday::Fri => "FRI",
        Weekday::Sat => "SAT",
        Weekday::Sun => "SUN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(5.9), "0:05");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(3_600.0), "60:00");
    }

    #[test]
    fn test_format_time_rejects_nonsense() {
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
    }

    #[test]
    fn test_episode_title_from_date_id() {
        assert_eq!(format_episode_title("2025-04-09", None), "2025-04-09 WED");
    }

    #[test]
    fn test_episode_title_from_created_at() {
        assert_eq!(
            format_episode_title("ep-42", Some("2025-04-13 07:30:00")),
            "2025-04-13 SUN"
        );
        assert_eq!(
            format_episode_title("ep-42", Some("2025-04-14T07:30:00Z")),
            "2025-04-14 MON"
        );
    }

    #[test]
    fn test_episode_title_falls_back_to_id() {
        assert_eq!(format_episode_title("latest", None), "latest");
        assert_eq!(format_episode_title("latest", Some("yesterday")), "latest");
        assert_eq!(format_episode_title("2025-13-40", None), "2025-13-40");
    }
}

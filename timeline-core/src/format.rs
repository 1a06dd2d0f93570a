//! Text helpers shared by the timeline, search index and comment thread.

use chrono::{DateTime, Utc};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// "March 2023". Months outside 1..=12 fall back to the number.
pub fn format_date(month: u32, year: i32) -> String {
    match month_name(month) {
        Some(name) => format!("{name} {year}"),
        None => format!("{month}/{year}"),
    }
}

/// "Mar 2023".
pub fn format_date_short(month: u32, year: i32) -> String {
    match month_name(month) {
        Some(name) => format!("{} {year}", &name[..3]),
        None => format!("{month}/{year}"),
    }
}

fn month_name(month: u32) -> Option<&'static str> {
    let index = usize::try_from(month).ok()?.checked_sub(1)?;
    MONTH_NAMES.get(index).copied()
}

/// "3 hours ago" style label. Future timestamps read as "just now".
pub fn relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(timestamp).num_seconds().max(0);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let weeks = days / 7;
    let months = days / 30;
    let years = days / 365;

    if seconds < 60 {
        return "just now".to_string();
    }
    let (amount, unit) = if minutes < 60 {
        (minutes, "minute")
    } else if hours < 24 {
        (hours, "hour")
    } else if days < 7 {
        (days, "day")
    } else if weeks < 4 {
        (weeks, "week")
    } else if months < 12 {
        (months, "month")
    } else {
        (years, "year")
    };
    let plural = if amount > 1 { "s" } else { "" };
    format!("{amount} {unit}{plural} ago")
}

/// Number of filled stars when a 1-10 rating is shown on a five star scale.
pub fn filled_stars(rating: u8) -> u8 {
    (rating.min(10) + 1) / 2
}

/// "★★★★☆ 8/10".
pub fn star_rating(rating: u8) -> String {
    let filled = usize::from(filled_stars(rating));
    format!(
        "{}{} {}/10",
        "★".repeat(filled),
        "☆".repeat(5 - filled),
        rating
    )
}

/// Cuts `text` to `length` characters and appends "..." when it was longer.
pub fn truncate(text: &str, length: usize) -> String {
    match text.char_indices().nth(length) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn formats_month_names() {
        assert_eq!(format_date(3, 2023), "March 2023");
        assert_eq!(format_date_short(9, 1999), "Sep 1999");
        assert_eq!(format_date(13, 2023), "13/2023");
    }

    #[test]
    fn relative_time_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(relative_time(now - Duration::seconds(20), now), "just now");
        assert_eq!(relative_time(now - Duration::minutes(1), now), "1 minute ago");
        assert_eq!(relative_time(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(relative_time(now - Duration::days(15), now), "2 weeks ago");
        assert_eq!(relative_time(now - Duration::days(90), now), "3 months ago");
        assert_eq!(relative_time(now - Duration::days(800), now), "2 years ago");
        assert_eq!(relative_time(now + Duration::hours(1), now), "just now");
    }

    #[test]
    fn stars_scale_to_five() {
        assert_eq!(filled_stars(10), 5);
        assert_eq!(filled_stars(7), 4);
        assert_eq!(filled_stars(1), 1);
        assert_eq!(star_rating(6), "★★★☆☆ 6/10");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
        assert_eq!(truncate("short", 10), "short");
    }
}

use chrono::{DateTime, Local, TimeZone};

/// Row date label: `3:07 PM` for messages from today, `3/14` otherwise.
/// Unparseable timestamps give an empty label.
pub fn format_date_time(ts_ms: i64, now: &DateTime<Local>) -> String {
    let Some(when) = Local.timestamp_millis_opt(ts_ms).single() else {
        return String::new();
    };

    if when.date_naive() == now.date_naive() {
        when.format("%-I:%M %p").to_string()
    } else {
        when.format("%-m/%-d").to_string()
    }
}

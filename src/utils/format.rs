use std::time::Duration;

/// Format a position for the time labels, `m:ss` or `h:mm:ss` past an hour.
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

pub fn format_millis(millis: u64) -> String {
    format_duration(Duration::from_millis(millis))
}

//! Clock-style rendering of durations and timestamps.

use chrono::{DateTime, Local, Utc};

/// Render a duration as `H:MM:SS`, or `D H:MM:SS` past 24 hours.
///
/// Minutes and seconds are zero-padded over the 60/60/24 radix chain;
/// hours and days are not. Negative inputs clamp to zero.
pub fn duration_label(ms: i64) -> String {
    let total = (ms / 1000).max(0);
    let seconds = total % 60;
    let minutes = (total / 60) % 60;
    let hours = (total / 3600) % 24;
    let days = total / 86_400;
    if days > 0 {
        format!("{days} {hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours}:{minutes:02}:{seconds:02}")
    }
}

/// Tray title while an entry is running: `" H:MM:SS - {client}"`.
pub fn tray_title(start: DateTime<Utc>, client_name: &str, now: DateTime<Utc>) -> String {
    let elapsed = (now - start).num_milliseconds();
    format!(" {} - {}", duration_label(elapsed), client_name)
}

/// A timestamp as local wall-clock time.
pub fn local_time(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%H:%M:%S").to_string()
}

/// Started-at label: wall-clock time for starts under twelve hours old,
/// full date plus time beyond that.
pub fn started_at_label(start: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if now - start > chrono::Duration::hours(12) {
        start
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    } else {
        local_time(start)
    }
}

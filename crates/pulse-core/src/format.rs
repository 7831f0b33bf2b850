//! Human-readable renderings of second counts.

/// `m:ss`, e.g. `44:59`.
pub fn format_clock(total_secs: u64) -> String {
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Compact form used in listings: `2m 30s` or `45s`.
pub fn format_minutes_seconds(total_secs: u64) -> String {
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Form used by voice guidance: `2 minutes and 5 seconds`, `1 minute`, `30 seconds`.
pub fn spoken_duration(total_secs: u64) -> String {
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    if minutes > 0 && seconds > 0 {
        format!("{minutes} minutes and {seconds} seconds")
    } else if minutes > 0 {
        format!("{minutes} minute{}", if minutes == 1 { "" } else { "s" })
    } else {
        format!("{seconds} second{}", if seconds == 1 { "" } else { "s" })
    }
}

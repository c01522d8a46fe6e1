//! Display formatting shared by the screens.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};

/// Traffic volume as "12.40".
pub fn mbps(value: f64) -> String {
    format!("{value:.2}")
}

/// Local wall-clock time, or "─" when the backend sent no timestamp.
pub fn clock(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(
        || "─".into(),
        |t| t.with_timezone(&Local).format("%H:%M:%S").to_string(),
    )
}

/// Coarse age for title bars: "just now", "12s ago", "3m ago".
pub fn age(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(5) {
        return "just now".into();
    }
    let rounded = Duration::from_secs(elapsed.as_secs());
    let rounded = if rounded >= Duration::from_secs(60) {
        Duration::from_secs(rounded.as_secs() / 60 * 60)
    } else {
        rounded
    };
    format!("{} ago", humantime::format_duration(rounded))
}

/// Truncate to `width` characters, marking the cut with "…".
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_owned();
    }
    let keep = width.saturating_sub(1);
    let mut out: String = text.chars().take(keep).collect();
    out.push('…');
    out
}

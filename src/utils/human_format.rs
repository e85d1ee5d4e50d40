//! Human-readable formatting for run summaries

use std::time::Duration;

/// Formats an elapsed duration ("850ms", "4.20s", "2m5s", "1h3m")
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis() as u64;
    if millis < 1000 {
        return format!("{millis}ms");
    }
    if millis < 60_000 {
        let seconds = millis as f64 / 1000.0;
        return if seconds >= 10.0 {
            format!("{seconds:.1}s")
        } else {
            format!("{seconds:.2}s")
        };
    }

    let total_seconds = millis / 1000;
    if total_seconds < 3600 {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        return if seconds == 0 {
            format!("{minutes}m")
        } else {
            format!("{minutes}m{seconds}s")
        };
    }

    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    if minutes == 0 {
        format!("{hours}h")
    } else {
        format!("{hours}h{minutes}m")
    }
}

/// Formats a byte count with binary units
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{size:.2}{}", UNITS[unit])
    }
}

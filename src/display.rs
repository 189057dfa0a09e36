//! Strings handed to the display sink: elapsed time, distance and pace.

/// Below this distance the pace is shown as `"-"` instead of dividing by ~0.
pub const PACE_MIN_DISTANCE: f64 = 0.01;

/// Placeholder rendered when no meaningful pace exists yet.
pub const NO_PACE: &str = "-";

/// Renders seconds as `H:MM:SS` when at least an hour has passed, else `MM:SS`.
///
/// Fractional seconds are truncated. Negative or non-finite input renders as
/// `00:00`.
pub fn convert_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

pub fn format_distance(distance: f64) -> String {
    format!("{:.2}", distance.max(0.0))
}

/// Time per unit of distance, or `"-"` while the distance is under
/// [`PACE_MIN_DISTANCE`].
pub fn format_pace(elapsed_seconds: f64, distance: f64) -> String {
    if distance.is_nan() || distance < PACE_MIN_DISTANCE {
        return NO_PACE.to_string();
    }
    convert_time(elapsed_seconds / distance)
}

use super::Dialect;
use crate::error::{Result, YtWhisperError};

/// Format a seconds offset as `HH:MM:SS<sep>mmm` for the given dialect.
///
/// The value is rounded to the nearest millisecond (half away from zero) before
/// being split into its components.
pub fn format_timestamp(seconds: f64, dialect: Dialect) -> Result<String> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(YtWhisperError::InvalidTimestamp(format!(
            "{seconds} is not a non-negative finite offset"
        )));
    }

    let total_ms = (seconds * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    Ok(format!(
        "{:02}:{:02}:{:02}{}{:03}",
        hours,
        minutes,
        secs,
        dialect.millis_separator(),
        millis
    ))
}

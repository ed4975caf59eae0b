use std::time::Duration;

use crate::error::AppError;

/// Parse a duration with an optional unit (s, m, h, d). A bare number is seconds.
pub fn parse_duration(time_str: &str) -> Result<Duration, AppError> {
    let time_str = time_str.trim();
    if time_str.is_empty() {
        return Err(AppError::ParseError("Invalid format: empty string".to_string()));
    }

    if let Ok(seconds) = time_str.parse::<f64>() {
        return to_duration(seconds);
    }

    let split_index = time_str
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit() && *c != '.')
        .map(|(i, _)| i)
        .unwrap_or(time_str.len());

    let numeric_part = &time_str[..split_index];
    let unit_part = time_str[split_index..].trim().to_lowercase();

    let value = numeric_part
        .parse::<f64>()
        .map_err(|_| AppError::ParseError(format!("Invalid number in `{time_str}`")))?;

    match unit_part.as_str() {
        "s" => to_duration(value),
        "m" => to_duration(value * 60.0),
        "h" => to_duration(value * 3600.0),
        "d" => to_duration(value * 86_400.0),
        _ => Err(AppError::ParseError(format!("Invalid unit in `{time_str}`"))),
    }
}

fn to_duration(seconds: f64) -> Result<Duration, AppError> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| AppError::ParseError(format!("Invalid duration: {seconds}")))
}

/// Human-readable age such as `3.50h`
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();
    if seconds >= 86_400.0 {
        format!("{:.2}d", seconds / 86_400.0)
    } else if seconds >= 3600.0 {
        format!("{:.2}h", seconds / 3600.0)
    } else if seconds >= 60.0 {
        format!("{:.2}m", seconds / 60.0)
    } else {
        format!("{seconds:.2}s")
    }
}

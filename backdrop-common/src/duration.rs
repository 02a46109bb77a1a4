use std::time::Duration;
use std::str::FromStr;
use anyhow::{Result, Context};

pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    humantime::Duration::from_str(duration_str)
        .map(|d| d.into())
        .with_context(|| format!("Invalid duration format: {}", duration_str))
}

/// Milliseconds from either a bare number (`"1500"`) or a humantime
/// string (`"2m"`, `"1s 500ms"`).
pub fn parse_millis(value: &str) -> Result<u64> {
    let value = value.trim();
    if let Ok(ms) = value.parse::<u64>() {
        return Ok(ms);
    }
    let duration = parse_duration(value)?;
    u64::try_from(duration.as_millis())
        .with_context(|| format!("Duration too long: {}", value))
}

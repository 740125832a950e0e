// Clock display: seconds <-> "M:SS".

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseClockError {
    #[error("empty clock value")]
    Empty,
    #[error("invalid minutes in clock value `{0}`")]
    InvalidMinutes(String),
    #[error("invalid seconds in clock value `{0}` (expected two digits, 00-59)")]
    InvalidSeconds(String),
}

/// Format a countdown value as `M:SS` (e.g. 500 -> `8:20`, 1200 -> `20:00`).
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Parse `M:SS` back into seconds. A bare integer is taken as seconds.
pub fn parse_clock(input: &str) -> Result<u32, ParseClockError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ParseClockError::Empty);
    }

    let Some((mins, secs)) = s.split_once(':') else {
        return s
            .parse::<u32>()
            .map_err(|_| ParseClockError::InvalidSeconds(s.to_string()));
    };

    let minutes: u32 = mins
        .parse()
        .map_err(|_| ParseClockError::InvalidMinutes(s.to_string()))?;

    if secs.len() != 2 || !secs.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseClockError::InvalidSeconds(s.to_string()));
    }
    let seconds: u32 = secs
        .parse()
        .map_err(|_| ParseClockError::InvalidSeconds(s.to_string()))?;
    if seconds >= 60 {
        return Err(ParseClockError::InvalidSeconds(s.to_string()));
    }

    minutes
        .checked_mul(60)
        .and_then(|m| m.checked_add(seconds))
        .ok_or_else(|| ParseClockError::InvalidMinutes(s.to_string()))
}

use serde_json::Value;

use crate::utils::TimerError;

/// Reads a duration in seconds from request input.
///
/// Numbers are truncated toward zero. Strings are read like an integer
/// prefix, so `"10"` and `"10s"` both give 10. Sign checks are left to
/// `TimerRegistry::start`.
pub fn parse_duration(value: &Value) -> Result<i64, TimerError> {
    match value {
        Value::Number(number) => {
            if let Some(seconds) = number.as_i64() {
                Ok(seconds)
            } else if number.as_u64().is_some() {
                Err(TimerError::invalid_duration("too large"))
            } else {
                match number.as_f64() {
                    Some(seconds) if seconds.is_finite() => Ok(seconds.trunc() as i64),
                    _ => Err(TimerError::invalid_duration("not a number")),
                }
            }
        }
        Value::String(text) => parse_integer_prefix(text),
        Value::Null => Err(TimerError::invalid_duration("duration is required")),
        _ => Err(TimerError::invalid_duration("not a number")),
    }
}

fn parse_integer_prefix(text: &str) -> Result<i64, TimerError> {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(TimerError::invalid_duration("not a number"));
    }

    let magnitude: i64 = rest[..digits_len]
        .parse()
        .map_err(|_| TimerError::invalid_duration("too large"))?;

    Ok(if negative { -magnitude } else { magnitude })
}

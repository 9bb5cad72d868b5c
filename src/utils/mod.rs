//! Project-specific utilities live here.

/// Lenient integer parse for identifiers taken from URL paths.
///
/// Skips leading whitespace, accepts an optional sign, then reads the leading
/// run of ASCII digits; anything after it is ignored (`"12abc"` is `12`).
/// Returns `None` when no digit follows, or when the value does not fit.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    let magnitude: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

// Duration literals.
//
// InfluxQL durations are integer counts of a single unit (`10m`, `1h`, `2w`).
// The base resolution is one microsecond; a bare digit string is a
// microsecond count.

use std::fmt;

use thiserror::Error;

/// Returned when parsing a malformed duration string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid duration")]
pub struct InvalidDuration;

/// A span of time with microsecond resolution.
///
/// Negative durations are representable (the numeric prefix of a duration
/// string is signed) but never produced by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(i64);

const MICROSECOND: i64 = 1;
const MILLISECOND: i64 = 1_000 * MICROSECOND;
const SECOND: i64 = 1_000 * MILLISECOND;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

impl Duration {
    /// The zero-length duration.
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn microseconds(n: i64) -> Self {
        Self(n)
    }

    #[must_use]
    pub const fn milliseconds(n: i64) -> Self {
        Self(n * MILLISECOND)
    }

    #[must_use]
    pub const fn seconds(n: i64) -> Self {
        Self(n * SECOND)
    }

    #[must_use]
    pub const fn minutes(n: i64) -> Self {
        Self(n * MINUTE)
    }

    #[must_use]
    pub const fn hours(n: i64) -> Self {
        Self(n * HOUR)
    }

    #[must_use]
    pub const fn days(n: i64) -> Self {
        Self(n * DAY)
    }

    #[must_use]
    pub const fn weeks(n: i64) -> Self {
        Self(n * WEEK)
    }

    /// Total number of microseconds.
    #[must_use]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration(*self))
    }
}

/// Parse a duration string such as `10m`, `250ms` or `4`.
///
/// A single digit, or any string ending in a digit, is a microsecond count.
/// Otherwise the unit is the trailing `ms` pair or the final character, one
/// of `u`, `µ`, `s`, `m`, `h`, `d`, `w`. The numeric prefix is a signed
/// base-10 integer.
pub fn parse_duration(s: &str) -> Result<Duration, InvalidDuration> {
    if s.is_empty() {
        return Err(InvalidDuration);
    }

    // A one-character duration must be a digit, read as microseconds.
    if s.len() == 1 {
        return match s.parse::<i64>() {
            Ok(n) => Ok(Duration::microseconds(n)),
            Err(_) => Err(InvalidDuration),
        };
    }

    let last = s.chars().next_back().ok_or(InvalidDuration)?;
    let (num, unit) = if last.is_ascii_digit() {
        (s, "u")
    } else if s.len() > 2 && s.ends_with("ms") {
        (&s[..s.len() - 2], "ms")
    } else {
        let cut = s.len() - last.len_utf8();
        (&s[..cut], &s[cut..])
    };

    let n: i64 = num.parse().map_err(|_| InvalidDuration)?;

    let scale = match unit {
        "u" | "µ" => MICROSECOND,
        "ms" => MILLISECOND,
        "s" => SECOND,
        "m" => MINUTE,
        "h" => HOUR,
        "d" => DAY,
        "w" => WEEK,
        _ => return Err(InvalidDuration),
    };
    n.checked_mul(scale)
        .map(Duration::microseconds)
        .ok_or(InvalidDuration)
}

/// Format a duration using the largest unit that divides it exactly.
///
/// Falls back to a bare microsecond count when no unit divides evenly.
/// Zero formats as `0s`.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let us = d.as_micros();
    if us == 0 {
        "0s".to_owned()
    } else if us % WEEK == 0 {
        format!("{}w", us / WEEK)
    } else if us % DAY == 0 {
        format!("{}d", us / DAY)
    } else if us % HOUR == 0 {
        format!("{}h", us / HOUR)
    } else if us % MINUTE == 0 {
        format!("{}m", us / MINUTE)
    } else if us % SECOND == 0 {
        format!("{}s", us / SECOND)
    } else if us % MILLISECOND == 0 {
        format!("{}ms", us / MILLISECOND)
    } else {
        format!("{us}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_digit_is_microseconds() {
        assert_eq!(parse_duration("3"), Ok(Duration::microseconds(3)));
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_duration("10u"), Ok(Duration::microseconds(10)));
        assert_eq!(parse_duration("10µ"), Ok(Duration::microseconds(10)));
        assert_eq!(parse_duration("15ms"), Ok(Duration::milliseconds(15)));
        assert_eq!(parse_duration("100s"), Ok(Duration::seconds(100)));
        assert_eq!(parse_duration("10m"), Ok(Duration::minutes(10)));
        assert_eq!(parse_duration("3h"), Ok(Duration::hours(3)));
        assert_eq!(parse_duration("2d"), Ok(Duration::days(2)));
        assert_eq!(parse_duration("1w"), Ok(Duration::weeks(1)));
    }

    #[test]
    fn test_parse_trailing_digit_is_microseconds() {
        assert_eq!(parse_duration("1000"), Ok(Duration::milliseconds(1)));
        assert_eq!(parse_duration("10s5"), Err(InvalidDuration));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(parse_duration(""), Err(InvalidDuration));
        assert_eq!(parse_duration("w"), Err(InvalidDuration));
        assert_eq!(parse_duration("ms"), Err(InvalidDuration));
        assert_eq!(parse_duration("10x"), Err(InvalidDuration));
        assert_eq!(parse_duration("10 m"), Err(InvalidDuration));
        assert_eq!(parse_duration("1.5h"), Err(InvalidDuration));
    }

    #[test]
    fn test_parse_negative() {
        assert_eq!(parse_duration("-10m"), Ok(Duration::minutes(-10)));
    }

    #[test]
    fn test_parse_overflow() {
        assert_eq!(parse_duration("99999999999999999w"), Err(InvalidDuration));
    }

    #[test]
    fn test_format_picks_largest_exact_unit() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::weeks(2)), "2w");
        assert_eq!(format_duration(Duration::days(3)), "3d");
        assert_eq!(format_duration(Duration::days(7)), "1w");
        assert_eq!(format_duration(Duration::hours(25)), "25h");
        assert_eq!(format_duration(Duration::minutes(90)), "90m");
        assert_eq!(format_duration(Duration::seconds(10)), "10s");
        assert_eq!(format_duration(Duration::milliseconds(250)), "250ms");
        assert_eq!(format_duration(Duration::microseconds(500)), "500");
    }

    #[test]
    fn test_round_trip() {
        for s in ["1w", "3d", "26h", "61m", "59s", "999ms", "10m"] {
            let d = parse_duration(s).unwrap();
            assert_eq!(format_duration(d), s, "canonical form of {s}");
            assert_eq!(parse_duration(&format_duration(d)), Ok(d));
        }
    }
}

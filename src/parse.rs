use memchr::memchr;

pub const DELIMITER: u8 = b';';

/// Splits a record at the first `;` and parses the rest as an `f64`.
///
/// Returns `None` for lines without a delimiter or with a value that is not a
/// finite number (`NaN` and `inf` are refused). Such lines are dropped by the
/// caller without further notice.
#[inline]
pub fn parse_line(line: &[u8]) -> Option<(&[u8], f64)> {
    let semi = memchr(DELIMITER, line)?;
    let value = lexical_core::parse::<f64>(&line[semi + 1..]).ok()?;
    if !value.is_finite() {
        return None;
    }
    Some((&line[..semi], value))
}

/// Strips a trailing `\n` and then a trailing `\r`.
#[inline]
pub fn trim_line(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_key_and_value() {
        assert_eq!(parse_line(b"Paris;12.3"), Some((&b"Paris"[..], 12.3)));
        assert_eq!(parse_line(b"Tokyo;-4"), Some((&b"Tokyo"[..], -4.0)));
        assert_eq!(parse_line(b"Oslo;+0.5"), Some((&b"Oslo"[..], 0.5)));
    }

    #[test]
    fn splits_at_first_delimiter() {
        // The remainder "1;2" is not a number, so the line is dropped.
        assert_eq!(parse_line(b"A;1;2"), None);
    }

    #[test]
    fn skips_malformed_lines() {
        assert_eq!(parse_line(b"BadLine"), None);
        assert_eq!(parse_line(b"City;notanumber"), None);
        assert_eq!(parse_line(b""), None);
    }

    #[test]
    fn skips_non_finite_values() {
        assert_eq!(parse_line(b"k;NaN"), None);
        assert_eq!(parse_line(b"k;nan"), None);
        assert_eq!(parse_line(b"k;inf"), None);
        assert_eq!(parse_line(b"k;-Infinity"), None);
        assert_eq!(parse_line(b"k;1e400"), None);
        assert_eq!(parse_line(b"k;5"), Some((&b"k"[..], 5.0)));
    }

    #[test]
    fn skips_missing_value() {
        // A record cut short right after the delimiter looks the same as a
        // record that never had a value.
        assert_eq!(parse_line(b"Paris;"), None);
        assert_eq!(parse_line(b";"), None);
    }

    #[test]
    fn empty_key_is_kept() {
        assert_eq!(parse_line(b";1.5"), Some((&b""[..], 1.5)));
    }

    #[test]
    fn trims_line_terminators() {
        assert_eq!(trim_line(b"Paris;1.0\n"), b"Paris;1.0");
        assert_eq!(trim_line(b"Paris;1.0\r\n"), b"Paris;1.0");
        assert_eq!(trim_line(b"Paris;1.0"), b"Paris;1.0");
        assert_eq!(trim_line(b"\n"), b"");
    }
}

//! Lenient field parsing for dataset text columns.

use once_cell::sync::Lazy;
use regex::Regex;

static YEAR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]{4}").unwrap());

/// Extract the year key from free-form year text.
///
/// Returns the leftmost run of four ASCII digits, or an empty string when
/// the text has none. `"1951-52"` keys on `1951`, `"1999-2000"` on `1999`.
pub fn extract_year(text: &str) -> &str {
    YEAR_PATTERN.find(text).map_or("", |m| m.as_str())
}

/// Parse the leading decimal number of a text field.
///
/// Surrounding whitespace is ignored and so is anything after the numeric
/// prefix (`"12.5 t"` is 12.5). Returns `None` when there is no numeric
/// prefix or the value is not finite; callers substitute zero.
pub fn parse_numeric(text: &str) -> Option<f64> {
    let prefix = numeric_prefix(text.trim());
    if prefix.is_empty() {
        return None;
    }

    prefix.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Longest prefix shaped like `[+-]digits[.[digits]][e[+-]digits]`.
fn numeric_prefix(text: &str) -> &str {
    let bytes = text.as_bytes();
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    let integer_digits = digits_from(end);
    end += integer_digits;

    let mut fraction_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction_digits = digits_from(end + 1);
        // "1." is a complete number and may still carry an exponent ("1.e5").
        if integer_digits + fraction_digits > 0 {
            end += 1 + fraction_digits;
        }
    }

    if integer_digits + fraction_digits == 0 {
        return "";
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exponent_digits = digits_from(end + 1 + sign);
        if exponent_digits > 0 {
            end += 1 + sign + exponent_digits;
        }
    }

    &text[..end]
}

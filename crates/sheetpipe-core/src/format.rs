//! Cell value display formatting.
//!
//! Reproduces what a spreadsheet application shows in the cell:
//! - numbers render through a general decimal pattern (up to 30 fractional
//!   digits, never scientific notation, shortest round-trip digits so
//!   `0.1` stays `0.1` and `1000000` stays `1000000`);
//! - date-formatted numbers render as dates, always with 4-digit years;
//! - text-formatted (`@`) numeric cells still use the general pattern.
//!
//! Formatting never fails: an unusable format code degrades to the general
//! pattern.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::number_format::NumberFormat;

/// Maximum fractional digits the general pattern renders.
const MAX_FRACTION_DIGITS: usize = 30;

/// Format a numeric cell value for display under the given number format.
///
/// `date_1904` selects the workbook's serial date epoch.
pub fn format_number(value: f64, format: &NumberFormat, date_1904: bool) -> String {
    if format.is_date() {
        if let Some(dt) = serial_to_datetime(value, date_1904) {
            return format_datetime(&dt, format.code());
        }
        // Out-of-range serial: fall through to the numeric pattern
    }
    general_decimal(value)
}

/// Render a number through the general decimal pattern.
///
/// `f64`'s `Display` already gives the shortest round-trip digits in plain
/// (never scientific) notation, so `1e21` renders as `1000000000000000000000`
/// and `0.1` as `0.1`. The fractional part is then capped at
/// [`MAX_FRACTION_DIGITS`] digits (rounding half-up).
pub fn general_decimal(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    cap_fraction(format!("{value}"), MAX_FRACTION_DIGITS)
}

/// Normalize a number the way the XLS record decoder does: integral values
/// print with no decimal places, everything else via default conversion.
pub fn xls_number(value: f64) -> String {
    if value.is_finite() && value == value.trunc() {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Cap the fractional part of a plain decimal string at `max` digits,
/// rounding half-up, then trim trailing zeros and a trailing point.
fn cap_fraction(s: String, max: usize) -> String {
    let dot = match s.find('.') {
        Some(d) => d,
        None => return s,
    };
    if s.len() - dot - 1 <= max {
        return s;
    }

    let negative = s.starts_with('-');
    let unsigned = if negative { &s[1..] } else { &s[..] };
    let dot = if negative { dot - 1 } else { dot };
    let keep = dot + 1 + max;
    let round_up = unsigned.as_bytes()[keep] >= b'5';

    let mut digits: Vec<u8> = unsigned[..keep].bytes().collect();
    if round_up {
        let mut i = digits.len();
        loop {
            if i == 0 {
                digits.insert(0, b'1');
                break;
            }
            i -= 1;
            if digits[i] == b'.' {
                continue;
            }
            if digits[i] == b'9' {
                digits[i] = b'0';
            } else {
                digits[i] += 1;
                break;
            }
        }
    }

    let mut out = String::from_utf8(digits).unwrap_or_default();
    while out.ends_with('0') {
        out.pop();
    }
    if out.ends_with('.') {
        out.pop();
    }
    if out.is_empty() || out == "0" {
        return "0".into();
    }
    if negative {
        out.insert(0, '-');
    }
    out
}

/// Convert an Excel serial date to a calendar date/time.
///
/// The 1900 date system counts from an epoch that pretends 1900 was a leap
/// year: serials below 60 are offset by one day relative to serials above.
/// The 1904 system counts plain days from 1904-01-01.
pub fn serial_to_datetime(serial: f64, date_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > 2_958_465.0 {
        return None;
    }

    let days = serial.trunc() as i64;
    let day_fraction = serial.fract();

    let base = if date_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if days >= 60 {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    };

    let millis = (day_fraction * 86_400_000.0).round() as i64;
    base.and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::milliseconds(millis))
}

/// Render a date/time using a spreadsheet format code, with years always
/// widened to 4 digits.
///
/// The code is translated token-by-token into a chrono pattern; anything
/// that doesn't translate falls back to an ISO-style rendering (which also
/// has a 4-digit year).
fn format_datetime(dt: &NaiveDateTime, code: &str) -> String {
    match translate_date_code(code) {
        Some(pattern) => dt.format(&pattern).to_string(),
        None => dt.format("%Y-%m-%d").to_string(),
    }
}

/// Translate a spreadsheet date format code into a chrono strftime pattern.
///
/// `m` is ambiguous: it means minutes when adjacent to an hour or second
/// token, month otherwise. Returns `None` when the code yields no
/// date/time tokens at all.
fn translate_date_code(code: &str) -> Option<String> {
    let mut pattern = String::new();
    let mut tokens = 0usize;
    let twelve_hour = {
        let upper = code.to_ascii_uppercase();
        upper.contains("AM/PM") || upper.contains("A/P")
    };

    let chars: Vec<char> = code.chars().collect();
    let mut i = 0;
    let mut last_was_hour = false;

    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|&&x| x == c).count();

        match c.to_ascii_lowercase() {
            '"' => {
                // Quoted literal
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    push_literal(&mut pattern, chars[i]);
                    i += 1;
                }
                i += 1;
                continue;
            }
            '\\' => {
                if i + 1 < chars.len() {
                    push_literal(&mut pattern, chars[i + 1]);
                }
                i += 2;
                continue;
            }
            '[' => {
                // Elapsed-hour sections like [h] render as plain hours
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
                i += 1;
                pattern.push_str("%H");
                tokens += 1;
                last_was_hour = true;
                continue;
            }
            'a' => {
                // AM/PM or A/P marker
                let upper: String = chars[i..].iter().collect::<String>().to_ascii_uppercase();
                if upper.starts_with("AM/PM") {
                    pattern.push_str("%p");
                    tokens += 1;
                    i += 5;
                    continue;
                }
                if upper.starts_with("A/P") {
                    pattern.push_str("%p");
                    tokens += 1;
                    i += 3;
                    continue;
                }
                push_literal(&mut pattern, c);
                i += 1;
                continue;
            }
            'y' => {
                // Always 4-digit years
                pattern.push_str("%Y");
                tokens += 1;
                last_was_hour = false;
            }
            'd' => {
                pattern.push_str(match run {
                    1 => "%-d",
                    2 => "%d",
                    3 => "%a",
                    _ => "%A",
                });
                tokens += 1;
                last_was_hour = false;
            }
            'h' => {
                pattern.push_str(if twelve_hour {
                    if run == 1 {
                        "%-I"
                    } else {
                        "%I"
                    }
                } else if run == 1 {
                    "%-H"
                } else {
                    "%H"
                });
                tokens += 1;
                last_was_hour = true;
            }
            's' => {
                pattern.push_str(if run == 1 { "%-S" } else { "%S" });
                tokens += 1;
                last_was_hour = false;
            }
            'm' => {
                // Minutes when adjacent to hours or followed by seconds
                let next_is_seconds = chars[i + run..]
                    .iter()
                    .find(|c| c.is_ascii_alphabetic())
                    .map(|c| c.to_ascii_lowercase() == 's')
                    .unwrap_or(false);
                if last_was_hour || next_is_seconds {
                    pattern.push_str(if run == 1 { "%-M" } else { "%M" });
                } else {
                    pattern.push_str(match run {
                        1 => "%-m",
                        2 => "%m",
                        3 => "%b",
                        _ => "%B",
                    });
                }
                tokens += 1;
                last_was_hour = false;
            }
            _ => {
                push_literal(&mut pattern, c);
                i += 1;
                continue;
            }
        }

        i += run;
    }

    if tokens == 0 {
        None
    } else {
        Some(pattern)
    }
}

fn push_literal(pattern: &mut String, c: char) {
    if c == '%' {
        pattern.push_str("%%");
    } else {
        pattern.push(c);
    }
}

use std::sync::OnceLock;

use regex::Regex;

// Enough fractional digits to print any finite f64 exactly.
const EXACT_DIGITS: usize = 1100;

/// Arithmetic mean, summed left to right. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum = values.iter().fold(0.0, |acc, v| acc + v);
    Some(sum / values.len() as f64)
}

/// Rounds to the nearest integer, ties towards positive infinity (`Math.round`).
pub fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor < 0.5 {
        floor
    } else {
        floor + 1.0
    }
}

/// Two-decimal rounding with an epsilon nudge so values like 1.005 land on 1.01.
pub fn round_to_two(value: f64) -> f64 {
    round_half_up((value + f64::EPSILON) * 100.0) / 100.0
}

/// Fixed-point formatting with `Number.prototype.toFixed` semantics.
///
/// Rust's `{:.2}` resolves exact ties to even (8.125 -> "8.12"); the popup
/// always rounded them up (8.125 -> "8.13"), so the decision is made here on
/// the exact decimal expansion of the binary value.
pub fn to_fixed(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let exact = format!("{:.*}", EXACT_DIGITS, value.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));

    let mut kept: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(digits))
        .collect();

    if frac_part.as_bytes().get(digits).is_some_and(|d| *d >= b'5') {
        let mut carry = true;
        for digit in kept.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            kept.insert(0, b'1');
        }
    }

    let int_len = kept.len() - digits;
    let mut out = String::with_capacity(kept.len() + 2);
    if value < 0.0 {
        out.push('-');
    }
    out.extend(kept[..int_len].iter().map(|b| *b as char));
    if digits > 0 {
        out.push('.');
        out.extend(kept[int_len..].iter().map(|b| *b as char));
    }
    out
}

fn float_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?")
            .expect("float prefix pattern is valid")
    })
}

/// Reads the longest numeric prefix like `parseFloat` ("8a" -> 8, "a8" -> None).
/// Non-finite results are rejected.
pub fn parse_leading_float(text: &str) -> Option<f64> {
    let matched = float_prefix().find(text.trim_start())?;
    matched
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

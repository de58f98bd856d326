//! Archive measurement line format.
//!
//! Downstream fitting code parses these lines by pattern, so the layout is a
//! fixed contract:
//!
//! ```text
//! <TAG> = <value> +/- <uncertainty> <unit>
//! MIPS24 = 1.23e+01 +/- 5.39e-01 mJy
//! ```
//!
//! Numbers are written in scientific notation with two digits after the
//! decimal point and a signed exponent of at least two digits.

/// Bumped whenever the rendered layout changes.
pub const FORMAT_VERSION: u32 = 1;

/// Digits after the decimal point of the mantissa.
pub const MANTISSA_DIGITS: usize = 2;

/// Render `value` as e.g. `1.23e+01`.
pub fn sci(value: f64) -> String {
    let raw = format!("{:.*e}", MANTISSA_DIGITS, value);
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => raw,
    }
}

/// Format one archive measurement line (without trailing newline).
pub fn measurement_line(tag: &str, value: f64, uncertainty: f64, unit: &str) -> String {
    format!("{tag} = {} +/- {} {unit}", sci(value), sci(uncertainty))
}

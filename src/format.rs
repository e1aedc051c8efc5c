// src/format.rs
use chrono::{DateTime, FixedOffset, Utc};

/// Significant digits of the `%g` style used for labels and exports.
pub const SIGNIFICANT_DIGITS: usize = 6;

/// Render `value` like printf's `%g`: six significant digits, trailing
/// zeros trimmed, scientific notation once the exponent leaves `[-4, 6)`.
pub fn format_general(value: f64, decimal_separator: char) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    // Exponent of the value after rounding to the target precision.
    let scientific = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    let text = if exponent < -4 || exponent >= SIGNIFICANT_DIGITS as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (SIGNIFICANT_DIGITS as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    };

    if decimal_separator == '.' {
        text
    } else {
        text.replace('.', &decimal_separator.to_string())
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// ISO-8601 with second precision; UTC is written with a `Z` suffix.
pub fn format_iso_timestamp(timestamp: &DateTime<FixedOffset>) -> String {
    if timestamp.offset().local_minus_utc() == 0 {
        timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    } else {
        timestamp.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    }
}

/// `dd.mm.yyyy HH:MM:SS` in UTC for an epoch-millisecond axis position.
pub fn format_axis_time(x: f64) -> Option<String> {
    if !x.is_finite() {
        return None;
    }
    let time = DateTime::<Utc>::from_timestamp_millis(x.round() as i64)?;
    Some(time.format("%d.%m.%Y %H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_format_matches_printf() {
        let cases = [
            (5.0, "5"),
            (18.0, "18"),
            (3.333333333, "3.33333"),
            (10.8, "10.8"),
            (123456.7, "123457"),
            (1234567.0, "1.23457e+06"),
            (0.0001, "0.0001"),
            (0.00001234, "1.234e-05"),
            (-2.5, "-2.5"),
            (999999.7, "1e+06"),
            (0.0, "0"),
        ];
        for (value, expected) in cases {
            assert_eq!(format_general(value, '.'), expected, "formatting {value}");
        }
    }

    #[test]
    fn decimal_separator_is_substituted() {
        assert_eq!(format_general(3.25, ','), "3,25");
        assert_eq!(format_general(1234567.0, ','), "1,23457e+06");
        assert_eq!(format_general(42.0, ','), "42");
    }

    #[test]
    fn iso_timestamps_keep_their_offset() {
        let utc = DateTime::parse_from_rfc3339("2024-05-04T08:00:00.000Z").unwrap();
        assert_eq!(format_iso_timestamp(&utc), "2024-05-04T08:00:00Z");
        let local = DateTime::parse_from_rfc3339("2024-05-04T10:00:00+02:00").unwrap();
        assert_eq!(format_iso_timestamp(&local), "2024-05-04T10:00:00+02:00");
    }

    #[test]
    fn axis_time_is_rendered_in_utc() {
        let utc = DateTime::parse_from_rfc3339("2024-05-04T10:00:05+02:00").unwrap();
        let x = utc.timestamp_millis() as f64;
        assert_eq!(format_axis_time(x).as_deref(), Some("04.05.2024 08:00:05"));
        assert_eq!(format_axis_time(f64::NAN), None);
    }
}

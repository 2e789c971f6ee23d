//! Locale-aware numeric normalization for SCOMP amounts.
//!
//! Chilean documents write numbers with `.` as thousands separator and `,`
//! as decimal separator, optionally prefixed with `$`. Extraction output may
//! carry amounts as numbers, as locale-formatted strings, or as garbage.
//! The normalizer never fails: anything unparseable becomes `0.0` so the
//! downstream pipeline always has a numeric field to operate on.

use serde_json::Value;

/// Parses a locale-formatted numeric string (`"$ 1.234,56"` -> `1234.56`).
/// Returns `0.0` on any parse failure.
pub fn clean_str(s: &str) -> f64 {
    let cleaned = s.replace('$', "").replace('.', "").replace(',', ".");
    cleaned.trim().parse().unwrap_or(0.0)
}

/// Robustly converts a loosely-typed JSON value to `f64`.
///
/// Numbers pass through unchanged, strings go through [`clean_str`], and
/// everything else (null, booleans, arrays, objects) collapses to `0.0`.
pub fn clean_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => clean_str(s),
        _ => 0.0,
    }
}

/// Formats a UF amount back into Chilean locale form with two decimals:
/// `1234.5` -> `"1.234,50"`.
pub fn format_uf(value: f64) -> String {
    let negative = value < 0.0;
    let fixed = format!("{:.2}", value.abs());
    let (int_part, dec_part) = match fixed.split_once('.') {
        Some((i, d)) => (i, d),
        None => (fixed.as_str(), "00"),
    };

    let digits = int_part.len();
    let mut grouped = String::with_capacity(digits + digits / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (digits - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{}{},{}", sign, grouped, dec_part)
}

/// Rounds a monetary amount to whole pesos. Ties round half away from
/// zero, not half to even.
pub fn round_pesos(value: f64) -> f64 {
    value.round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_str_locale_format() {
        assert_eq!(clean_str("1.234,56"), 1234.56);
        assert_eq!(clean_str("10,00"), 10.0);
        assert_eq!(clean_str("$ 1.775.219"), 1775219.0);
        assert_eq!(clean_str("  42,09 "), 42.09);
    }

    #[test]
    fn test_clean_str_failures_yield_zero() {
        assert_eq!(clean_str("N/A"), 0.0);
        assert_eq!(clean_str(""), 0.0);
        assert_eq!(clean_str("sin información"), 0.0);
    }

    #[test]
    fn test_clean_number_passthrough_and_fallback() {
        assert_eq!(clean_number(&json!(350000)), 350000.0);
        assert_eq!(clean_number(&json!(12.5)), 12.5);
        assert_eq!(clean_number(&json!("1.234,56")), 1234.56);
        assert_eq!(clean_number(&json!(null)), 0.0);
        assert_eq!(clean_number(&json!(true)), 0.0);
        assert_eq!(clean_number(&json!(["x"])), 0.0);
    }

    #[test]
    fn test_format_uf() {
        assert_eq!(format_uf(10.0), "10,00");
        assert_eq!(format_uf(1234.5), "1.234,50");
        assert_eq!(format_uf(1234567.891), "1.234.567,89");
        assert_eq!(format_uf(0.0), "0,00");
        assert_eq!(format_uf(-42.09), "-42,09");
    }

    #[test]
    fn test_format_uf_roundtrips_through_clean_str() {
        for v in [0.0, 16.2, 1234.56, 987654.32] {
            assert!((clean_str(&format_uf(v)) - v).abs() < 0.005);
        }
    }

    #[test]
    fn test_round_pesos() {
        assert_eq!(round_pesos(24500.4), 24500.0);
        assert_eq!(round_pesos(4374.6), 4375.0);
    }
}

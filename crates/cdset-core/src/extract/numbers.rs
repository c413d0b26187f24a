//! Number parsing for CDS report text.
//!
//! Counts are written with thousands separators (`23,500`), sometimes with a
//! spurious trailing `.0` from spreadsheet exports. Currency values may carry
//! cents. Percentages appear both as `58%` and `58`.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use super::patterns::{CURRENCY_TOKEN, NUMBER_TOKEN, PERCENT_TOKEN};

/// Parse a headcount such as `23,500` or `1,234.0`.
pub fn parse_count(s: &str) -> Option<u64> {
    let cleaned: String = s
        .trim()
        .trim_end_matches(',')
        .chars()
        .filter(|c| !matches!(c, ',' | ' ' | '\u{00a0}'))
        .collect();
    let cleaned = cleaned
        .strip_suffix(".00")
        .or_else(|| cleaned.strip_suffix(".0"))
        .unwrap_or(&cleaned);

    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    cleaned.parse().ok()
}

/// Parse a dollar amount such as `$61,850.50`. Cents are truncated.
pub fn parse_amount(s: &str) -> Option<u64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value = Decimal::from_str(cleaned.trim_end_matches('.')).ok()?;
    value.trunc().to_u64()
}

/// Parse a percentage into a fraction.
///
/// Values written with `%` are always divided by 100. Bare values above 1
/// are read as percentages too, so `58` and `58%` both give 0.58 while
/// `0.58` stays as is.
pub fn parse_percent(s: &str) -> Option<Decimal> {
    let has_sign = s.contains('%');
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value = Decimal::from_str(&cleaned).ok()?;

    if has_sign || value > Decimal::ONE {
        Some(value / Decimal::ONE_HUNDRED)
    } else {
        Some(value)
    }
}

/// Convert a fraction to the `f64` written to the dataset, rounded to four
/// decimal places.
pub fn to_rate(value: Decimal) -> Option<f64> {
    value
        .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
}

/// All counts in `s`, in order. Tokens that are not whole numbers are skipped.
pub fn counts_in(s: &str) -> Vec<u64> {
    NUMBER_TOKEN
        .find_iter(s)
        .filter_map(|m| parse_count(m.as_str()))
        .collect()
}

/// All dollar amounts in `s`, in order.
pub fn amounts_in(s: &str) -> Vec<u64> {
    CURRENCY_TOKEN
        .captures_iter(s)
        .filter_map(|caps| parse_amount(&caps[1]))
        .collect()
}

/// All `N%` percentages in `s`, in order.
pub fn percents_in(s: &str) -> Vec<Decimal> {
    PERCENT_TOKEN
        .find_iter(s)
        .filter_map(|m| parse_percent(m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("23,500"), Some(23500));
        assert_eq!(parse_count("1,234.0"), Some(1234));
        assert_eq!(parse_count("7000,"), Some(7000));
        assert_eq!(parse_count("45.5"), None);
        assert_eq!(parse_count("n/a"), None);
    }

    #[test]
    fn test_parse_amount_truncates_cents() {
        assert_eq!(parse_amount("$61,850.99"), Some(61850));
        assert_eq!(parse_amount("0"), Some(0));
        assert_eq!(parse_amount("$"), None);
    }

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("58%"), Some(dec("0.58")));
        assert_eq!(parse_percent("58"), Some(dec("0.58")));
        assert_eq!(parse_percent("0.58"), Some(dec("0.58")));
        assert_eq!(parse_percent("0.5%"), Some(dec("0.005")));
        assert_eq!(parse_percent("100%"), Some(Decimal::ONE));
    }

    #[test]
    fn test_to_rate_rounds_to_four_places() {
        assert_eq!(to_rate(Decimal::from(1) / Decimal::from(3)), Some(0.3333));
        assert_eq!(to_rate(dec("0.00005")), Some(0.0001));
    }

    #[test]
    fn test_tokens_in_line() {
        assert_eq!(counts_in("Fall 2023 11,200 12,300"), vec![2023, 11200, 12300]);
        assert_eq!(amounts_in("$58,000 $ 57,500.25 1,000"), vec![58000, 57500]);
        assert_eq!(percents_in("52% 48.5 %"), vec![dec("0.52"), dec("0.485")]);
    }
}

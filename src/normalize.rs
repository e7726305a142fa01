use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::error::{CardbookError, Result};
use crate::sheet::Cell;

fn serial_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{5}$").expect("invalid serial regex"))
}

fn full_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{4})[.\-/](\d{1,2})[.\-/](\d{1,2})").expect("invalid full date regex")
    })
}

fn short_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})[.\-/](\d{1,2})$").expect("invalid short date regex"))
}

fn compact_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").expect("invalid compact date regex"))
}

/// Spreadsheet day serial to calendar date. Epoch is 1899-12-30, which
/// absorbs the 1900 leap-year bug for every date after February 1900.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.floor() as i64))
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

/// Normalize a statement date cell. Bare `MM/DD` values take the current
/// calendar year, which misdates a December statement uploaded in January.
pub fn normalize_date(raw: &Cell) -> Result<NaiveDate> {
    normalize_date_in_year(raw, chrono::Local::now().year())
}

pub fn normalize_date_in_year(raw: &Cell, default_year: i32) -> Result<NaiveDate> {
    let unparseable = || CardbookError::Unparseable(format!("date {:?}", raw.text()));

    if let Cell::Number(n) = raw {
        if (10_000.0..100_000.0).contains(n) {
            return serial_to_date(*n).ok_or_else(unparseable);
        }
    }

    let s = raw.text();
    let s = s.trim();
    if s.is_empty() {
        return Err(unparseable());
    }

    if serial_re().is_match(s) {
        let serial: f64 = s.parse().map_err(|_| unparseable())?;
        return serial_to_date(serial).ok_or_else(unparseable);
    }
    if let Some(c) = full_date_re().captures(s) {
        return ymd(&c[1], &c[2], &c[3]).ok_or_else(unparseable);
    }
    if let Some(c) = short_date_re().captures(s) {
        return ymd(&default_year.to_string(), &c[1], &c[2]).ok_or_else(unparseable);
    }
    if let Some(c) = compact_date_re().captures(s) {
        return ymd(&c[1], &c[2], &c[3]).ok_or_else(unparseable);
    }
    Err(unparseable())
}

/// Normalize a statement amount to whole currency units. Refunds and
/// cancellations are marked elsewhere on the row, so the sign is dropped.
/// Returns 0 for anything without leading digits or too large to store.
pub fn normalize_amount(raw: &Cell) -> u64 {
    match raw {
        Cell::Empty => 0,
        Cell::Number(n) if n.is_finite() && n.abs().round() < i64::MAX as f64 => n.abs().round() as u64,
        Cell::Number(_) => 0,
        Cell::Text(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !c.is_whitespace() && !matches!(c, ',' | '원' | '₩'))
                .collect();
            let unsigned = cleaned
                .strip_prefix('-')
                .or_else(|| cleaned.strip_prefix('+'))
                .unwrap_or(&cleaned);
            let digits: String = unsigned.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<i64>().map_or(0, |n| n as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::from(s)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_full_dates_with_any_separator() {
        for raw in ["2024-03-05", "2024.03.05", "2024/3/5", "2024.03.05 14:22"] {
            assert_eq!(normalize_date_in_year(&text(raw), 2000).unwrap(), date(2024, 3, 5), "{raw}");
        }
    }

    #[test]
    fn test_short_date_uses_default_year() {
        assert_eq!(normalize_date_in_year(&text("03/05"), 2023).unwrap(), date(2023, 3, 5));
        assert_eq!(normalize_date_in_year(&text("12.31"), 2025).unwrap(), date(2025, 12, 31));
    }

    #[test]
    fn test_short_date_defaults_to_current_year() {
        let year = chrono::Local::now().year();
        assert_eq!(normalize_date(&text("1-2")).unwrap(), date(year, 1, 2));
    }

    #[test]
    fn test_compact_date() {
        assert_eq!(normalize_date_in_year(&text("20240305"), 2000).unwrap(), date(2024, 3, 5));
    }

    #[test]
    fn test_serial_dates() {
        assert_eq!(normalize_date_in_year(&Cell::Number(45667.0), 2000).unwrap(), date(2025, 1, 10));
        assert_eq!(normalize_date_in_year(&Cell::Number(45667.75), 2000).unwrap(), date(2025, 1, 10));
        assert_eq!(normalize_date_in_year(&text("45356"), 2000).unwrap(), date(2024, 3, 5));
    }

    #[test]
    fn test_six_digit_date_is_unparseable() {
        assert!(matches!(
            normalize_date_in_year(&text("240305"), 2024),
            Err(CardbookError::Unparseable(_))
        ));
    }

    #[test]
    fn test_invalid_dates_rejected() {
        assert!(normalize_date_in_year(&text("2024-13-01"), 2024).is_err());
        assert!(normalize_date_in_year(&text("2024-02-30"), 2024).is_err());
        assert!(normalize_date_in_year(&text(""), 2024).is_err());
        assert!(normalize_date_in_year(&text("합계"), 2024).is_err());
        assert!(normalize_date_in_year(&Cell::Number(12.0), 2024).is_err());
    }

    #[test]
    fn test_amount_separator_styles_agree() {
        assert_eq!(normalize_amount(&text("1,234,000원")), 1_234_000);
        assert_eq!(normalize_amount(&text("1234000")), 1_234_000);
        assert_eq!(normalize_amount(&text(" 1 234 000 ")), 1_234_000);
        assert_eq!(normalize_amount(&text("₩1,234,000")), 1_234_000);
    }

    #[test]
    fn test_amount_takes_absolute_value() {
        assert_eq!(normalize_amount(&text("-5,000")), 5000);
        assert_eq!(normalize_amount(&Cell::Number(-5000.0)), 5000);
    }

    #[test]
    fn test_amount_integer_prefix() {
        assert_eq!(normalize_amount(&text("12.50")), 12);
        assert_eq!(normalize_amount(&Cell::Number(12.5)), 13);
    }

    #[test]
    fn test_unparseable_amount_is_zero() {
        assert_eq!(normalize_amount(&text("-")), 0);
        assert_eq!(normalize_amount(&text("abc")), 0);
        assert_eq!(normalize_amount(&Cell::Empty), 0);
    }

    #[test]
    fn test_oversized_amount_is_zero() {
        assert_eq!(normalize_amount(&text("18446744073709551615")), 0);
        assert_eq!(normalize_amount(&text("9223372036854775808")), 0);
        assert_eq!(normalize_amount(&text("9223372036854775807")), i64::MAX as u64);
        assert_eq!(normalize_amount(&Cell::Number(1e19)), 0);
        assert_eq!(normalize_amount(&Cell::Number(-1e300)), 0);
    }
}

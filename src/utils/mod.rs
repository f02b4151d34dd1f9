//! # Utilities Module
//!
//! This module contains helper functions used across the backend service.

use rust_decimal::Decimal;

/// Minor units for an ISO 4217 currency code.
///
/// Drives allocation rounding: shares are rounded to this many decimal
/// places before the residual assignment restores the exact sum.
///
/// ## Examples
///
/// ```rust
/// use fund_ledger_backend::utils::currency_scale;
/// assert_eq!(currency_scale("USD"), 2);
/// assert_eq!(currency_scale("JPY"), 0);
/// assert_eq!(currency_scale("KWD"), 3);
/// ```
pub fn currency_scale(currency: &str) -> u32 {
    match currency.to_ascii_uppercase().as_str() {
        // Zero-decimal currencies
        "JPY" | "KRW" | "VND" | "CLP" | "ISK" => 0,
        // Three-decimal currencies
        "BHD" | "KWD" | "OMR" | "JOD" | "TND" => 3,
        // Everything else uses two
        _ => 2,
    }
}

/// Format a money amount with its currency code, e.g. `"1,234.50 USD"`.
///
/// Thousands separators on the integer part; fractional part padded to the
/// currency's minor units.
pub fn format_money(amount: Decimal, currency: &str) -> String {
    let scale = currency_scale(currency);
    let rounded = amount.round_dp(scale);
    let s = rounded.abs().to_string();

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w.to_string(), f.to_string()),
        None => (s, String::new()),
    };

    // Add commas to the integer part
    let mut grouped = String::new();
    for (i, c) in whole.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    let sign = if amount.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    if scale == 0 {
        format!("{}{} {}", sign, grouped, currency)
    } else {
        let frac = format!("{:0<width$}", frac, width = scale as usize);
        format!("{}{}.{} {}", sign, grouped, frac, currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_scale() {
        assert_eq!(currency_scale("USD"), 2);
        assert_eq!(currency_scale("eur"), 2);
        assert_eq!(currency_scale("JPY"), 0);
        assert_eq!(currency_scale("BHD"), 3);
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec!(1234.5), "USD"), "1,234.50 USD");
        assert_eq!(format_money(dec!(0), "USD"), "0.00 USD");
        assert_eq!(format_money(dec!(1000000), "JPY"), "1,000,000 JPY");
        assert_eq!(format_money(dec!(12.3456), "KWD"), "12.346 KWD");
        assert_eq!(format_money(dec!(-42.5), "USD"), "-42.50 USD");
    }
}

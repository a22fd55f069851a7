//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use rust_decimal::Decimal;

/// Format a peso amount the way the menus print it: `$10.500`, with a dot
/// as the thousands separator and no decimals for whole amounts.
///
/// Usage in templates: `{{ item.price|money }}`
#[askama::filter_fn]
pub fn money(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(raw
        .parse::<Decimal>()
        .map_or_else(|_| format!("${raw}"), |amount| format_pesos(&amount)))
}

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Render a `Decimal` peso amount with dot-grouped thousands.
fn format_pesos(amount: &Decimal) -> String {
    let negative = amount.is_sign_negative();
    let normalized = amount.abs().normalize();

    let text = normalized.to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i.to_owned(), Some(f.to_owned())),
        None => (text, None),
    };

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*c);
    }

    let sign = if negative { "-" } else { "" };
    match frac_part {
        Some(frac) => format!("{sign}${grouped},{frac}"),
        None => format!("{sign}${grouped}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pesos_grouping() {
        assert_eq!(format_pesos(&Decimal::from(0)), "$0");
        assert_eq!(format_pesos(&Decimal::from(500)), "$500");
        assert_eq!(format_pesos(&Decimal::from(10_500)), "$10.500");
        assert_eq!(format_pesos(&Decimal::from(1_234_567)), "$1.234.567");
    }

    #[test]
    fn test_format_pesos_fractional() {
        let amount: Decimal = "1500.50".parse().unwrap();
        assert_eq!(format_pesos(&amount), "$1.500,50");
    }

    #[test]
    fn test_format_pesos_trailing_zeros_dropped() {
        let amount: Decimal = "2000.00".parse().unwrap();
        assert_eq!(format_pesos(&amount), "$2.000");
    }
}

//! Parseo y formateo de precios en reales
//!
//! FIPE entrega los precios como strings localizados ("R$ 45.000,00").
//! Este módulo concentra la conversión en ambos sentidos para que
//! `parse_price_brl(format_price_brl(x)) == x` se cumpla siempre.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

lazy_static! {
    static ref NON_PRICE_CHARS: Regex = Regex::new(r"[^0-9,]").unwrap();
}

/// Parsear un precio localizado brasileño a decimal.
/// Retorna `None` si el string no contiene un monto reconocible.
pub fn parse_price_brl(raw: &str) -> Option<Decimal> {
    let digits = NON_PRICE_CHARS.replace_all(raw, "");
    if digits.is_empty() {
        return None;
    }
    digits
        .replace(',', ".")
        .parse::<Decimal>()
        .ok()
        .filter(|value| !value.is_sign_negative())
}

/// Formatear un monto en reales con separador de miles y coma decimal
pub fn format_price_brl(amount: Decimal) -> String {
    let mut rounded = amount.round_dp(2);
    rounded.rescale(2);
    let text = rounded.to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.iter().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*digit);
    }

    format!("R$ {},{}", grouped, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn test_parse_fipe_price() {
        assert_eq!(parse_price_brl("R$ 45.000,00"), Some(dec("45000.00")));
        assert_eq!(parse_price_brl("R$ 1.234.567,89"), Some(dec("1234567.89")));
        assert_eq!(parse_price_brl("R$ 980,50"), Some(dec("980.50")));
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert_eq!(parse_price_brl(""), None);
        assert_eq!(parse_price_brl("sin precio"), None);
        assert_eq!(parse_price_brl("R$ ,,"), None);
    }

    #[test]
    fn test_format_groups_thousands() {
        assert_eq!(format_price_brl(dec("45000")), "R$ 45.000,00");
        assert_eq!(format_price_brl(dec("1234567.89")), "R$ 1.234.567,89");
        assert_eq!(format_price_brl(dec("0")), "R$ 0,00");
        assert_eq!(format_price_brl(dec("999.9")), "R$ 999,90");
    }

    #[test]
    fn test_round_trip() {
        for raw in ["45000.00", "120000.00", "980.50", "0.00", "25499.99"] {
            let value = dec(raw);
            assert_eq!(parse_price_brl(&format_price_brl(value)), Some(value));
        }
    }
}

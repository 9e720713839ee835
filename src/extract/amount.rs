//! Amount extraction
//!
//! Ordered pattern list, first match wins. The value of the first match is
//! final: an out-of-range first match yields `None` rather than falling
//! through to a later pattern.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Amounts at or above this are treated as noise, not spending
const MAX_AMOUNT: i64 = 1_000_000;

const NUMBER: &str = r"(-?\d+(?:,\d{3})*(?:\.\d+)?)";

lazy_static! {
    static ref AMOUNT_PATTERNS: Vec<Regex> = vec![
        // $15.50, £3, € 20, rs. 400, usd 12
        Regex::new(&format!(
            r"(?i)(?:\$|£|€|₹|\brs\.?|\busd|\beur|\bgbp)\s*{}",
            NUMBER
        ))
        .unwrap(),
        // 15 dollars, 20 bucks, 3.50 usd
        Regex::new(&format!(
            r"(?i){}\s*(?:dollars?|bucks|usd|eur|euros?|pounds?|gbp|rupees?)\b",
            NUMBER
        ))
        .unwrap(),
        // spent 12, paid 40.5, cost me 9
        Regex::new(&format!(
            r"(?i)\b(?:spent|spend|paid|pay|cost|costs)\s+(?:me\s+)?(?:about\s+|around\s+)?{}",
            NUMBER
        ))
        .unwrap(),
    ];
    static ref BARE_AMOUNT: Regex =
        Regex::new(&format!(r"(?i)^\s*(?:\$|£|€|₹)?\s*{}\s*$", NUMBER)).unwrap();
}

/// Pull a spending amount out of an utterance
///
/// Returns `None` when no pattern matches, or when the first match is not
/// a positive decimal below one million.
pub fn extract_amount(text: &str) -> Option<Decimal> {
    let captured = AMOUNT_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(text))?;

    let value = parse_number(captured.get(1)?.as_str())?;
    in_range(value).then_some(value)
}

/// Parse the answer to the amount prompt: a bare number with an optional
/// currency symbol. Range checks are the caller's job.
pub fn parse_amount_input(text: &str) -> Option<Decimal> {
    let captured = BARE_AMOUNT.captures(text)?;
    parse_number(captured.get(1)?.as_str())
}

fn parse_number(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.replace(',', "")).ok()
}

fn in_range(value: Decimal) -> bool {
    value > Decimal::ZERO && value < Decimal::from(MAX_AMOUNT)
}

//! Amount token parsing
//!
//! An amount is `<digits>k` (thousands), `<digits><sep><digits>` with the
//! separator in {space, dot, comma} stripped out, or a bare digit run.
//! Amounts below 100 are not amounts. Values are whole currency units.

use crate::money::Money;
use lazy_static::lazy_static;
use regex::Regex;

/// Smallest value the grammar accepts as money.
pub const MIN_AMOUNT: i64 = 100;

lazy_static! {
    static ref K_FORM: Regex = Regex::new(r"(?i)\b(\d+)\s*k\b").unwrap();
    static ref SEPARATED_FORM: Regex = Regex::new(r"\b(\d+)[ .,](\d{3})\b").unwrap();
    static ref BARE_FORM: Regex = Regex::new(r"\b(\d+)\b").unwrap();
    static ref LINE_K: Regex = Regex::new(r"(?i)^(\d+)\s*k$").unwrap();
    static ref LINE_SEPARATED: Regex = Regex::new(r"^(\d+)[ .,](\d{3})$").unwrap();
    static ref LINE_BARE: Regex = Regex::new(r"^(\d+)$").unwrap();
}

fn accept(major: i64) -> Option<Money> {
    if major >= MIN_AMOUNT {
        Some(Money::from_major(major))
    } else {
        None
    }
}

fn k_value(digits: &str) -> Option<i64> {
    digits.parse::<i64>().ok().map(|n| n * 1000)
}

fn separated_value(head: &str, tail: &str) -> Option<i64> {
    format!("{}{}", head, tail).parse::<i64>().ok()
}

/// True when the whole (trimmed) line is one amount token.
pub fn parse_amount_line(line: &str) -> Option<Money> {
    let line = line.trim();
    if let Some(caps) = LINE_K.captures(line) {
        return k_value(&caps[1]).and_then(accept);
    }
    if let Some(caps) = LINE_SEPARATED.captures(line) {
        return separated_value(&caps[1], &caps[2]).and_then(accept);
    }
    if let Some(caps) = LINE_BARE.captures(line) {
        return caps[1].parse::<i64>().ok().and_then(accept);
    }
    None
}

/// First amount token found anywhere in the text. Callers strip phones out
/// beforehand so nine-digit numbers are never read as money.
pub fn find_amount(text: &str) -> Option<Money> {
    if let Some(caps) = K_FORM.captures(text) {
        if let Some(money) = k_value(&caps[1]).and_then(accept) {
            return Some(money);
        }
    }
    if let Some(caps) = SEPARATED_FORM.captures(text) {
        if let Some(money) = separated_value(&caps[1], &caps[2]).and_then(accept) {
            return Some(money);
        }
    }
    BARE_FORM
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<i64>().ok())
        .find(|&n| n >= MIN_AMOUNT)
        .map(Money::from_major)
}

/// Pull the first amount token out of the text, returning the amount and
/// the text with the token removed. Used by the `modifier:` grammar, where
/// whatever is not the amount becomes the new items description.
pub fn extract_amount(text: &str) -> (Option<Money>, String) {
    if let Some(caps) = K_FORM.captures(text) {
        if let Some(money) = k_value(&caps[1]).and_then(accept) {
            return (Some(money), without_span(text, caps.get(0).unwrap().range()));
        }
    }
    if let Some(caps) = SEPARATED_FORM.captures(text) {
        if let Some(money) = separated_value(&caps[1], &caps[2]).and_then(accept) {
            return (Some(money), without_span(text, caps.get(0).unwrap().range()));
        }
    }
    for caps in BARE_FORM.captures_iter(text) {
        if let Some(money) = caps[1].parse::<i64>().ok().and_then(accept) {
            return (Some(money), without_span(text, caps.get(0).unwrap().range()));
        }
    }
    (None, collapse_whitespace(text))
}

fn without_span(text: &str, span: std::ops::Range<usize>) -> String {
    let mut rest = String::with_capacity(text.len());
    rest.push_str(&text[..span.start]);
    rest.push(' ');
    rest.push_str(&text[span.end..]);
    collapse_whitespace(&rest)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

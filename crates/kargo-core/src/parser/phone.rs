//! Phone extraction and normalisation
//!
//! A phone is a run of nine digits starting with `6`, optionally containing
//! spaces or the literal character `x`, which stands for `0`.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Spaced form, e.g. "6 55 55 55 55". Only consulted when no plain
    /// whitespace-delimited token matches, so an amount followed by a phone
    /// ("600 655555555") never fuses across the gap.
    static ref SPACED_PHONE_RE: Regex = Regex::new(r"6(?:\s?[0-9xX]){8}").unwrap();
}

/// Normalise a candidate into local digit form. `None` unless the result is
/// exactly nine digits starting with `6`.
pub fn normalize(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == 'x' || c == 'X' { '0' } else { c })
        .collect();

    if cleaned.len() == 9
        && cleaned.starts_with('6')
        && cleaned.chars().all(|c| c.is_ascii_digit())
    {
        Some(cleaned)
    } else {
        None
    }
}

/// True when the whole (trimmed) line is one phone.
pub fn parse_phone_line(line: &str) -> Option<String> {
    normalize(line.trim())
}

/// Extract every phone in the body, in order of appearance.
pub fn extract_phones(text: &str) -> Vec<String> {
    let mut phones: Vec<String> = text
        .split_whitespace()
        .filter_map(normalize)
        .collect();

    if phones.is_empty() {
        phones = SPACED_PHONE_RE
            .find_iter(text)
            .filter_map(|m| normalize(m.as_str()))
            .collect();
    }
    phones
}

/// First phone in the body, if any.
pub fn extract_phone(text: &str) -> Option<String> {
    extract_phones(text).into_iter().next()
}

/// Blank out every phone occurrence so amount extraction cannot pick up
/// phone digits.
pub fn strip_phones(text: &str) -> String {
    let tokens: Vec<String> = text
        .split_whitespace()
        .map(|token| {
            if normalize(token).is_some() {
                String::new()
            } else {
                token.to_string()
            }
        })
        .collect();
    let joined = tokens.join(" ");
    SPACED_PHONE_RE.replace_all(&joined, " ").into_owned()
}

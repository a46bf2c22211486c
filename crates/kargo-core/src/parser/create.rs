//! Create grammar
//!
//! Two shapes. Format A is positional: phone / items / amount / quartier on
//! four logical lines. Format B is free-order over at least four non-blank
//! lines: exactly one phone line, exactly one amount line, an optional known
//! quartier line, everything else joined into the items description.

use super::{amount, phone, ParserConfig};
use crate::money::Money;

/// Fields extracted for a new delivery
#[derive(Debug, Clone, PartialEq)]
pub struct CreateDelivery {
    pub phone: String,
    pub items: String,
    pub amount_due: Money,
    pub quartier: Option<String>,
    pub carrier: Option<String>,
}

/// Try the create grammar. `None` means the body is not a create.
pub fn parse_create(body: &str, config: &ParserConfig) -> Option<CreateDelivery> {
    let mut lines: Vec<&str> = body
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    // A trailing known-carrier line belongs to neither grammar slot.
    let mut carrier = None;
    if let Some(last) = lines.last() {
        if config.is_carrier(last) {
            carrier = Some(last.to_string());
            lines.pop();
        }
    }

    if lines.len() < 4 {
        return None;
    }

    // Format A: strictly positional.
    if lines.len() == 4 {
        if let (Some(phone), Some(amount_due)) = (
            phone::parse_phone_line(lines[0]),
            amount::parse_amount_line(lines[2]),
        ) {
            return Some(CreateDelivery {
                phone,
                items: lines[1].to_string(),
                amount_due,
                quartier: Some(lines[3].to_string()),
                carrier,
            });
        }
    }

    parse_free_order(&lines, config, carrier)
}

/// Format B: one phone line, one amount line, anywhere.
fn parse_free_order(
    lines: &[&str],
    config: &ParserConfig,
    carrier: Option<String>,
) -> Option<CreateDelivery> {
    let mut phone = None;
    let mut amount_due = None;
    let mut quartier = None;
    let mut items: Vec<&str> = Vec::new();

    for line in lines {
        if let Some(candidate) = phone::parse_phone_line(line) {
            if phone.replace(candidate).is_some() {
                return None;
            }
            continue;
        }
        if let Some(candidate) = amount::parse_amount_line(line) {
            if amount_due.replace(candidate).is_some() {
                return None;
            }
            continue;
        }
        if quartier.is_none() && config.is_quartier(line) {
            quartier = Some(line.to_string());
            continue;
        }
        items.push(line);
    }

    let phone = phone?;
    let amount_due = amount_due?;
    if items.is_empty() {
        return None;
    }

    Some(CreateDelivery {
        phone,
        items: items.join(" + "),
        amount_due,
        quartier,
        carrier,
    })
}

//! Update grammar
//!
//! Keyword-triggered mutations of an existing delivery. Matching runs over
//! a case- and accent-folded copy of the body; amounts and phones are
//! pulled from the original text.

use super::{amount, fold, phone};
use crate::money::Money;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DELIVERED: Regex = Regex::new(r"\blivree?\b").unwrap();
    static ref COLLECTED: Regex = Regex::new(r"\bcollect(?:ee?)?\b").unwrap();
    static ref FAILED: Regex = Regex::new(r"\bechecs?\b").unwrap();
    static ref PICKUP: Regex = Regex::new(r"\bpickup\b|\bramassage\b").unwrap();
    static ref MODIFY: Regex = Regex::new(r"(?i)\bmodifier\s*:").unwrap();
}

/// A typed mutation extracted from an update body
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateCommand {
    MarkDelivered { amount: Option<Money> },
    Collect { amount: Money },
    MarkFailed,
    MarkPickup,
    MarkPending,
    Modify { amount_due: Option<Money>, items: Option<String> },
    ChangePhone { from: String, to: String },
}

/// The mutation plus the phone that may identify its target. The resolver
/// prefers the quoted-message anchor and falls back to the phone.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateMessage {
    pub command: UpdateCommand,
    pub phone: Option<String>,
}

/// Try the update grammar. `None` means the body is not an update.
pub fn parse_update(body: &str) -> Option<UpdateMessage> {
    let folded = fold(body);

    // Prefix-style commands first, so a "modifier:" payload that happens to
    // contain a status keyword is not misread as a status change.
    if folded.contains("changer numero") {
        let phones = phone::extract_phones(body);
        if phones.len() >= 2 {
            return Some(UpdateMessage {
                phone: Some(phones[0].clone()),
                command: UpdateCommand::ChangePhone {
                    from: phones[0].clone(),
                    to: phones[1].clone(),
                },
            });
        }
        return None;
    }

    if let Some(found) = MODIFY.find(body) {
        let remainder = phone::strip_phones(&body[found.end()..]);
        let (amount_due, rest) = amount::extract_amount(&remainder);
        let items = if rest.is_empty() { None } else { Some(rest) };
        if amount_due.is_none() && items.is_none() {
            return None;
        }
        return Some(UpdateMessage {
            phone: phone::extract_phone(body),
            command: UpdateCommand::Modify { amount_due, items },
        });
    }

    let target_phone = phone::extract_phone(body);
    let body_amount = || amount::find_amount(&phone::strip_phones(body));

    if DELIVERED.is_match(&folded) {
        return Some(UpdateMessage {
            phone: target_phone,
            command: UpdateCommand::MarkDelivered { amount: body_amount() },
        });
    }

    if COLLECTED.is_match(&folded) {
        // Payment collection without an amount is not a command.
        let amount = body_amount()?;
        return Some(UpdateMessage {
            phone: target_phone,
            command: UpdateCommand::Collect { amount },
        });
    }

    if FAILED.is_match(&folded) || folded.contains("numero ne passe pas") {
        return Some(UpdateMessage {
            phone: target_phone,
            command: UpdateCommand::MarkFailed,
        });
    }

    if PICKUP.is_match(&folded) || folded.contains("elle passe chercher") {
        return Some(UpdateMessage {
            phone: target_phone,
            command: UpdateCommand::MarkPickup,
        });
    }

    if folded.contains("en attente") {
        return Some(UpdateMessage {
            phone: target_phone,
            command: UpdateCommand::MarkPending,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> UpdateMessage {
        parse_update(body).unwrap_or_else(|| panic!("expected update: {:?}", body))
    }

    #[test]
    fn test_delivered_bare() {
        let update = parse("Livré");
        assert_eq!(update.command, UpdateCommand::MarkDelivered { amount: None });
        assert_eq!(update.phone, None);
    }

    #[test]
    fn test_delivered_with_amount_and_phone() {
        let update = parse("livre 10k 655555555");
        assert_eq!(
            update.command,
            UpdateCommand::MarkDelivered { amount: Some(Money::from_major(10_000)) }
        );
        assert_eq!(update.phone.as_deref(), Some("655555555"));
    }

    #[test]
    fn test_delivered_word_boundary() {
        // "livres" (books) in an item list is not the delivered trigger.
        assert_eq!(parse_update("3 livres en stock"), None);
    }

    #[test]
    fn test_collect_requires_amount() {
        let update = parse("collecté 5k 655555555");
        assert_eq!(
            update.command,
            UpdateCommand::Collect { amount: Money::from_major(5_000) }
        );
        assert_eq!(update.phone.as_deref(), Some("655555555"));

        assert_eq!(parse_update("collecte"), None);
    }

    #[test]
    fn test_failed_variants() {
        assert_eq!(parse("échec").command, UpdateCommand::MarkFailed);
        assert_eq!(parse("echec 655555555").command, UpdateCommand::MarkFailed);
        assert_eq!(
            parse("le numéro ne passe pas").command,
            UpdateCommand::MarkFailed
        );
    }

    #[test]
    fn test_pickup_variants() {
        assert_eq!(parse("pickup").command, UpdateCommand::MarkPickup);
        assert_eq!(parse("Ramassage 655555555").command, UpdateCommand::MarkPickup);
        assert_eq!(
            parse("elle passe chercher demain").command,
            UpdateCommand::MarkPickup
        );
    }

    #[test]
    fn test_pending() {
        assert_eq!(parse("en attente").command, UpdateCommand::MarkPending);
    }

    #[test]
    fn test_modify_amount_and_items() {
        let update = parse("modifier: 3 chemises 20k 655555555");
        assert_eq!(update.phone.as_deref(), Some("655555555"));
        assert_eq!(
            update.command,
            UpdateCommand::Modify {
                amount_due: Some(Money::from_major(20_000)),
                items: Some("3 chemises".to_string()),
            }
        );
    }

    #[test]
    fn test_modify_items_only() {
        let update = parse("Modifier: deux pagnes");
        assert_eq!(
            update.command,
            UpdateCommand::Modify { amount_due: None, items: Some("deux pagnes".to_string()) }
        );
    }

    #[test]
    fn test_modify_empty_payload() {
        assert_eq!(parse_update("modifier:"), None);
    }

    #[test]
    fn test_modify_keyword_inside_payload() {
        // A status keyword inside the payload stays part of the items text.
        let update = parse("modifier: 1 livre 20k");
        assert_eq!(
            update.command,
            UpdateCommand::Modify {
                amount_due: Some(Money::from_major(20_000)),
                items: Some("1 livre".to_string()),
            }
        );
    }

    #[test]
    fn test_change_phone() {
        let update = parse("changer numéro 655555555 688888888");
        assert_eq!(update.phone.as_deref(), Some("655555555"));
        assert_eq!(
            update.command,
            UpdateCommand::ChangePhone {
                from: "655555555".to_string(),
                to: "688888888".to_string(),
            }
        );
    }

    #[test]
    fn test_change_phone_needs_two_numbers() {
        assert_eq!(parse_update("changer numéro 655555555"), None);
    }

    #[test]
    fn test_plain_chatter_is_not_update() {
        assert_eq!(parse_update("bonjour le groupe"), None);
        assert_eq!(parse_update("ok merci"), None);
    }
}

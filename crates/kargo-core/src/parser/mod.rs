//! WhatsApp message grammars
//!
//! Classifies a raw text body into a delivery create, a delivery update or
//! noise. Parsing is deterministic and ordered: the update grammar is tried
//! first, because a create-shaped body that also contains an update keyword
//! must be treated as an update. The parser is pure and data-only; it never
//! touches the database.

pub mod amount;
pub mod create;
pub mod phone;
pub mod update;

pub use create::CreateDelivery;
pub use update::{UpdateCommand, UpdateMessage};

use std::collections::HashSet;

/// Classification of one inbound body
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    Create(CreateDelivery),
    Update(UpdateMessage),
    Ignore,
}

/// Vocabulary the create grammar needs: known quartier and carrier names.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    quartiers: HashSet<String>,
    carriers: HashSet<String>,
}

impl ParserConfig {
    pub fn new<Q, C>(quartiers: Q, carriers: C) -> Self
    where
        Q: IntoIterator,
        Q::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        Self {
            quartiers: quartiers.into_iter().map(|q| fold(q.as_ref())).collect(),
            carriers: carriers.into_iter().map(|c| fold(c.as_ref())).collect(),
        }
    }

    pub fn is_quartier(&self, line: &str) -> bool {
        self.quartiers.contains(&fold(line))
    }

    pub fn is_carrier(&self, line: &str) -> bool {
        self.carriers.contains(&fold(line))
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new(DEFAULT_QUARTIERS, DEFAULT_CARRIERS)
    }
}

/// Douala and Yaoundé neighbourhoods seen in group traffic.
const DEFAULT_QUARTIERS: [&str; 24] = [
    "Akwa",
    "Bali",
    "Bepanda",
    "Biyem-Assi",
    "Bonaberi",
    "Bonamoussadi",
    "Bonanjo",
    "Bonapriso",
    "Deido",
    "Emana",
    "Essos",
    "Logpom",
    "Makepe",
    "Mendong",
    "Mvan",
    "Mvog-Ada",
    "New Bell",
    "Ndokoti",
    "Nkolbisson",
    "Odza",
    "PK8",
    "Simbock",
    "Simbock 2",
    "Village",
];

const DEFAULT_CARRIERS: [&str; 4] = ["moto", "taxi", "agence", "express"];

/// Classify a message body. Update grammar first, then create, else noise.
pub fn classify(body: &str, config: &ParserConfig) -> ParsedMessage {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return ParsedMessage::Ignore;
    }

    if let Some(update) = update::parse_update(trimmed) {
        return ParsedMessage::Update(update);
    }
    if let Some(create) = create::parse_create(trimmed, config) {
        return ParsedMessage::Create(create);
    }
    ParsedMessage::Ignore
}

/// Lower-case and strip the accents the French triggers carry, so keyword
/// matching is case- and accent-insensitive.
pub(crate) fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

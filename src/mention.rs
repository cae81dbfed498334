//! Typed, positioned mentions handed over by the recognition layer.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};
use crate::temporal::Period;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MentionType {
    Date,
    Person,
    Location,
    Organization,
    Function,
    Meeting,
    Production,
}

impl MentionType {
    /// Every non-date type, in report column order.
    pub const ENTITY_TYPES: [MentionType; 6] = [
        MentionType::Person,
        MentionType::Location,
        MentionType::Organization,
        MentionType::Function,
        MentionType::Meeting,
        MentionType::Production,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MentionType::Date => "DATE",
            MentionType::Person => "PERSON",
            MentionType::Location => "LOCATION",
            MentionType::Organization => "ORGANIZATION",
            MentionType::Function => "FUNCTION",
            MentionType::Meeting => "MEETING",
            MentionType::Production => "PRODUCTION",
        }
    }

    /// Plural column name used in flat report records.
    pub fn column(&self) -> &'static str {
        match self {
            MentionType::Date => "dates",
            MentionType::Person => "persons",
            MentionType::Location => "locations",
            MentionType::Organization => "organizations",
            MentionType::Function => "functions",
            MentionType::Meeting => "meetings",
            MentionType::Production => "productions",
        }
    }
}

impl fmt::Display for MentionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open character range `[start, end)` into a document's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MentionValue {
    Period(Period),
    Name(String),
}

impl MentionValue {
    fn sort_key(&self) -> String {
        match self {
            MentionValue::Period(p) => p.to_string(),
            MentionValue::Name(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mention {
    pub span: Span,
    #[serde(rename = "type")]
    pub kind: MentionType,
    pub text: String,
    pub value: MentionValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

impl Mention {
    /// A DATE mention carrying its period.
    pub fn date(span: Span, text: impl Into<String>, period: Period) -> Result<Self> {
        Mention {
            span,
            kind: MentionType::Date,
            text: text.into(),
            value: MentionValue::Period(period),
            entity_id: None,
        }
        .validated()
    }

    /// A named mention; the value is the normalized form of `text`.
    pub fn named(span: Span, kind: MentionType, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        Mention {
            span,
            kind,
            value: MentionValue::Name(text.clone()),
            text,
            entity_id: None,
        }
        .validated()
    }

    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Checks the span and that the value kind matches the mention type, and
    /// re-normalizes textual values. Collaborator-supplied mentions go
    /// through here before the core touches them.
    pub fn validated(mut self) -> Result<Self> {
        if self.span.start >= self.span.end {
            return Err(Error::invalid_input(format!(
                "mention {:?} has empty or inverted span {}..{}",
                self.text, self.span.start, self.span.end
            )));
        }
        match (&self.kind, &mut self.value) {
            (MentionType::Date, MentionValue::Period(p)) => p.validate()?,
            (MentionType::Date, MentionValue::Name(_)) => {
                return Err(Error::invalid_input(format!("DATE mention {:?} carries no period", self.text)));
            }
            (kind, MentionValue::Name(name)) => {
                let normalized = normalize(*kind, name);
                if normalized.is_empty() {
                    return Err(Error::invalid_input(format!("{} mention {:?} normalizes to nothing", kind, self.text)));
                }
                *name = normalized;
            }
            (kind, MentionValue::Period(_)) => {
                return Err(Error::invalid_input(format!("{} mention {:?} carries a period value", kind, self.text)));
            }
        }
        Ok(self)
    }

    pub fn period(&self) -> Option<&Period> {
        match &self.value {
            MentionValue::Period(p) => Some(p),
            MentionValue::Name(_) => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.value {
            MentionValue::Name(s) => Some(s),
            MentionValue::Period(_) => None,
        }
    }
}

impl PartialOrd for Mention {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Mention {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.span.cmp(&other.span))
            .then_with(|| self.value.sort_key().cmp(&other.value.sort_key()))
            .then_with(|| self.text.cmp(&other.text))
            .then_with(|| self.entity_id.cmp(&other.entity_id))
    }
}

/* ----------------------------- Normalization ------------------------------ */

pub type Normalizer = fn(&str) -> String;

/// Normalizer for a mention type. DATE values are periods and never pass
/// through here; its entry only applies the common folding.
pub fn normalizer(kind: MentionType) -> Normalizer {
    match kind {
        MentionType::Person => normalize_person,
        MentionType::Location | MentionType::Organization => normalize_place_like,
        MentionType::Date | MentionType::Function | MentionType::Meeting | MentionType::Production => fold,
    }
}

pub fn normalize(kind: MentionType, text: &str) -> String {
    normalizer(kind)(text)
}

const HONORIFICS: &[&str] = &["mr", "mr.", "mrs", "mrs.", "ms", "ms.", "dr", "dr.", "m.", "mme", "mme."];
const ARTICLES: &[&str] = &["the", "le", "la", "les"];

fn fold(text: &str) -> String {
    let lowered = text.nfc().collect::<String>().to_lowercase();
    lowered
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '"' | '\'' | '(' | ')'))
        .to_string()
}

fn normalize_person(text: &str) -> String {
    let folded = fold(text);
    let mut words: Vec<&str> = folded.split(' ').collect();
    while words.len() > 1 && HONORIFICS.contains(&words[0]) {
        words.remove(0);
    }
    words.join(" ")
}

fn normalize_place_like(text: &str) -> String {
    let folded = fold(text);
    if let Some(rest) = folded.strip_prefix("l'").or_else(|| folded.strip_prefix("l’")) {
        if !rest.is_empty() {
            return rest.to_string();
        }
    }
    match folded.split_once(' ') {
        Some((first, rest)) if ARTICLES.contains(&first) => rest.to_string(),
        _ => folded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::TemporalValue;

    #[test]
    fn test_named_mention_normalizes() {
        let m = Mention::named(Span::new(0, 12), MentionType::Person, "Dr.  Jane   Doe").unwrap();
        assert_eq!(m.name(), Some("jane doe"));
        assert_eq!(m.text, "Dr.  Jane   Doe");

        let m = Mention::named(Span::new(0, 10), MentionType::Location, "The Hague").unwrap();
        assert_eq!(m.name(), Some("hague"));

        let m = Mention::named(Span::new(0, 8), MentionType::Organization, "l'Élysée").unwrap();
        assert_eq!(m.name(), Some("élysée"));
    }

    #[test]
    fn test_lone_honorific_kept() {
        assert_eq!(normalize(MentionType::Person, "Mr."), "mr");
    }

    #[test]
    fn test_invalid_span_rejected() {
        let err = Mention::named(Span::new(5, 5), MentionType::Person, "x").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_mismatched_value_rejected() {
        let bad = Mention {
            span: Span::new(0, 4),
            kind: MentionType::Date,
            text: "2020".into(),
            value: MentionValue::Name("2020".into()),
            entity_id: None,
        };
        assert!(bad.validated().is_err());

        let bad = Mention {
            span: Span::new(0, 4),
            kind: MentionType::Person,
            text: "2020".into(),
            value: MentionValue::Period(Period::from(TemporalValue::year(2020))),
            entity_id: None,
        };
        assert!(bad.validated().is_err());
    }

    #[test]
    fn test_ordering_by_span_then_value() {
        let a = Mention::named(Span::new(0, 3), MentionType::Person, "Bob").unwrap();
        let b = Mention::named(Span::new(0, 3), MentionType::Person, "Al").unwrap();
        let c = Mention::named(Span::new(4, 6), MentionType::Person, "Al").unwrap();
        let mut v = vec![c.clone(), a.clone(), b.clone()];
        v.sort();
        assert_eq!(v, vec![b, a, c]);
    }

    #[test]
    fn test_entity_id_breaks_ties_and_survives_json() {
        let plain = Mention::named(Span::new(0, 3), MentionType::Person, "Bob").unwrap();
        let linked = plain.clone().with_entity_id("Q42");
        assert!(plain < linked);
        let json = serde_json::to_string(&linked).unwrap();
        assert!(json.contains(r#""entity_id":"Q42""#));
        assert!(!serde_json::to_string(&plain).unwrap().contains("entity_id"));
    }

    #[test]
    fn test_mention_json_shape() {
        let json = r#"{"span":{"start":0,"end":4},"type":"DATE","text":"2020",
                       "value":{"start":{"year":2020},"end":{"year":2020}}}"#;
        let m: Mention = serde_json::from_str(json).unwrap();
        assert_eq!(m.period().unwrap().start, TemporalValue::year(2020));

        let json = r#"{"span":{"start":0,"end":5},"type":"PERSON","text":"Alice","value":"Alice"}"#;
        let m: Mention = serde_json::from_str::<Mention>(json).unwrap().validated().unwrap();
        assert_eq!(m.name(), Some("alice"));
    }
}

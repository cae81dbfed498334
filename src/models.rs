use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{Error, Result};
use crate::eval::ReferenceAnnotations;
use crate::mention::{Mention, MentionType};
use crate::temporal::{Period, TemporalValue};

/// One retrieved document as handed over by the retrieval layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    pub text: String,
    #[serde(default)]
    pub published: Option<TemporalValue>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
}

pub fn make_document_id(url: &str, title: &str) -> String {
    format!("{:016x}", xxh3_64(format!("{}|{}", url, title).as_bytes()))
}

/// Input record: a document, its recognized mentions, and any exclusion
/// reason the retrieval layer already decided on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDocument {
    #[serde(flatten)]
    pub document: Document,
    #[serde(default)]
    pub mentions: Vec<Mention>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    pub documents: Vec<CorpusDocument>,
    #[serde(default)]
    pub reference: Option<ReferenceAnnotations>,
}

/// A time period bound to the named mentions co-occurring with it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub period: Period,
    pub persons: BTreeSet<String>,
    pub locations: BTreeSet<String>,
    pub organizations: BTreeSet<String>,
    pub functions: BTreeSet<String>,
    pub meetings: BTreeSet<String>,
    pub productions: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<usize>,
}

impl Event {
    pub fn new(period: Period) -> Self {
        Self { period, ..Default::default() }
    }

    /// Attaches a named mention to the set matching its type. DATE mentions
    /// belong to the period and are rejected here.
    pub fn add(&mut self, mention: &Mention) -> Result<()> {
        let name = mention.name().ok_or_else(|| {
            Error::invalid_input(format!("{} mention {:?} has no name value", mention.kind, mention.text))
        })?;
        let set = self.set_mut(mention.kind).ok_or_else(|| {
            Error::invalid_input(format!("cannot attach {} mention {:?} to an event", mention.kind, mention.text))
        })?;
        set.insert(name.to_string());
        Ok(())
    }

    pub fn merge_period(&mut self, period: &Period) {
        self.period.merge(*period);
    }

    pub fn set(&self, kind: MentionType) -> Option<&BTreeSet<String>> {
        match kind {
            MentionType::Date => None,
            MentionType::Person => Some(&self.persons),
            MentionType::Location => Some(&self.locations),
            MentionType::Organization => Some(&self.organizations),
            MentionType::Function => Some(&self.functions),
            MentionType::Meeting => Some(&self.meetings),
            MentionType::Production => Some(&self.productions),
        }
    }

    fn set_mut(&mut self, kind: MentionType) -> Option<&mut BTreeSet<String>> {
        match kind {
            MentionType::Date => None,
            MentionType::Person => Some(&mut self.persons),
            MentionType::Location => Some(&mut self.locations),
            MentionType::Organization => Some(&mut self.organizations),
            MentionType::Function => Some(&mut self.functions),
            MentionType::Meeting => Some(&mut self.meetings),
            MentionType::Production => Some(&mut self.productions),
        }
    }

    /// Union of every non-date normalized value attached to the event.
    pub fn mention_set(&self) -> BTreeSet<&str> {
        MentionType::ENTITY_TYPES
            .iter()
            .filter_map(|k| self.set(*k))
            .flat_map(|s| s.iter().map(String::as_str))
            .collect()
    }
}

/// A document together with everything the pipeline derived for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub document: Document,
    pub mentions: Vec<Mention>,
    pub status: Option<String>,
    pub cluster_id: Option<usize>,
    pub events: Vec<Event>,
}

impl DocumentResult {
    pub fn new(document: Document, mentions: Vec<Mention>) -> Self {
        Self {
            document,
            mentions,
            status: None,
            cluster_id: None,
            events: Vec::new(),
        }
    }

    pub fn is_retained(&self) -> bool {
        self.status.is_none()
    }

    /// Records an exclusion reason. A status, once set, is never replaced;
    /// returns whether this call excluded the document.
    pub fn exclude(&mut self, reason: impl Into<String>) -> bool {
        if self.status.is_some() {
            return false;
        }
        self.status = Some(reason.into());
        true
    }

    pub fn mentions_of(&self, kind: MentionType) -> impl Iterator<Item = &Mention> {
        self.mentions.iter().filter(move |m| m.kind == kind)
    }
}

impl CorpusDocument {
    /// Validates the mentions and assigns an id when the input lacks one.
    pub fn into_result(self) -> Result<DocumentResult> {
        let CorpusDocument { mut document, mentions, status } = self;
        if document.id.is_empty() {
            document.id = make_document_id(document.url.as_deref().unwrap_or(""), &document.title);
        }
        let mut mentions = mentions
            .into_iter()
            .map(Mention::validated)
            .collect::<Result<Vec<_>>>()?;
        mentions.sort();
        let mut result = DocumentResult::new(document, mentions);
        result.status = status;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mention::Span;

    #[test]
    fn test_event_add_routes_by_type() {
        let mut ev = Event::new(Period::from(TemporalValue::year(2020)));
        ev.add(&Mention::named(Span::new(0, 5), MentionType::Person, "Alice").unwrap()).unwrap();
        ev.add(&Mention::named(Span::new(6, 11), MentionType::Location, "Paris").unwrap()).unwrap();
        ev.add(&Mention::named(Span::new(12, 17), MentionType::Person, "ALICE").unwrap()).unwrap();
        assert_eq!(ev.persons.len(), 1);
        assert!(ev.locations.contains("paris"));
        assert_eq!(ev.mention_set().len(), 2);
    }

    #[test]
    fn test_event_rejects_date_mention() {
        let mut ev = Event::default();
        let date = Mention::date(Span::new(0, 4), "2020", Period::from(TemporalValue::year(2020))).unwrap();
        assert!(matches!(ev.add(&date), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_exclusion_is_monotonic() {
        let mut d = DocumentResult::new(Document::default(), vec![]);
        assert!(d.exclude("first"));
        assert!(!d.exclude("second"));
        assert_eq!(d.status.as_deref(), Some("first"));
    }

    #[test]
    fn test_missing_id_is_stable_hash() {
        let doc = CorpusDocument {
            document: Document {
                title: "T".into(),
                url: Some("https://example.org/a".into()),
                text: "x".into(),
                ..Default::default()
            },
            mentions: vec![],
            status: None,
        };
        let a = doc.clone().into_result().unwrap();
        let b = doc.into_result().unwrap();
        assert_eq!(a.document.id.len(), 16);
        assert_eq!(a.document.id, b.document.id);
    }
}

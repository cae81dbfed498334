//! Event extraction: binding a date to the mentions around it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::mention::{Mention, MentionType, Span};
use crate::models::{Document, DocumentResult, Event};
use crate::temporal::Period;
use crate::text::sentence_spans;

/// Status set on a document when extraction yields no event.
pub const NO_EVENT_FOUND: &str = "No event found";

/// Scope in which a date and its co-occurring mentions are gathered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Sentence,
    Document,
}

/// A scope that held a date but produced no event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionNote {
    /// Several DATE mentions in one sentence; not merged.
    AmbiguousDates { scope: Span, dates: usize },
    /// A date with no PERSON mention next to it.
    DateWithoutPerson { scope: Span },
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub events: Vec<Event>,
    pub notes: Vec<ExtractionNote>,
}

pub fn extract_events(document: &Document, mentions: &[Mention], granularity: Granularity) -> Result<Extraction> {
    match granularity {
        Granularity::Sentence => extract_by_sentence(document, mentions),
        Granularity::Document => extract_by_document(document, mentions),
    }
}

fn extract_by_sentence(document: &Document, mentions: &[Mention]) -> Result<Extraction> {
    let mut out = Extraction::default();
    for sentence in sentence_spans(&document.text) {
        let in_scope: Vec<&Mention> = mentions.iter().filter(|m| sentence.contains(&m.span)).collect();
        let dates: Vec<Period> = in_scope.iter().filter_map(|m| m.period().copied()).collect();

        match dates.len() {
            0 => continue,
            1 => {}
            n => {
                debug!("Ambiguous sentence skipped - document={}, span={}..{}, dates={}", document.id, sentence.start, sentence.end, n);
                out.notes.push(ExtractionNote::AmbiguousDates { scope: sentence, dates: n });
                continue;
            }
        }

        if !in_scope.iter().any(|m| m.kind == MentionType::Person) {
            debug!("Date without person skipped - document={}, span={}..{}", document.id, sentence.start, sentence.end);
            out.notes.push(ExtractionNote::DateWithoutPerson { scope: sentence });
            continue;
        }

        out.events.push(build_event(dates[0], in_scope.into_iter())?);
    }
    Ok(out)
}

fn extract_by_document(document: &Document, mentions: &[Mention]) -> Result<Extraction> {
    let mut out = Extraction::default();
    let dates: Vec<&Period> = mentions.iter().filter_map(Mention::period).collect();
    let Some((first, rest)) = dates.split_first() else {
        return Ok(out);
    };

    if !mentions.iter().any(|m| m.kind == MentionType::Person) {
        let scope = Span::new(0, document.text.chars().count());
        debug!("Date without person skipped - document={}, scope=document", document.id);
        out.notes.push(ExtractionNote::DateWithoutPerson { scope });
        return Ok(out);
    }

    let mut event = build_event(**first, mentions.iter())?;
    for p in rest {
        event.merge_period(p);
    }
    out.events.push(event);
    Ok(out)
}

fn build_event<'a>(period: Period, mentions: impl Iterator<Item = &'a Mention>) -> Result<Event> {
    let mut event = Event::new(period);
    for m in mentions.filter(|m| m.kind != MentionType::Date) {
        event.add(m)?;
    }
    Ok(event)
}

/// Runs extraction for one document and returns the updated copy. Documents
/// already excluded are returned untouched; a document yielding no event is
/// excluded with [`NO_EVENT_FOUND`], its mentions kept.
pub fn extract_for_document(result: &DocumentResult, granularity: Granularity) -> Result<(DocumentResult, Vec<ExtractionNote>)> {
    let mut next = result.clone();
    if !next.is_retained() {
        return Ok((next, Vec::new()));
    }
    let Extraction { events, notes } = extract_events(&next.document, &next.mentions, granularity)?;
    if events.is_empty() {
        next.exclude(NO_EVENT_FOUND);
    }
    next.events = events;
    Ok((next, notes))
}

//! Flat column -> value records handed to the reporting layer.

use itertools::Itertools;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::mention::MentionType;
use crate::models::{DocumentResult, Event};

pub type Record = BTreeMap<String, String>;

pub const KEYWORD_LIMIT: usize = 10;

/// One document cluster: member indices into the result list and its most
/// weighted terms.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub members: Vec<usize>,
    pub keywords: Vec<String>,
}

pub fn document_records(results: &[DocumentResult]) -> Vec<Record> {
    results
        .iter()
        .map(|r| {
            let mut rec = Record::new();
            rec.insert("id".into(), r.document.id.clone());
            rec.insert("title".into(), r.document.title.clone());
            rec.insert("status".into(), r.status.clone().unwrap_or_default());
            rec.insert("cluster".into(), r.cluster_id.map(|c| c.to_string()).unwrap_or_default());
            rec.insert("events".into(), r.events.len().to_string());
            for kind in MentionType::ENTITY_TYPES {
                let values: BTreeSet<&str> = r.mentions_of(kind).filter_map(|m| m.name()).collect();
                rec.insert(kind.column().into(), values.into_iter().join("; "));
            }
            rec
        })
        .collect()
}

pub fn cluster_records(results: &[DocumentResult], clusters: &[ClusterSummary]) -> Vec<Record> {
    clusters
        .iter()
        .map(|c| {
            let mut rec = Record::new();
            rec.insert("cluster".into(), c.cluster.to_string());
            rec.insert("size".into(), c.members.len().to_string());
            rec.insert("keywords".into(), c.keywords.join(", "));
            for kind in MentionType::ENTITY_TYPES {
                rec.insert(kind.column().into(), frequencies(results, &c.members, kind));
            }
            rec
        })
        .collect()
}

/// `value (n)` entries, `n` being the number of member documents mentioning
/// the value; most frequent first.
fn frequencies(results: &[DocumentResult], members: &[usize], kind: MentionType) -> String {
    let counts = members
        .iter()
        .flat_map(|&i| results[i].mentions_of(kind).filter_map(|m| m.name()).collect::<BTreeSet<_>>())
        .counts();
    counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .map(|(value, n)| format!("{} ({})", value, n))
        .join("; ")
}

pub fn event_records(events: &[Event]) -> Vec<Record> {
    events
        .iter()
        .map(|e| {
            let mut rec = Record::new();
            rec.insert("period".into(), e.period.to_string());
            rec.insert("cluster".into(), e.cluster_id.map(|c| c.to_string()).unwrap_or_default());
            for kind in MentionType::ENTITY_TYPES {
                let joined = e.set(kind).map(|s| s.iter().join("; ")).unwrap_or_default();
                rec.insert(kind.column().into(), joined);
            }
            rec
        })
        .collect()
}

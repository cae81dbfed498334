//! Document exclusion filters and cluster-based mention denoising.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::mention::MentionType;
use crate::models::{Document, DocumentResult};
use crate::temporal::Period;

/// A pre-extraction check; the first one a document fails names its status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFilter {
    /// Keep documents whose language tag is listed. Untagged documents pass.
    Language(BTreeSet<String>),
    /// Keep documents with at least this many characters of text.
    MinLength(usize),
    /// Keep documents whose publication date overlaps the period. Documents
    /// without a usable publication date pass.
    PublicationPeriod(Period),
}

impl DocumentFilter {
    /// The exclusion reason when `document` fails, `None` when it passes.
    pub fn check(&self, document: &Document) -> Option<String> {
        match self {
            DocumentFilter::Language(allowed) => match &document.language {
                Some(lang) if !allowed.contains(lang) => Some(format!("Language not selected: {}", lang)),
                _ => None,
            },
            DocumentFilter::MinLength(min) => {
                let len = document.text.chars().count();
                (len < *min).then(|| format!("Text too short: {} < {}", len, min))
            }
            DocumentFilter::PublicationPeriod(period) => {
                let published = Period::from(document.published?);
                match period.overlap_ratio(&published) {
                    Ok(r) if r == 0.0 => Some(format!("Published outside period: {}", published)),
                    _ => None,
                }
            }
        }
    }
}

/// Applies `filters` in order to every retained document, stopping at the
/// first failure. Documents that already carry a status are left alone.
pub fn apply_filters(results: &[DocumentResult], filters: &[DocumentFilter]) -> Vec<DocumentResult> {
    let mut excluded = 0usize;
    let out: Vec<DocumentResult> = results
        .iter()
        .map(|r| {
            let mut next = r.clone();
            if next.is_retained() {
                if let Some(reason) = filters.iter().find_map(|f| f.check(&next.document)) {
                    debug!("Document excluded - id={}, reason={}", next.document.id, reason);
                    next.exclude(reason);
                    excluded += 1;
                }
            }
            next
        })
        .collect();
    info!("Document filters applied - documents={}, filters={}, excluded={}", results.len(), filters.len(), excluded);
    out
}

/// Drops every non-date mention whose value occurs in fewer than
/// `threshold` of the documents in its cluster. Frequencies are computed per
/// cluster and per mention type; excluded and unclustered documents pass
/// through unchanged.
pub fn filter_by_cluster(results: &[DocumentResult], threshold: f64) -> Result<Vec<DocumentResult>> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(Error::invalid_input(format!("cluster threshold {} outside [0, 1]", threshold)));
    }

    let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, r) in results.iter().enumerate() {
        if let (true, Some(c)) = (r.is_retained(), r.cluster_id) {
            clusters.entry(c).or_default().push(i);
        }
    }

    // (document index, type, value) triples to drop
    let mut rejected: HashSet<(usize, MentionType, String)> = HashSet::new();
    for (cluster, members) in &clusters {
        let size = members.len() as f64;
        for kind in MentionType::ENTITY_TYPES {
            let mut doc_counts: BTreeMap<&str, usize> = BTreeMap::new();
            for &i in members {
                let values: BTreeSet<&str> = results[i].mentions_of(kind).filter_map(|m| m.name()).collect();
                for v in values {
                    *doc_counts.entry(v).or_insert(0) += 1;
                }
            }
            for (value, count) in doc_counts {
                if (count as f64) / size < threshold {
                    debug!(
                        "Mention below cluster frequency - cluster={}, type={}, value={}, documents={}/{}",
                        cluster, kind, value, count, members.len()
                    );
                    for &i in members {
                        rejected.insert((i, kind, value.to_string()));
                    }
                }
            }
        }
    }

    let mut dropped = 0usize;
    let out = results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let mut next = r.clone();
            next.mentions.retain(|m| match m.name() {
                Some(name) if rejected.contains(&(i, m.kind, name.to_string())) => {
                    dropped += 1;
                    false
                }
                _ => true,
            });
            next
        })
        .collect();

    info!(
        "Cluster filtering completed - clusters={}, threshold={}, mentions_dropped={}",
        clusters.len(),
        threshold,
        dropped
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mention::{Mention, Span};
    use crate::temporal::TemporalValue;

    fn result(id: &str, cluster: Option<usize>, persons: &[&str]) -> DocumentResult {
        let mentions = persons
            .iter()
            .enumerate()
            .map(|(i, p)| Mention::named(Span::new(i * 10, i * 10 + 5), MentionType::Person, *p).unwrap())
            .collect();
        let mut r = DocumentResult::new(Document { id: id.into(), text: "x".repeat(100), ..Default::default() }, mentions);
        r.cluster_id = cluster;
        r
    }

    fn persons(r: &DocumentResult) -> Vec<&str> {
        r.mentions_of(MentionType::Person).filter_map(|m| m.name()).collect()
    }

    #[test]
    fn test_filter_by_cluster_drops_rare_values() {
        let docs = vec![
            result("a", Some(1), &["Alice", "Noise"]),
            result("b", Some(1), &["Alice"]),
            result("c", Some(1), &["Alice", "Bob"]),
            result("d", Some(1), &["Bob"]),
            result("e", Some(2), &["Noise"]),
        ];
        let out = filter_by_cluster(&docs, 0.5).unwrap();
        assert_eq!(persons(&out[0]), vec!["alice"]);
        assert_eq!(persons(&out[2]), vec!["alice", "bob"]);
        assert_eq!(persons(&out[3]), vec!["bob"]);
        // alone in its cluster, so frequency 1.0
        assert_eq!(persons(&out[4]), vec!["noise"]);
    }

    #[test]
    fn test_filter_by_cluster_skips_excluded_and_unclustered() {
        let mut excluded = result("x", Some(1), &["Rare"]);
        excluded.exclude("filtered");
        let docs = vec![
            result("a", Some(1), &["Alice"]),
            result("b", Some(1), &["Alice"]),
            excluded,
            result("u", None, &["Rare"]),
        ];
        let out = filter_by_cluster(&docs, 0.9).unwrap();
        assert_eq!(out[2], docs[2]);
        assert_eq!(out[3], docs[3]);
    }

    #[test]
    fn test_threshold_zero_keeps_everything() {
        let docs = vec![result("a", Some(1), &["Alice"]), result("b", Some(1), &["Bob"])];
        assert_eq!(filter_by_cluster(&docs, 0.0).unwrap(), docs);
    }

    #[test]
    fn test_threshold_out_of_range() {
        assert!(filter_by_cluster(&[], 1.5).is_err());
        assert!(filter_by_cluster(&[], f64::NAN).is_err());
    }

    #[test]
    fn test_filters_short_circuit() {
        let mut fr = result("fr", None, &[]);
        fr.document.language = Some("fr".into());
        fr.document.text = "short".into();
        let mut old = result("old", None, &[]);
        old.document.published = Some(TemporalValue::new(2001, 1, 1));
        let keep = result("keep", None, &[]);

        let filters = vec![
            DocumentFilter::Language(["en".to_string()].into_iter().collect()),
            DocumentFilter::MinLength(10),
            DocumentFilter::PublicationPeriod(Period::from(TemporalValue::year(2020))),
        ];
        let out = apply_filters(&[fr, old, keep], &filters);
        assert_eq!(out[0].status.as_deref(), Some("Language not selected: fr"));
        assert!(out[1].status.as_deref().unwrap().starts_with("Published outside period"));
        assert!(out[2].is_retained());
    }

    #[test]
    fn test_filters_never_clear_status() {
        let mut r = result("a", None, &[]);
        r.exclude("upstream");
        let out = apply_filters(&[r], &[DocumentFilter::MinLength(1_000)]);
        assert_eq!(out[0].status.as_deref(), Some("upstream"));
    }
}

//! Property-based tests for the clustering and metric invariants.

use event_clusters::cluster::{cluster_hierarchical, Dendrogram};
use event_clusters::eval::rand_index;
use event_clusters::filter::filter_by_cluster;
use event_clusters::similarity::{event_distance_matrix, TermVectors};
use event_clusters::{DistanceMatrix, Document, DocumentResult, Event, Mention, MentionType, Period, Span, TemporalValue};
use proptest::prelude::*;

const NAMES: &[&str] = &["alice", "bob", "carol", "dave", "erin", "frank"];
const WORDS: &[&str] = &["summit", "trade", "vote", "storm", "match", "court", "bank", "film"];

/// Year-only, year-month and full dates.
fn dated_value() -> impl Strategy<Value = TemporalValue> {
    prop_oneof![
        (1990i32..2030).prop_map(TemporalValue::year),
        (1990i32..2030, 1u32..=12).prop_map(|(y, m)| TemporalValue::year_month(y, m)),
        (1990i32..2030, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| TemporalValue::new(y, m, d)),
    ]
}

fn line_matrix(points: &[f64]) -> DistanceMatrix {
    DistanceMatrix::from_fn(points.len(), |i, j| (points[i] - points[j]).abs())
}

fn results_from(docs: &[(usize, Vec<usize>)]) -> Vec<DocumentResult> {
    docs.iter()
        .enumerate()
        .map(|(i, (cluster, persons))| {
            let mentions = persons
                .iter()
                .enumerate()
                .map(|(k, &p)| Mention::named(Span::new(k * 10, k * 10 + 3), MentionType::Person, NAMES[p]).unwrap())
                .collect();
            let mut r = DocumentResult::new(Document { id: format!("doc{}", i), ..Default::default() }, mentions);
            r.cluster_id = Some(*cluster);
            r
        })
        .collect()
}

proptest! {
    #[test]
    fn period_merge_only_widens(first in dated_value(), rest in prop::collection::vec(dated_value(), 0..12)) {
        let mut period = Period::from(first);
        for v in &rest {
            period.merge(*v);
        }
        let mut reversed = Period::default();
        for v in rest.iter().rev().chain(std::iter::once(&first)) {
            reversed.merge(*v);
        }
        for v in std::iter::once(&first).chain(rest.iter()) {
            prop_assert!(period.contains(&Period::from(*v)).unwrap());
        }
        prop_assert_eq!(period.bounds().unwrap(), reversed.bounds().unwrap());
    }

    #[test]
    fn document_matrix_is_symmetric(
        docs in prop::collection::vec(prop::collection::vec(0..WORDS.len(), 0..6), 1..8)
    ) {
        let tokens: Vec<Vec<String>> = docs
            .iter()
            .map(|d| d.iter().map(|&w| WORDS[w].to_string()).collect())
            .collect();
        let m = TermVectors::from_tokens(&tokens).distance_matrix();
        for i in 0..m.len() {
            prop_assert_eq!(m.get(i, i), 0.0);
            for j in 0..m.len() {
                prop_assert_eq!(m.get(i, j), m.get(j, i));
            }
        }
    }

    #[test]
    fn event_matrix_is_symmetric(
        events in prop::collection::vec(prop::collection::btree_set(0..NAMES.len(), 0..4), 1..8)
    ) {
        let events: Vec<Event> = events
            .iter()
            .map(|persons| {
                let mut e = Event::new(Period::from(TemporalValue::year(2020)));
                e.persons = persons.iter().map(|&p| NAMES[p].to_string()).collect();
                e
            })
            .collect();
        let m = event_distance_matrix(&events);
        for i in 0..m.len() {
            prop_assert_eq!(m.get(i, i), 0.0);
            for j in 0..m.len() {
                prop_assert_eq!(m.get(i, j), m.get(j, i));
                prop_assert!((0.0..=1.0).contains(&m.get(i, j)));
            }
        }
    }

    #[test]
    fn clustering_is_deterministic(points in prop::collection::vec(0.0f64..10.0, 2..10)) {
        let m = line_matrix(&points);
        let a = cluster_hierarchical(&m).unwrap().unwrap();
        let b = cluster_hierarchical(&m).unwrap().unwrap();
        prop_assert_eq!(a.best.labels(), b.best.labels());
        prop_assert_eq!(a.best_score, b.best_score);
        prop_assert_eq!(a.scores, b.scores);
    }

    #[test]
    fn every_cut_is_a_partition(points in prop::collection::vec(0.0f64..10.0, 1..10)) {
        let n = points.len();
        let d = Dendrogram::complete_link(&line_matrix(&points));
        prop_assert_eq!(d.merges().len(), n - 1);
        for k in 1..=n {
            let p = d.cut(k).unwrap();
            prop_assert_eq!(p.k(), k);
            let groups = p.groups();
            prop_assert!(groups.iter().all(|g| !g.is_empty()));
            let mut covered: Vec<usize> = groups.into_iter().flatten().collect();
            covered.sort_unstable();
            prop_assert_eq!(covered, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn rand_index_is_bounded(pairs in prop::collection::vec((0usize..4, 0usize..4), 2..20)) {
        let (a, b): (Vec<usize>, Vec<usize>) = pairs.into_iter().unzip();
        let r = rand_index(&a, &b).unwrap().unwrap();
        prop_assert!((0.0..=1.0).contains(&r));
        prop_assert_eq!(rand_index(&a, &a).unwrap(), Some(1.0));
    }

    #[test]
    fn cluster_filtering_is_idempotent(
        docs in prop::collection::vec((1usize..4, prop::collection::vec(0..NAMES.len(), 0..4)), 1..10),
        threshold in 0.0f64..=1.0,
    ) {
        let results = results_from(&docs);
        let once = filter_by_cluster(&results, threshold).unwrap();
        let twice = filter_by_cluster(&once, threshold).unwrap();
        prop_assert_eq!(once, twice);
    }
}

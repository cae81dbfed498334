use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::matrix::DistanceMatrix;
use crate::models::Event;

/// Per-document tf-idf weights over a fixed corpus.
#[derive(Debug, Clone, Default)]
pub struct TermVectors {
    pub weights: Vec<BTreeMap<String, f64>>,
    pub norms: Vec<f64>,
}

impl TermVectors {
    /// `tf` is the raw count of a term in a document, `idf(t) = log10(N / (df(t) + 1))`.
    pub fn from_tokens(docs: &[Vec<String>]) -> Self {
        let n = docs.len() as f64;

        let tfs: Vec<BTreeMap<&str, f64>> = docs
            .iter()
            .map(|tokens| {
                let mut tf = BTreeMap::new();
                for t in tokens {
                    *tf.entry(t.as_str()).or_insert(0.0) += 1.0;
                }
                tf
            })
            .collect();

        let mut df: BTreeMap<&str, f64> = BTreeMap::new();
        for tf in &tfs {
            for t in tf.keys() {
                *df.entry(*t).or_insert(0.0) += 1.0;
            }
        }

        let weights: Vec<BTreeMap<String, f64>> = tfs
            .iter()
            .map(|tf| {
                tf.iter()
                    .map(|(t, count)| (t.to_string(), count * (n / (df[t] + 1.0)).log10()))
                    .collect()
            })
            .collect();
        let norms = weights
            .iter()
            .map(|w| w.values().map(|x| x * x).sum::<f64>().sqrt())
            .collect();

        debug!("Vectorized documents - documents={}, vocabulary={}", docs.len(), df.len());
        Self { weights, norms }
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// `1 - Σ_t sqrt(w_i(t) · w_j(t)) / (|i| · |j|)`.
    ///
    /// The numerator takes the geometric mean of the paired weights instead
    /// of their product; existing results depend on it. A document with a
    /// zero norm is at distance 1 from everything else.
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        let denom = self.norms[i] * self.norms[j];
        if denom == 0.0 {
            return 1.0;
        }
        let (small, large) = if self.weights[i].len() <= self.weights[j].len() {
            (&self.weights[i], &self.weights[j])
        } else {
            (&self.weights[j], &self.weights[i])
        };
        let shared: f64 = small
            .iter()
            .filter_map(|(t, w)| large.get(t).map(|v| (w * v).sqrt()))
            .sum();
        1.0 - shared / denom
    }

    pub fn distance_matrix(&self) -> DistanceMatrix {
        DistanceMatrix::from_fn(self.len(), |i, j| self.distance(i, j))
    }

    /// Highest summed weights over `members`, ties broken alphabetically.
    pub fn top_terms(&self, members: &[usize], limit: usize) -> Vec<(String, f64)> {
        let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
        for &m in members {
            for (t, w) in &self.weights[m] {
                *totals.entry(t.as_str()).or_insert(0.0) += w;
            }
        }
        let mut v: Vec<(String, f64)> = totals.into_iter().map(|(t, w)| (t.to_string(), w)).collect();
        v.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        v.truncate(limit);
        v
    }
}

fn jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let inter = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    inter / union
}

/// `1 - Jaccard` over the events' non-date mention sets.
pub fn event_distance(a: &Event, b: &Event) -> f64 {
    1.0 - jaccard(&a.mention_set(), &b.mention_set())
}

pub fn event_distance_matrix(events: &[Event]) -> DistanceMatrix {
    let sets: Vec<BTreeSet<&str>> = events.iter().map(Event::mention_set).collect();
    DistanceMatrix::from_fn(events.len(), |i, j| 1.0 - jaccard(&sets[i], &sets[j]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::{Period, TemporalValue};

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    fn event(persons: &[&str], locations: &[&str]) -> Event {
        let mut e = Event::new(Period::from(TemporalValue::year(2020)));
        e.persons = persons.iter().map(|s| s.to_string()).collect();
        e.locations = locations.iter().map(|s| s.to_string()).collect();
        e
    }

    #[test]
    fn test_idf_formula() {
        let v = TermVectors::from_tokens(&[toks("a b"), toks("a c"), toks("a d d")]);
        // df(a)=3 -> log10(3/4); df(d)=1 -> tf 2 * log10(3/2)
        assert!((v.weights[0]["a"] - (0.75f64).log10()).abs() < 1e-12);
        assert!((v.weights[2]["d"] - 2.0 * (1.5f64).log10()).abs() < 1e-12);
    }

    #[test]
    fn test_geometric_mean_numerator() {
        let v = TermVectors::from_tokens(&[toks("x y"), toks("x z"), toks("w"), toks("v")]);
        let wx = (4.0f64 / 3.0).log10(); // df(x)=2, N=4
        let wy = (2.0f64).log10();
        let norm = (wx * wx + wy * wy).sqrt();
        let expected = 1.0 - (wx * wx).sqrt() / (norm * norm);
        assert!((v.distance(0, 1) - expected).abs() < 1e-12);
        assert_eq!(v.distance(0, 2), 1.0);
    }

    #[test]
    fn test_zero_norm_is_distance_one() {
        let v = TermVectors::from_tokens(&[toks(""), toks("a")]);
        assert_eq!(v.distance(0, 1), 1.0);
    }

    #[test]
    fn test_event_jaccard_distance() {
        let a = event(&["a", "b"], &["x"]);
        let c = event(&["a", "c"], &[]);
        assert!((event_distance(&a, &c) - 0.75).abs() < 1e-12);
        let m = event_distance_matrix(&[a.clone(), a, c]);
        assert_eq!(m.get(0, 1), 0.0);
        assert!((m.get(2, 0) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_top_terms() {
        let v = TermVectors::from_tokens(&[toks("alpha beta beta"), toks("alpha gamma"), toks("delta")]);
        let top = v.top_terms(&[0, 1], 2);
        assert_eq!(top[0].0, "beta");
        assert_eq!(top.len(), 2);
    }
}

//! Agreement between the automatic results and a human reference.
//!
//! Two families of measures:
//! - discrimination: Precision/Recall/F of the "kept vs. excluded" decision
//!   against reference relevance, with and without a time constraint;
//! - clustering agreement: Rand Index and Normalized Mutual Information
//!   between the automatic and reference partitions of the kept documents.
//!
//! Zero denominators are never coerced: the affected measure is `None`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::DocumentResult;
use crate::temporal::Period;

/// Human annotations. A document absent from `documents`, or mapped to
/// `null`, is irrelevant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceAnnotations {
    /// document id -> reference cluster label
    pub documents: BTreeMap<String, Option<String>>,
    /// nested cluster label -> parent label
    #[serde(default)]
    pub parents: BTreeMap<String, String>,
    /// cluster label -> period of the reference event
    #[serde(default)]
    pub periods: BTreeMap<String, Period>,
}

impl ReferenceAnnotations {
    pub fn label(&self, document_id: &str) -> Option<&str> {
        self.documents.get(document_id).and_then(|l| l.as_deref())
    }

    pub fn is_relevant(&self, document_id: &str) -> bool {
        self.label(document_id).is_some()
    }

    /// The label with every level of nesting resolved away.
    pub fn top_level<'a>(&'a self, label: &'a str) -> Result<&'a str> {
        let mut current = label;
        for _ in 0..=self.parents.len() {
            match self.parents.get(current) {
                Some(parent) => current = parent.as_str(),
                None => return Ok(current),
            }
        }
        Err(Error::evaluation(format!("cyclic reference cluster hierarchy at {:?}", label)))
    }

    /// The nearest period annotated on `label` or one of its ancestors.
    pub fn period_of(&self, label: &str) -> Option<&Period> {
        let mut current = label;
        for _ in 0..=self.parents.len() {
            if let Some(p) = self.periods.get(current) {
                return Some(p);
            }
            current = self.parents.get(current)?.as_str();
        }
        None
    }
}

/* ----------------------------- Discrimination ----------------------------- */

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Discrimination {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f_measure: Option<f64>,
}

impl Discrimination {
    pub fn from_counts(tp: usize, fp: usize, fn_: usize, tn: usize) -> Self {
        let ratio = |num: usize, den: usize| (den > 0).then(|| num as f64 / den as f64);
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f_measure = match (precision, recall) {
            (Some(p), Some(r)) if p + r > 0.0 => Some(2.0 * p * r / (p + r)),
            _ => None,
        };
        Self {
            true_positives: tp,
            false_positives: fp,
            false_negatives: fn_,
            true_negatives: tn,
            precision,
            recall,
            f_measure,
        }
    }
}

/// Compares "kept" (`status == None`) against reference relevance. With a
/// `query` period, a document is relevant only if its reference event's
/// period lies inside `query`; a reference cluster without a period is then
/// irrelevant.
pub fn discrimination(
    results: &[DocumentResult],
    reference: &ReferenceAnnotations,
    query: Option<&Period>,
) -> Result<Discrimination> {
    let (mut tp, mut fp, mut fn_, mut tn) = (0, 0, 0, 0);
    for r in results {
        let relevant = match (reference.label(&r.document.id), query) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(label), Some(q)) => match reference.period_of(label) {
                Some(p) => q.contains(p)?,
                None => false,
            },
        };
        match (relevant, r.is_retained()) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => tn += 1,
        }
    }
    Ok(Discrimination::from_counts(tp, fp, fn_, tn))
}

/* -------------------------- Clustering agreement -------------------------- */

fn check_lengths(a: &[usize], b: &[usize]) -> Result<()> {
    if a.len() != b.len() {
        return Err(Error::invalid_input(format!("partitions cover {} and {} items", a.len(), b.len())));
    }
    Ok(())
}

/// Fraction of item pairs on which both partitions agree (together in both
/// or apart in both). `None` with fewer than two items.
pub fn rand_index(a: &[usize], b: &[usize]) -> Result<Option<f64>> {
    check_lengths(a, b)?;
    let n = a.len();
    if n < 2 {
        return Ok(None);
    }
    let mut agree = 0usize;
    for i in 0..n {
        for j in (i + 1)..n {
            if (a[i] == a[j]) == (b[i] == b[j]) {
                agree += 1;
            }
        }
    }
    let pairs = n * (n - 1) / 2;
    Ok(Some(agree as f64 / pairs as f64))
}

/// Symmetric NMI, `2·I(A;B) / (H(A) + H(B))` with natural logs. `None` when
/// both partitions are a single group (zero entropy on both sides) or empty.
pub fn normalized_mutual_information(a: &[usize], b: &[usize]) -> Result<Option<f64>> {
    check_lengths(a, b)?;
    if a.is_empty() {
        return Ok(None);
    }

    let mut count_a: BTreeMap<usize, usize> = BTreeMap::new();
    let mut count_b: BTreeMap<usize, usize> = BTreeMap::new();
    let mut joint: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for (&x, &y) in a.iter().zip(b) {
        *count_a.entry(x).or_insert(0) += 1;
        *count_b.entry(y).or_insert(0) += 1;
        *joint.entry((x, y)).or_insert(0) += 1;
    }
    if count_a.len() == 1 && count_b.len() == 1 {
        return Ok(None);
    }

    let n = a.len() as f64;
    // p·ln(1/p) with p = c/n, taken from integer counts so H(P) and I(P;P) agree bit for bit
    let entropy = |counts: &BTreeMap<usize, usize>| -> f64 {
        counts
            .values()
            .map(|&c| {
                let c = c as f64;
                c / n * (n / c).ln()
            })
            .sum()
    };
    let mutual: f64 = joint
        .iter()
        .map(|((x, y), &c)| {
            let c = c as f64;
            c / n * ((n * c) / (count_a[x] as f64 * count_b[y] as f64)).ln()
        })
        .sum();
    Ok(Some(2.0 * mutual / (entropy(&count_a) + entropy(&count_b))))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Agreement {
    /// Kept, clustered documents that also carry a reference label.
    pub items: usize,
    pub rand_index: Option<f64>,
    pub nmi: Option<f64>,
}

/// Integer labels for the automatic and reference partitions over the kept
/// documents having both a cluster id and a reference label. Reference
/// labels are resolved to their top-level ancestor.
pub fn agreement_labels(results: &[DocumentResult], reference: &ReferenceAnnotations) -> Result<(Vec<usize>, Vec<usize>)> {
    let mut ids: BTreeMap<&str, usize> = BTreeMap::new();
    let mut auto = Vec::new();
    let mut gold = Vec::new();
    for r in results.iter().filter(|r| r.is_retained()) {
        let (Some(cluster), Some(label)) = (r.cluster_id, reference.label(&r.document.id)) else {
            continue;
        };
        let top = reference.top_level(label)?;
        let next = ids.len();
        gold.push(*ids.entry(top).or_insert(next));
        auto.push(cluster);
    }
    Ok((auto, gold))
}

pub fn agreement(results: &[DocumentResult], reference: &ReferenceAnnotations) -> Result<Agreement> {
    let (auto, gold) = agreement_labels(results, reference)?;
    Ok(Agreement {
        items: auto.len(),
        rand_index: rand_index(&auto, &gold)?,
        nmi: normalized_mutual_information(&auto, &gold)?,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub theme: Discrimination,
    /// Present when a query period was configured.
    pub theme_time: Option<Discrimination>,
    pub clustering: Agreement,
}

pub fn evaluate(results: &[DocumentResult], reference: &ReferenceAnnotations, query: Option<&Period>) -> Result<Evaluation> {
    let theme = discrimination(results, reference, None)?;
    let theme_time = query.map(|q| discrimination(results, reference, Some(q))).transpose()?;
    let clustering = agreement(results, reference)?;
    debug!("Discrimination counts - tp={}, fp={}, fn={}, tn={}", theme.true_positives, theme.false_positives, theme.false_negatives, theme.true_negatives);
    info!(
        "Evaluation completed - precision={:?}, recall={:?}, f={:?}, rand={:?}, nmi={:?}",
        theme.precision, theme.recall, theme.f_measure, clustering.rand_index, clustering.nmi
    );
    Ok(Evaluation { theme, theme_time, clustering })
}

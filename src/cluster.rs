use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::matrix::DistanceMatrix;
use crate::medoids::pam;

/// A later cut must beat the current best by more than this to replace it.
const SCORE_EPSILON: f64 = 1e-12;

/// Disjoint, non-empty groups covering `0..n`, as 1-based labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    labels: Vec<usize>,
    k: usize,
}

impl Partition {
    /// Relabels arbitrary group ids to `1..=k` in order of first appearance.
    pub fn from_labels(raw: &[usize]) -> Self {
        let mut seen: Vec<(usize, usize)> = Vec::new();
        let labels = raw
            .iter()
            .map(|r| match seen.iter().find(|(orig, _)| orig == r) {
                Some((_, l)) => *l,
                None => {
                    let l = seen.len() + 1;
                    seen.push((*r, l));
                    l
                }
            })
            .collect();
        Self { labels, k: seen.len() }
    }

    /// Every item in one group.
    pub fn single(n: usize) -> Self {
        Self { labels: vec![1; n], k: usize::from(n > 0) }
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn label(&self, item: usize) -> usize {
        self.labels[item]
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Member indices per group; `groups()[l - 1]` holds label `l`.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut out = vec![Vec::new(); self.k];
        for (i, &l) in self.labels.iter().enumerate() {
            out[l - 1].push(i);
        }
        out
    }
}

/* ------------------------------- Dendrogram ------------------------------- */

/// One agglomeration step. Node ids below `n` are items; step `t` creates
/// node `n + t`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub height: f64,
    pub size: usize,
    #[serde(skip)]
    reps: (usize, usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dendrogram {
    n: usize,
    merges: Vec<Merge>,
}

impl Dendrogram {
    /// Complete-link agglomeration: repeatedly joins the two clusters whose
    /// largest pairwise distance is smallest. Equal distances resolve to the
    /// pair with the lowest smallest-member indices.
    pub fn complete_link(m: &DistanceMatrix) -> Self {
        let n = m.len();
        // slot s holds the cluster whose smallest member is item s
        let mut dist: Vec<f64> = m.rows().flatten().copied().collect();
        let mut active: Vec<bool> = vec![true; n];
        let mut node: Vec<usize> = (0..n).collect();
        let mut size: Vec<usize> = vec![1; n];
        let mut merges = Vec::with_capacity(n.saturating_sub(1));

        for step in 0..n.saturating_sub(1) {
            let mut best: Option<(usize, usize, f64)> = None;
            for a in (0..n).filter(|&a| active[a]) {
                for b in ((a + 1)..n).filter(|&b| active[b]) {
                    let d = dist[a * n + b];
                    if best.map_or(true, |(_, _, bd)| d < bd) {
                        best = Some((a, b, d));
                    }
                }
            }
            let Some((a, b, height)) = best else { break };

            merges.push(Merge {
                left: node[a],
                right: node[b],
                height,
                size: size[a] + size[b],
                reps: (a, b),
            });

            for x in (0..n).filter(|&x| active[x] && x != a && x != b) {
                let d = dist[a * n + x].max(dist[b * n + x]);
                dist[a * n + x] = d;
                dist[x * n + a] = d;
            }
            active[b] = false;
            node[a] = n + step;
            size[a] += size[b];
        }

        Self { n, merges }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Partition into exactly `k` groups, obtained by replaying the first
    /// `n - k` merges.
    pub fn cut(&self, k: usize) -> Result<Partition> {
        if k == 0 || k > self.n {
            return Err(Error::invalid_input(format!("cannot cut {} items into {} clusters", self.n, k)));
        }
        let mut parent: Vec<usize> = (0..self.n).collect();
        for merge in &self.merges[..self.n - k] {
            let ra = find(&mut parent, merge.reps.0);
            let rb = find(&mut parent, merge.reps.1);
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            parent[hi] = lo;
        }
        let roots: Vec<usize> = (0..self.n).map(|i| find(&mut parent, i)).collect();
        Ok(Partition::from_labels(&roots))
    }
}

fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
        parent[x] = parent[parent[x]];
        x = parent[x];
    }
    x
}

/* ------------------------------- Silhouette ------------------------------- */

/// Mean silhouette coefficient of `p` over `m`. Items in singleton groups
/// score 0, as do items whose `a` and `b` are both 0.
pub fn silhouette(m: &DistanceMatrix, p: &Partition) -> f64 {
    let n = m.len();
    if n == 0 || p.k() < 2 {
        return 0.0;
    }
    let groups = p.groups();
    let mut total = 0.0;
    for i in 0..n {
        let own = p.label(i) - 1;
        if groups[own].len() == 1 {
            continue;
        }
        let row = m.row(i);
        let mut sums = vec![0.0; p.k()];
        for (j, d) in row.iter().enumerate() {
            sums[p.label(j) - 1] += d;
        }
        let a = sums[own] / (groups[own].len() - 1) as f64;
        let b = sums
            .iter()
            .enumerate()
            .filter(|(c, _)| *c != own)
            .map(|(c, s)| s / groups[c].len() as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom != 0.0 {
            total += (b - a) / denom;
        }
    }
    total / n as f64
}

/// Outcome of the hierarchical search: the dendrogram, every cut's score,
/// and the retained best cut.
#[derive(Debug, Clone, Serialize)]
pub struct HierarchicalClustering {
    pub dendrogram: Dendrogram,
    pub scores: Vec<(usize, f64)>,
    pub best: Partition,
    pub best_score: f64,
}

/// Builds the dendrogram, scores the cut for every `k` in `2..=n` and keeps
/// the highest-scoring one (the smaller `k` on ties). `None` when `n < 2`.
pub fn cluster_hierarchical(m: &DistanceMatrix) -> Result<Option<HierarchicalClustering>> {
    let n = m.len();
    if n < 2 {
        return Ok(None);
    }
    let start = std::time::Instant::now();
    let dendrogram = Dendrogram::complete_link(m);

    let cuts: Vec<(usize, Partition, f64)> = (2..=n)
        .into_par_iter()
        .map(|k| {
            let p = dendrogram.cut(k)?;
            let s = silhouette(m, &p);
            Ok((k, p, s))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut scores = Vec::with_capacity(cuts.len());
    let mut best: Option<(Partition, f64)> = None;
    for (k, p, s) in cuts {
        scores.push((k, s));
        let better = match &best {
            None => true,
            Some((_, bs)) => s > bs + SCORE_EPSILON,
        };
        if better {
            best = Some((p, s));
        }
    }
    let Some((best, best_score)) = best else {
        return Ok(None);
    };

    debug!(
        "Silhouette sweep completed - items={}, cuts={}, best_k={}, score={:.4}, duration={:.2}s",
        n,
        scores.len(),
        best.k(),
        best_score,
        start.elapsed().as_secs_f32()
    );
    Ok(Some(HierarchicalClustering { dendrogram, scores, best, best_score }))
}

/* ------------------------------ Entry point ------------------------------- */

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusteringMethod {
    /// Complete-link dendrogram cut at the best silhouette.
    #[default]
    Hierarchical,
    /// k-medoids with a fixed number of clusters.
    Medoids { k: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct Clustering {
    pub partition: Partition,
    /// Silhouette of the retained cut; absent for k-medoids.
    pub silhouette: Option<f64>,
}

/// Partitions the items of `m`. Returns `None` when fewer than two items
/// leave nothing to cluster. A medoid count above `n` is clamped to `n`.
pub fn cluster(m: &DistanceMatrix, method: ClusteringMethod) -> Result<Option<Clustering>> {
    if m.len() < 2 {
        return Ok(None);
    }
    let out = match method {
        ClusteringMethod::Hierarchical => cluster_hierarchical(m)?.map(|h| Clustering {
            partition: h.best,
            silhouette: Some(h.best_score),
        }),
        ClusteringMethod::Medoids { k } => {
            let k = if k > m.len() {
                warn!("Medoid count clamped - requested={}, items={}", k, m.len());
                m.len()
            } else {
                k
            };
            Some(Clustering { partition: pam(m, k)?.partition, silhouette: None })
        }
    };
    if let Some(c) = &out {
        info!("Clustering completed - items={}, clusters={}, method={:?}", m.len(), c.partition.k(), method);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(pos: &[f64]) -> DistanceMatrix {
        DistanceMatrix::from_fn(pos.len(), |i, j| (pos[i] - pos[j]).abs())
    }

    #[test]
    fn test_partition_relabels_by_first_appearance() {
        let p = Partition::from_labels(&[7, 3, 7, 9]);
        assert_eq!(p.labels(), &[1, 2, 1, 3]);
        assert_eq!(p.k(), 3);
        assert_eq!(p.groups(), vec![vec![0, 2], vec![1], vec![3]]);
    }

    #[test]
    fn test_complete_link_merge_order() {
        let m = line(&[0.0, 1.0, 3.0, 10.0]);
        let d = Dendrogram::complete_link(&m);
        let merges = d.merges();
        assert_eq!(merges.len(), 3);
        assert_eq!((merges[0].left, merges[0].right), (0, 1));
        assert_eq!(merges[0].height, 1.0);
        // complete link: {0,1} to 2 is max(3, 2) = 3
        assert_eq!((merges[1].left, merges[1].right), (4, 2));
        assert_eq!(merges[1].height, 3.0);
        assert_eq!(merges[2].height, 10.0);
        assert_eq!(merges[2].size, 4);
    }

    #[test]
    fn test_tie_break_lowest_pair() {
        let m = line(&[0.0, 1.0, 2.0]);
        let d = Dendrogram::complete_link(&m);
        assert_eq!((d.merges()[0].left, d.merges()[0].right), (0, 1));
    }

    #[test]
    fn test_cut_counts() {
        let m = line(&[0.0, 1.0, 3.0, 10.0]);
        let d = Dendrogram::complete_link(&m);
        assert_eq!(d.cut(1).unwrap().k(), 1);
        assert_eq!(d.cut(2).unwrap().labels(), &[1, 1, 1, 2]);
        assert_eq!(d.cut(4).unwrap().labels(), &[1, 2, 3, 4]);
        assert!(d.cut(5).is_err());
        assert!(d.cut(0).is_err());
    }

    #[test]
    fn test_silhouette_picks_natural_split() {
        // two tight groups {0,1,2} and {3,4}, far apart
        let m = line(&[0.0, 0.1, 0.2, 5.0, 5.1]);
        let h = cluster_hierarchical(&m).unwrap().unwrap();
        assert_eq!(h.best.labels(), &[1, 1, 1, 2, 2]);
        assert_eq!(h.scores.len(), 4);
        assert!(h.best_score > 0.9);
    }

    #[test]
    fn test_silhouette_singletons_score_zero() {
        let m = line(&[0.0, 1.0, 2.0]);
        assert_eq!(silhouette(&m, &Partition::from_labels(&[0, 1, 2])), 0.0);
    }

    #[test]
    fn test_equal_scores_keep_smaller_k() {
        let m = DistanceMatrix::from_fn(4, |_, _| 0.5);
        let h = cluster_hierarchical(&m).unwrap().unwrap();
        assert!(h.scores.iter().all(|(_, s)| s.abs() < 1e-12));
        assert_eq!(h.best.k(), 2);
    }

    #[test]
    fn test_too_few_items() {
        let m = DistanceMatrix::from_fn(1, |_, _| 0.0);
        assert!(cluster_hierarchical(&m).unwrap().is_none());
        assert!(cluster(&m, ClusteringMethod::Hierarchical).unwrap().is_none());
    }

    #[test]
    fn test_cluster_medoids_clamps_k() {
        let m = line(&[0.0, 1.0]);
        let c = cluster(&m, ClusteringMethod::Medoids { k: 5 }).unwrap().unwrap();
        assert_eq!(c.partition.k(), 2);
        assert!(c.silhouette.is_none());
    }

    #[test]
    fn test_method_json() {
        let m: ClusteringMethod = serde_json::from_str(r#""hierarchical""#).unwrap();
        assert_eq!(m, ClusteringMethod::Hierarchical);
        let m: ClusteringMethod = serde_json::from_str(r#"{"medoids":{"k":3}}"#).unwrap();
        assert_eq!(m, ClusteringMethod::Medoids { k: 3 });
    }
}

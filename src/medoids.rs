//! k-medoids (PAM): BUILD a greedy initial set, then SWAP medoids for
//! non-medoids while the total distance to the nearest medoid drops.

use tracing::debug;

use crate::cluster::Partition;
use crate::error::{Error, Result};
use crate::matrix::DistanceMatrix;

const IMPROVEMENT_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct Medoids {
    pub partition: Partition,
    /// Item index of each group's medoid, by label order.
    pub medoids: Vec<usize>,
    pub cost: f64,
}

pub fn pam(m: &DistanceMatrix, k: usize) -> Result<Medoids> {
    let n = m.len();
    if k == 0 || k > n {
        return Err(Error::invalid_input(format!("k-medoids needs 1 <= k <= {}, got {}", n, k)));
    }

    let mut medoids = build(m, k);
    let mut cost = total_cost(m, &medoids);
    let mut swaps = 0usize;

    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for slot in 0..medoids.len() {
            for candidate in 0..n {
                if medoids.contains(&candidate) {
                    continue;
                }
                let previous = medoids[slot];
                medoids[slot] = candidate;
                let c = total_cost(m, &medoids);
                medoids[slot] = previous;
                let threshold = best.map_or(cost, |(_, _, bc)| bc);
                if c < threshold - IMPROVEMENT_EPSILON {
                    best = Some((slot, candidate, c));
                }
            }
        }
        let Some((slot, candidate, c)) = best else { break };
        medoids[slot] = candidate;
        cost = c;
        swaps += 1;
    }

    let raw: Vec<usize> = (0..n).map(|i| nearest_slot(m, &medoids, i)).collect();
    let partition = Partition::from_labels(&raw);

    // reorder medoids to follow the relabeled groups
    let mut ordered = vec![0; partition.k()];
    for (i, &slot) in raw.iter().enumerate() {
        ordered[partition.label(i) - 1] = medoids[slot];
    }

    debug!("PAM completed - items={}, k={}, swaps={}, cost={:.4}", n, k, swaps, cost);
    Ok(Medoids { partition, medoids: ordered, cost })
}

fn build(m: &DistanceMatrix, k: usize) -> Vec<usize> {
    let n = m.len();
    let first = (0..n)
        .map(|i| (i, m.row(i).iter().sum::<f64>()))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
        .0;
    let mut medoids = vec![first];
    let mut nearest: Vec<f64> = m.row(first).to_vec();

    while medoids.len() < k {
        let mut pick: Option<(usize, f64)> = None;
        for c in (0..n).filter(|c| !medoids.contains(c)) {
            let gain: f64 = (0..n).map(|j| (nearest[j] - m.get(c, j)).max(0.0)).sum();
            if pick.map_or(true, |(_, g)| gain > g) {
                pick = Some((c, gain));
            }
        }
        let Some((c, _)) = pick else { break };
        medoids.push(c);
        for (j, d) in nearest.iter_mut().enumerate() {
            *d = d.min(m.get(c, j));
        }
    }
    medoids
}

/// Index into `medoids` of the closest medoid; a medoid maps to itself.
fn nearest_slot(m: &DistanceMatrix, medoids: &[usize], i: usize) -> usize {
    if let Some(own) = medoids.iter().position(|&md| md == i) {
        return own;
    }
    let mut best = 0;
    for (slot, &md) in medoids.iter().enumerate().skip(1) {
        if m.get(i, md) < m.get(i, medoids[best]) {
            best = slot;
        }
    }
    best
}

fn total_cost(m: &DistanceMatrix, medoids: &[usize]) -> f64 {
    (0..m.len())
        .map(|i| medoids.iter().map(|&md| m.get(i, md)).fold(f64::INFINITY, f64::min))
        .sum()
}

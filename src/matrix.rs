//! Symmetric pairwise distance matrix shared by every clustering run.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// `n x n` distances, stored row-major, symmetric with a zero diagonal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Computes `dist(i, j)` once per unordered pair (rows in parallel) and
    /// mirrors it, so symmetry holds whatever `dist` does.
    pub fn from_fn<F>(n: usize, dist: F) -> Self
    where
        F: Fn(usize, usize) -> f64 + Sync,
    {
        let upper: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| ((i + 1)..n).map(|j| dist(i, j)).collect())
            .collect();

        let mut data = vec![0.0; n * n];
        for (i, row) in upper.into_iter().enumerate() {
            for (offset, d) in row.into_iter().enumerate() {
                let j = i + 1 + offset;
                data[i * n + j] = d;
                data[j * n + i] = d;
            }
        }
        debug!("Distance matrix built - items={}, pairs={}", n, n * n.saturating_sub(1) / 2);
        Self { n, data }
    }

    /// Builds from explicit rows, checking shape, symmetry and diagonal.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = rows.len();
        if rows.iter().any(|r| r.len() != n) {
            return Err(Error::invalid_input(format!("distance matrix rows must all have length {}", n)));
        }
        let data: Vec<f64> = rows.into_iter().flatten().collect();
        let m = Self { n, data };
        for i in 0..n {
            if m.get(i, i) != 0.0 {
                return Err(Error::invalid_input(format!("diagonal entry ({i},{i}) is not zero")));
            }
            for j in (i + 1)..n {
                let d = m.get(i, j);
                if !d.is_finite() || d != m.get(j, i) {
                    return Err(Error::invalid_input(format!("entries ({i},{j}) and ({j},{i}) are not a finite symmetric pair")));
                }
            }
        }
        Ok(m)
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n..(i + 1) * self.n]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.n.max(1)).take(self.n)
    }
}

//! Linear algebra for the per-step system: sparse row storage, a restarted
//! GMRES with a block forward-sweep preconditioner, and a dense fallback.

pub mod dense;
pub mod gmres;

use thiserror::Error;

pub use dense::solve_dense;
pub use gmres::{BlockPreconditioner, GmresSettings, GmresStats, gmres};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("dimension mismatch: {0}")]
    Dimension(String),
    #[error("singular matrix (pivot too small) at column {column}")]
    Singular { column: usize },
    #[error("singular diagonal block {block}")]
    SingularBlock { block: usize },
    #[error("no convergence after {iterations} iterations (residual {residual:.3e})")]
    NotConverged { iterations: usize, residual: f64 },
    #[error("non-finite solution at index {index}")]
    NonFinite { index: usize },
}

impl SolveError {
    /// Unknown index the failure points at, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            SolveError::Singular { column } => Some(*column),
            SolveError::NonFinite { index } => Some(*index),
            SolveError::SingularBlock { block } => Some(3 * block),
            _ => None,
        }
    }
}

/// Square sparse matrix stored as per-row `(column, value)` lists.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    rows: Vec<Vec<(usize, f64)>>,
}

impl SparseMatrix {
    pub fn new(n: usize) -> Self {
        Self {
            rows: vec![Vec::new(); n],
        }
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// Adds `value` to entry `(i, j)`.
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        let row = &mut self.rows[i];
        match row.iter_mut().find(|(c, _)| *c == j) {
            Some(entry) => entry.1 += value,
            None => row.push((j, value)),
        }
    }

    pub fn row(&self, i: usize) -> &[(usize, f64)] {
        &self.rows[i]
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rows[i]
            .iter()
            .find(|(c, _)| *c == j)
            .map_or(0.0, |(_, v)| *v)
    }

    pub fn num_nonzeros(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// `y = A x`
    pub fn apply(&self, x: &[f64], y: &mut [f64]) {
        for (yi, row) in y.iter_mut().zip(&self.rows) {
            *yi = row.iter().map(|&(j, v)| v * x[j]).sum();
        }
    }

    /// `b - A x`
    pub fn residual(&self, x: &[f64], b: &[f64]) -> Vec<f64> {
        let mut ax = vec![0.0; b.len()];
        self.apply(x, &mut ax);
        b.iter().zip(&ax).map(|(bi, axi)| bi - axi).collect()
    }

    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let n = self.size();
        self.rows
            .iter()
            .map(|row| {
                let mut dense = vec![0.0; n];
                for &(j, v) in row {
                    dense[j] += v;
                }
                dense
            })
            .collect()
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn l2_norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_add_merges_entries() {
        let mut a = SparseMatrix::new(2);
        a.add(0, 1, 2.0);
        a.add(0, 1, 3.0);
        a.add(1, 0, -1.0);
        assert_eq!(a.get(0, 1), 5.0);
        assert_eq!(a.get(1, 1), 0.0);
        assert_eq!(a.num_nonzeros(), 2);

        let mut y = vec![0.0; 2];
        a.apply(&[1.0, 2.0], &mut y);
        assert_eq!(y, vec![10.0, -1.0]);
        assert_eq!(a.to_dense(), vec![vec![0.0, 5.0], vec![-1.0, 0.0]]);
    }

    #[test]
    fn test_error_index() {
        assert_eq!(SolveError::SingularBlock { block: 4 }.index(), Some(12));
        assert_eq!(
            SolveError::NotConverged {
                iterations: 3,
                residual: 1.0
            }
            .index(),
            None
        );
    }
}

use super::{SolveError, SparseMatrix, dense::solve_dense, dot, l2_norm};

/// Size of the diagonal blocks (one block per element).
const BLOCK: usize = 3;

/// Settings of the restarted GMRES solver.
#[derive(Debug, Clone, Copy)]
pub struct GmresSettings {
    /// Maximum number of inner iterations over all restarts.
    pub max_iterations: usize,
    /// Krylov subspace size before a restart.
    pub restart: usize,
    /// Relative residual tolerance.
    pub rel_tolerance: f64,
    /// Absolute residual tolerance.
    pub abs_tolerance: f64,
}

impl Default for GmresSettings {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            restart: 50,
            rel_tolerance: 1e-10,
            abs_tolerance: 1e-9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GmresStats {
    pub iterations: usize,
    pub residual: f64,
}

/// Block forward Gauss-Seidel sweep: applies the inverse of the block-lower
/// part of the matrix (3x3 diagonal blocks included).
///
/// With unknowns ordered in flow direction, the sweep resolves the advection
/// coupling exactly and leaves only the thermal interaction for GMRES.
#[derive(Debug, Clone)]
pub struct BlockPreconditioner {
    inverses: Vec<[[f64; BLOCK]; BLOCK]>,
}

impl BlockPreconditioner {
    pub fn new(a: &SparseMatrix) -> Result<Self, SolveError> {
        let n = a.size();
        if n % BLOCK != 0 {
            return Err(SolveError::Dimension(format!(
                "size {n} is not a multiple of the block size {BLOCK}"
            )));
        }
        let inverses = (0..n / BLOCK)
            .map(|block| invert_block(a, block))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { inverses })
    }

    /// `z = M^-1 r`
    pub fn apply(&self, a: &SparseMatrix, r: &[f64], z: &mut [f64]) {
        for (block, inv) in self.inverses.iter().enumerate() {
            let base = block * BLOCK;
            let mut rhs = [0.0; BLOCK];
            for (k, rk) in rhs.iter_mut().enumerate() {
                let i = base + k;
                *rk = r[i]
                    - a.row(i)
                        .iter()
                        .filter(|(j, _)| *j < base)
                        .map(|&(j, v)| v * z[j])
                        .sum::<f64>();
            }
            for (k, row) in inv.iter().enumerate() {
                z[base + k] = dot(row, &rhs);
            }
        }
    }
}

fn invert_block(a: &SparseMatrix, block: usize) -> Result<[[f64; BLOCK]; BLOCK], SolveError> {
    let base = block * BLOCK;
    let d: Vec<Vec<f64>> = (0..BLOCK)
        .map(|r| (0..BLOCK).map(|c| a.get(base + r, base + c)).collect())
        .collect();
    let mut inv = [[0.0; BLOCK]; BLOCK];
    for col in 0..BLOCK {
        let mut e = vec![0.0; BLOCK];
        e[col] = 1.0;
        let x = solve_dense(d.clone(), e).map_err(|_| SolveError::SingularBlock { block })?;
        for (row, xr) in x.iter().enumerate() {
            inv[row][col] = *xr;
        }
    }
    Ok(inv)
}

/// Right-preconditioned restarted GMRES, started from `x`.
///
/// On success `x` holds the solution.
pub fn gmres(
    a: &SparseMatrix,
    b: &[f64],
    x: &mut [f64],
    precond: &BlockPreconditioner,
    settings: &GmresSettings,
) -> Result<GmresStats, SolveError> {
    let n = a.size();
    if b.len() != n || x.len() != n {
        return Err(SolveError::Dimension(format!(
            "system of size {n} with b of {} and x of {}",
            b.len(),
            x.len()
        )));
    }
    let tol = settings
        .abs_tolerance
        .max(settings.rel_tolerance * l2_norm(b));
    let m = settings.restart.max(1);

    let mut r = a.residual(x, b);
    let mut beta = l2_norm(&r);
    let mut iterations = 0;
    let mut z = vec![0.0; n];
    let mut w = vec![0.0; n];

    while beta > tol {
        if iterations >= settings.max_iterations {
            return Err(SolveError::NotConverged {
                iterations,
                residual: beta,
            });
        }

        let mut basis: Vec<Vec<f64>> = Vec::with_capacity(m + 1);
        basis.push(r.iter().map(|ri| ri / beta).collect());
        let mut h = vec![vec![0.0; m]; m + 1];
        let mut cs = vec![0.0; m];
        let mut sn = vec![0.0; m];
        let mut g = vec![0.0; m + 1];
        g[0] = beta;

        let mut k = 0;
        while k < m && iterations < settings.max_iterations {
            precond.apply(a, &basis[k], &mut z);
            a.apply(&z, &mut w);

            // Modified Gram-Schmidt
            for (i, v) in basis.iter().enumerate() {
                let hik = dot(&w, v);
                h[i][k] = hik;
                for (wj, vj) in w.iter_mut().zip(v) {
                    *wj -= hik * vj;
                }
            }
            let h_next = l2_norm(&w);
            h[k + 1][k] = h_next;

            for i in 0..k {
                let tmp = cs[i] * h[i][k] + sn[i] * h[i + 1][k];
                h[i + 1][k] = -sn[i] * h[i][k] + cs[i] * h[i + 1][k];
                h[i][k] = tmp;
            }
            let denom = h[k][k].hypot(h[k + 1][k]);
            if denom == 0.0 {
                return Err(SolveError::NotConverged {
                    iterations,
                    residual: beta,
                });
            }
            cs[k] = h[k][k] / denom;
            sn[k] = h[k + 1][k] / denom;
            h[k][k] = denom;
            h[k + 1][k] = 0.0;
            g[k + 1] = -sn[k] * g[k];
            g[k] *= cs[k];

            iterations += 1;
            k += 1;
            let breakdown = h_next <= f64::EPSILON * denom;
            if g[k].abs() <= tol || breakdown {
                break;
            }
            basis.push(w.iter().map(|wi| wi / h_next).collect());
        }

        // Back substitution on the triangular Hessenberg factor
        let mut y = vec![0.0; k];
        for i in (0..k).rev() {
            let s: f64 = ((i + 1)..k).map(|j| h[i][j] * y[j]).sum();
            y[i] = (g[i] - s) / h[i][i];
        }
        let mut u = vec![0.0; n];
        for (yi, v) in y.iter().zip(&basis) {
            for (uj, vj) in u.iter_mut().zip(v) {
                *uj += yi * vj;
            }
        }
        precond.apply(a, &u, &mut z);
        for (xi, zi) in x.iter_mut().zip(&z) {
            *xi += zi;
        }

        r = a.residual(x, b);
        beta = l2_norm(&r);
    }

    if let Some(index) = x.iter().position(|xi| !xi.is_finite()) {
        return Err(SolveError::NonFinite { index });
    }
    Ok(GmresStats {
        iterations,
        residual: beta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Block system with a lower advective chain and a dense-ish upper coupling.
    fn test_system(blocks: usize) -> (SparseMatrix, Vec<f64>) {
        let n = BLOCK * blocks;
        let mut a = SparseMatrix::new(n);
        for b in 0..blocks {
            let i = BLOCK * b;
            a.add(i, i, 4.0);
            a.add(i, i + 2, -1.0);
            a.add(i + 1, i, -0.5);
            a.add(i + 1, i + 1, 1.0);
            a.add(i + 1, i + 2, -0.1);
            a.add(i + 2, i + 1, 1.0);
            a.add(i + 2, i + 2, 0.3);
            if b > 0 {
                a.add(i, i - BLOCK, -3.0);
                a.add(i + 1, i - BLOCK, -0.5);
            }
            for other in 0..blocks {
                if other != b && other.abs_diff(b) < 4 {
                    a.add(i + 2, BLOCK * other + 2, 0.05 / other.abs_diff(b) as f64);
                }
            }
        }
        let b: Vec<f64> = (0..n).map(|i| (i % 7) as f64 - 3.0).collect();
        (a, b)
    }

    #[test]
    fn test_gmres_matches_dense() {
        let (a, b) = test_system(30);
        let precond = BlockPreconditioner::new(&a).unwrap();
        let mut x = vec![0.0; b.len()];
        let stats = gmres(&a, &b, &mut x, &precond, &GmresSettings::default()).unwrap();
        let reference = solve_dense(a.to_dense(), b.clone()).unwrap();
        for (xi, ri) in x.iter().zip(&reference) {
            assert!((xi - ri).abs() < 1e-7, "{xi} vs {ri}");
        }
        assert!(stats.iterations > 0 && stats.iterations < 60, "{stats:?}");
    }

    #[test]
    fn test_gmres_with_restarts() {
        let (a, b) = test_system(40);
        let precond = BlockPreconditioner::new(&a).unwrap();
        let mut x = vec![0.0; b.len()];
        let settings = GmresSettings {
            restart: 3,
            ..GmresSettings::default()
        };
        gmres(&a, &b, &mut x, &precond, &settings).unwrap();
        let r = a.residual(&x, &b);
        assert!(l2_norm(&r) < 1e-8);
    }

    #[test]
    fn test_gmres_warm_start_is_free() {
        let (a, b) = test_system(10);
        let precond = BlockPreconditioner::new(&a).unwrap();
        let mut x = solve_dense(a.to_dense(), b.clone()).unwrap();
        let stats = gmres(&a, &b, &mut x, &precond, &GmresSettings::default()).unwrap();
        assert_eq!(stats.iterations, 0);
    }

    #[test]
    fn test_gmres_reports_non_convergence() {
        let (a, b) = test_system(30);
        let precond = BlockPreconditioner::new(&a).unwrap();
        let mut x = vec![0.0; b.len()];
        let settings = GmresSettings {
            max_iterations: 1,
            restart: 1,
            rel_tolerance: 1e-16,
            abs_tolerance: 1e-16,
        };
        assert!(matches!(
            gmres(&a, &b, &mut x, &precond, &settings),
            Err(SolveError::NotConverged { .. })
        ));
    }

    #[test]
    fn test_singular_block() {
        let mut a = SparseMatrix::new(3);
        a.add(0, 0, 1.0);
        a.add(1, 0, 1.0);
        assert_eq!(
            BlockPreconditioner::new(&a).unwrap_err(),
            SolveError::SingularBlock { block: 0 }
        );
    }
}

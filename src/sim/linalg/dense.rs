use super::SolveError;

/// Solves a dense linear system `A * x = b` using Gaussian elimination with
/// partial pivoting.
pub fn solve_dense(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, SolveError> {
    let n = a.len();
    if n == 0 {
        return Ok(vec![]);
    }
    if b.len() != n {
        return Err(SolveError::Dimension(format!(
            "b has {} entries, expected {n}",
            b.len()
        )));
    }
    if let Some(i) = a.iter().position(|row| row.len() != n) {
        return Err(SolveError::Dimension(format!("A row {i} length mismatch")));
    }

    // Forward elimination
    for col in 0..n {
        let mut pivot_row = col;
        let mut pivot_val = a[col][col].abs();
        for (r, row) in a.iter().enumerate().skip(col + 1) {
            let v = row[col].abs();
            if v > pivot_val {
                pivot_val = v;
                pivot_row = r;
            }
        }

        if pivot_val <= 1e-14 {
            return Err(SolveError::Singular { column: col });
        }

        if pivot_row != col {
            a.swap(pivot_row, col);
            b.swap(pivot_row, col);
        }

        let (upper, lower) = a.split_at_mut(col + 1);
        let pivot_line = &upper[col];
        let pivot = pivot_line[col];
        for (offset, row) in lower.iter_mut().enumerate() {
            let factor = row[col] / pivot;
            if factor == 0.0 {
                continue;
            }
            row[col] = 0.0;
            for c in (col + 1)..n {
                row[c] -= factor * pivot_line[c];
            }
            b[col + 1 + offset] -= factor * b[col];
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let rhs: f64 = b[i] - ((i + 1)..n).map(|j| a[i][j] * x[j]).sum::<f64>();
        x[i] = rhs / a[i][i];
    }

    if let Some(index) = x.iter().position(|xi| !xi.is_finite()) {
        return Err(SolveError::NonFinite { index });
    }

    Ok(x)
}

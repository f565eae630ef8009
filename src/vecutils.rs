//! Vector utility functions like max(), linspace(), interp()

/// Largest value, or negative infinity for an empty slice.
pub fn max(vec: &[f64]) -> f64 {
    vec.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
}

/// `n` evenly spaced values from `start` to `end` (both included).
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = end;
            out
        }
    }
}

/// `n` logarithmically spaced values from `start` to `end` (both included, both > 0).
pub fn logspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    let mut out: Vec<f64> = linspace(start.ln(), end.ln(), n)
        .into_iter()
        .map(f64::exp)
        .collect();
    if let Some(first) = out.first_mut() {
        *first = start;
    }
    if let Some(last) = out.last_mut() {
        *last = end;
    }
    out
}

/// Piecewise-linear interpolation of `(xs, ys)` at `x`.
///
/// `xs` must be strictly increasing. Values outside the range are clamped to
/// the first/last sample.
pub fn interp(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len();
    if n == 0 {
        return f64::NAN;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    // First index with xs[idx] > x
    let idx = xs.partition_point(|&v| v <= x);
    let (x0, x1) = (xs[idx - 1], xs[idx]);
    let (y0, y1) = (ys[idx - 1], ys[idx]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Trapezoid rule for samples `ys` over abscissae `xs`.
pub fn trapezoid(xs: &[f64], ys: &[f64]) -> f64 {
    xs.windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| 0.5 * (x[1] - x[0]) * (y[0] + y[1]))
        .sum()
}

/// Returns true if the values are strictly increasing.
pub fn is_strictly_increasing(v: &[f64]) -> bool {
    v.windows(2).all(|w| w[1] > w[0])
}

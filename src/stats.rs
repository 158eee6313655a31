//! Small numeric helpers shared by the analyzers.
//!
//! Every function returns a neutral value (0.0) for empty or degenerate
//! input instead of NaN.

/// Arithmetic mean, 0.0 for an empty slice
#[inline]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Simple moving average of the last `period` values
pub fn sma_last(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    Some(mean(&values[values.len() - period..]))
}

/// Least-squares slope of `values` against their index
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);
    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - x_mean;
            (num + dx * (y - y_mean), den + dx * dx)
        });
    if den <= f64::EPSILON {
        0.0
    } else {
        num / den
    }
}

/// Pearson correlation; 0.0 when either side has zero variance
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let (mx, my) = (mean(xs), mean(ys));
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    let denom = (vx * vy).sqrt();
    if denom <= f64::EPSILON || !denom.is_finite() {
        return 0.0;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

/// Percent change from `from` to `to`, 0.0 when `from` is ~0
#[inline]
pub fn pct_change(from: f64, to: f64) -> f64 {
    if from.abs() <= f64::EPSILON {
        return 0.0;
    }
    (to - from) / from * 100.0
}

/// True when `a` and `b` lie within `pct` percent of each other
/// (relative to the smaller magnitude).
#[inline]
pub fn within_pct(a: f64, b: f64, pct: f64) -> bool {
    let base = a.abs().min(b.abs());
    if base <= f64::EPSILON {
        return (a - b).abs() <= f64::EPSILON;
    }
    (a - b).abs() / base * 100.0 <= pct
}

//! Small numeric helpers shared by the detectors and the pre-screen.
//!
//! Mean and sample standard deviation come from `statrs`; everything here
//! returns `None` rather than NaN when the input is too short.

use statrs::statistics::{Data, Distribution};

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Data::new(values.to_vec()).mean().filter(|m| m.is_finite())
}

/// Sample standard deviation (n - 1), `None` below two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Data::new(values.to_vec())
        .std_dev()
        .filter(|s| s.is_finite())
}

/// Least-squares slope of `values` against their index.
pub fn linear_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    let slope = num / den;
    slope.is_finite().then_some(slope)
}

/// Simple close-to-close returns. Pairs with a non-positive base are skipped.
pub fn returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

/// Sample standard deviation of close-to-close returns.
pub fn return_volatility(closes: &[f64]) -> Option<f64> {
    sample_std_dev(&returns(closes))
}

/// Mean of the `window` values strictly before `index`.
///
/// `None` until a full window of history exists.
pub fn trailing_mean(values: &[f64], index: usize, window: usize) -> Option<f64> {
    if window == 0 || index < window || index > values.len() {
        return None;
    }
    mean(&values[index - window..index])
}

/// Mean of the last `n` values (fewer if the slice is shorter).
pub fn tail_mean(values: &[f64], n: usize) -> Option<f64> {
    let start = values.len().saturating_sub(n);
    mean(&values[start..])
}

/// Relative proximity: `|a - b| / max(a, b) <= tolerance`.
pub fn near(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        return true;
    }
    (a - b).abs() / scale <= tolerance
}

//! Local extrema ("pivots").

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PivotKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pivot {
    pub index: usize,
    pub price: f64,
    pub kind: PivotKind,
}

/// Indices whose value is `>=` (highs) or `<=` (lows) every value within
/// `order` bars on each side.
///
/// Bars without a full neighbourhood on both sides are never pivots, so a
/// strictly monotonic series has none. Equal neighbours do not disqualify.
pub fn find_pivots(values: &[f64], order: usize, kind: PivotKind) -> Vec<Pivot> {
    let n = values.len();
    if order == 0 || n < 2 * order + 1 {
        return Vec::new();
    }

    (order..n - order)
        .filter(|&i| {
            let v = values[i];
            if !v.is_finite() {
                return false;
            }
            let mut window = values[i - order..=i + order].iter();
            match kind {
                PivotKind::High => window.all(|&w| v >= w),
                PivotKind::Low => window.all(|&w| v <= w),
            }
        })
        .map(|index| Pivot {
            index,
            price: values[index],
            kind,
        })
        .collect()
}

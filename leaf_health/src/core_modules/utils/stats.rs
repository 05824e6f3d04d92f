// Order statistics shared by the mask, texture and tile stages.
//
// `percentile` uses linear interpolation between the two closest ranks
// (virtual index `q * (n - 1)`), the usual default of array libraries. The lerp
// is evaluated from whichever end is nearer, in the precision of the samples
// themselves, so thresholds land on the same float as the reference numbers
// they were calibrated with.

use std::cmp::Ordering;
use std::ops::{Add, Mul, Sub};

/// A float type percentiles can be taken over.
pub trait Sample: Copy + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> {
    fn from_f64(value: f64) -> Self;
    fn total_order(&self, other: &Self) -> Ordering;
}

impl Sample for f32 {
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    fn total_order(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

impl Sample for f64 {
    fn from_f64(value: f64) -> Self {
        value
    }

    fn total_order(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

/// Linear-interpolated percentile of `values`, `q` in [0, 100].
///
/// Returns `None` for an empty slice.
pub fn percentile<T: Sample>(values: &[T], q: f64) -> Option<T> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(T::total_order);
    Some(percentile_of_sorted(&sorted, q))
}

fn percentile_of_sorted<T: Sample>(sorted: &[T], q: f64) -> T {
    let last = sorted.len() - 1;
    let index = (q / 100.0) * last as f64;
    let lower = (index.floor() as usize).min(last);
    let upper = (lower + 1).min(last);
    let t = index - lower as f64;
    lerp(sorted[lower], sorted[upper], t)
}

#[inline]
fn lerp<T: Sample>(a: T, b: T, t: f64) -> T {
    let diff = b - a;
    if t >= 0.5 {
        b - diff * T::from_f64(1.0 - t)
    } else {
        a + diff * T::from_f64(t)
    }
}

/// Median of `values`; mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

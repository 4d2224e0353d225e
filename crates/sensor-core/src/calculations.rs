//! Numeric helpers for the KPI fold.
//!
//! All functions are total: an empty slice yields `0.0` (or `None` where a
//! value genuinely does not exist) instead of panicking.

use std::collections::HashMap;

/// Width of a histogram bin, in measurement units.
pub const HISTOGRAM_BIN_WIDTH: f64 = 5.0;

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n − 1 denominator).
///
/// Returns `0.0` when fewer than two values are present.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n <= 1 {
        return 0.0;
    }
    let m = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (n as f64 - 1.0)).sqrt()
}

/// Population standard deviation (n denominator), `0.0` when empty.
pub fn population_std_dev(values: &[f64]) -> f64 {
    let Some(m) = mean(values) else {
        return 0.0;
    };
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / values.len() as f64).sqrt()
}

/// Root-mean-square, `sqrt(mean(x²))`.
pub fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().map(|v| v * v).sum();
    (sum_sq / values.len() as f64).sqrt()
}

/// Spread relative to the mean, in percent.
///
/// `population_std_dev / mean × 100`, defined as `0.0` when the mean is zero.
/// This is the figure historically reported as "THD"; it involves no
/// frequency-domain analysis and is only a coefficient of variation.
pub fn distortion_ratio(values: &[f64]) -> f64 {
    match mean(values) {
        Some(m) if m != 0.0 => population_std_dev(values) / m * 100.0,
        _ => 0.0,
    }
}

/// Bin label for `value`: `round(value / width) * width`, ties to even.
pub fn histogram_bin(value: f64, width: f64) -> i64 {
    ((value / width).round_ties_even() * width) as i64
}

/// The most populated bin of a fixed-width histogram.
///
/// Ties go to the bin that appeared first in `values`. `None` when empty.
pub fn histogram_peak(values: &[f64], width: f64) -> Option<i64> {
    let mut order: Vec<(i64, usize)> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for &v in values {
        let bin = histogram_bin(v, width);
        match index.get(&bin) {
            Some(&slot) => order[slot].1 += 1,
            None => {
                index.insert(bin, order.len());
                order.push((bin, 1));
            }
        }
    }

    let mut best: Option<(i64, usize)> = None;
    for &(bin, count) in &order {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((bin, count));
        }
    }
    best.map(|(bin, _)| bin)
}
